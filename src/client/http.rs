//! Shared HTTP client, headers and status handling.

use std::future::Future;
use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TaskLinkError};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

pub const EVENT_STREAM: &str = "text/event-stream";
pub const APPLICATION_JSON: &str = "application/json";

/// Get (or create) the shared reqwest client.
///
/// No overall timeout: task execution may legitimately take minutes.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Headers for a JSON-RPC POST, optionally asking for an event stream.
pub fn rpc_headers(streaming: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    let accept = if streaming { EVENT_STREAM } else { APPLICATION_JSON };
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers
}

/// Whether the response declares a single JSON document.
pub fn is_json_document(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains(APPLICATION_JSON))
        .unwrap_or(false)
}

/// Turn a non-2xx response into an endpoint error, optionally keeping the body.
pub async fn ensure_success(resp: reqwest::Response, keep_body: bool) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = if keep_body {
        Some(resp.text().await.unwrap_or_default())
    } else {
        None
    };
    Err(TaskLinkError::endpoint(status.as_u16(), body))
}

/// Read the whole body and parse it as one JSON document.
pub async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| TaskLinkError::decode(text, e))
}

/// Race a future against a cancellation token.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TaskLinkError::Cancelled),
        out = fut => out,
    }
}
