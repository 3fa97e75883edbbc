//! HTTP implementation of [`AgentProtocol`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::{cancellable, ensure_success, is_json_document, read_json, rpc_headers, shared_client};
use super::{AgentProtocol, ChunkCallback, TaskReply, TaskRequest};
use crate::config::ClientConfig;
use crate::error::{Result, TaskLinkError};
use crate::protocol::{Envelope, ProtocolMethod, RequestBuilder, TaskParams};
use crate::stream::decode_frames;
use crate::types::{CapabilityCard, OutboundMessage};
use crate::util::text::preview;

/// Client bound to one agent endpoint url.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    url: String,
    config: Arc<ClientConfig>,
    builder: RequestBuilder,
}

impl AgentClient {
    pub fn new(url: impl Into<String>, config: Arc<ClientConfig>) -> Self {
        Self::with_http_client(url, config, shared_client().clone())
    }

    /// Use a pre-configured reqwest client (proxies, TLS, default headers).
    pub fn with_http_client(
        url: impl Into<String>,
        config: Arc<ClientConfig>,
        http: reqwest::Client,
    ) -> Self {
        let builder = RequestBuilder::new(config.methods.clone());
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            config,
            builder,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) async fn fetch_card_with_timeout(
        &self,
        timeout: Option<Duration>,
    ) -> Result<CapabilityCard> {
        let card_url = self.config.card_url(&self.url);
        info!(url = %card_url, "fetching capability card");

        let mut req = self.http.get(&card_url).headers(rpc_headers(false));
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let resp = ensure_success(req.send().await?, false).await?;
        let text = resp.text().await?;
        let card: CapabilityCard =
            serde_json::from_str(&text).map_err(|e| TaskLinkError::decode(text, e))?;
        debug!(name = %card.name, streaming = card.supports_streaming(), "retrieved capability card");
        Ok(card)
    }

    /// Resolve ids and build the submit envelope for a request.
    fn prepare(&self, request: &TaskRequest, method: ProtocolMethod) -> Result<(String, String, Envelope)> {
        let task_id = request
            .task_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if let Some(file) = &request.file {
            debug!(file = %file.name, "attaching file to task");
        }
        let message = OutboundMessage::user(request.text.clone(), request.file.as_ref());
        let params = TaskParams::submit(
            task_id.clone(),
            session_id.clone(),
            self.config.accepted_output_modes.clone(),
            message,
        );
        let envelope = self.builder.build(method, &params)?;
        info!(
            task_id = %task_id,
            session_id = %session_id,
            method = %envelope.method,
            message = %preview(&request.text),
            has_file = request.file.is_some(),
            "preparing task"
        );
        Ok((task_id, session_id, envelope))
    }

    async fn post(&self, envelope: &Envelope, streaming: bool) -> Result<reqwest::Response> {
        let mut req = self
            .http
            .post(&self.url)
            .headers(rpc_headers(streaming))
            .json(envelope);
        if let Some(timeout) = self.config.request_timeout {
            req = req.timeout(timeout);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        debug!(method = %envelope.method, status, "agent responded");
        ensure_success(resp, true).await
    }

    async fn consume_stream(
        &self,
        resp: reqwest::Response,
        on_chunk: &mut ChunkCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let frames = decode_frames(resp.bytes_stream());
        futures::pin_mut!(frames);

        let mut last = None;
        let mut count = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskLinkError::Cancelled),
                next = frames.next() => next,
            };
            match next {
                Some(Ok(value)) => {
                    count += 1;
                    debug!(chunk = count, "stream value received");
                    on_chunk(&value);
                    last = Some(value);
                }
                Some(Err(err)) if last.is_some() => {
                    warn!(error = %err, received = count, "stream interrupted, keeping last value");
                    break;
                }
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        info!(chunks = count, "stream completed");
        Ok(last)
    }
}

#[async_trait]
impl AgentProtocol for AgentClient {
    fn endpoint_url(&self) -> &str {
        &self.url
    }

    async fn fetch_capability_card(&self) -> Result<CapabilityCard> {
        self.fetch_card_with_timeout(None).await
    }

    async fn send_task(&self, request: TaskRequest) -> Result<TaskReply> {
        let (task_id, session_id, envelope) = self.prepare(&request, ProtocolMethod::Send)?;
        let body = cancellable(&request.cancel, async {
            let resp = self.post(&envelope, false).await?;
            read_json(resp).await
        })
        .await?;
        info!(task_id = %task_id, "received task response");
        Ok(TaskReply {
            task_id,
            session_id,
            envelope,
            body,
        })
    }

    async fn send_task_streaming(
        &self,
        request: TaskRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<TaskReply> {
        let (task_id, session_id, envelope) =
            self.prepare(&request, ProtocolMethod::SendStreaming)?;
        let cancel = &request.cancel;
        let resp = cancellable(cancel, self.post(&envelope, true)).await?;

        if is_json_document(&resp) {
            let body = cancellable(cancel, read_json(resp)).await?;
            info!(task_id = %task_id, "agent answered with a single JSON document");
            on_chunk(&body);
            return Ok(TaskReply {
                task_id,
                session_id,
                envelope,
                body,
            });
        }

        let body = match self.consume_stream(resp, on_chunk, cancel).await? {
            Some(last) => last,
            None => {
                info!(task_id = %task_id, "stream carried no values, fetching final task state");
                cancellable(cancel, self.get_task(&task_id)).await?
            }
        };
        Ok(TaskReply {
            task_id,
            session_id,
            envelope,
            body,
        })
    }

    async fn get_task(&self, task_id: &str) -> Result<Value> {
        info!(task_id = %task_id, "getting task state");
        let envelope = self
            .builder
            .build(ProtocolMethod::Get, &TaskParams::query(task_id))?;
        let resp = self.post(&envelope, false).await?;
        read_json(resp).await
    }
}
