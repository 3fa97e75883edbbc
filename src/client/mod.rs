//! Agent protocol client: capability discovery and task submission.

pub mod agent;
pub mod http;
pub mod liveness;

pub use agent::AgentClient;
pub use liveness::EndpointStatus;

use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::normalize::normalize;
use crate::protocol::Envelope;
use crate::types::{AgentEndpoint, CapabilityCard, FileAttachment, NormalizedResponse};

/// One user turn to submit.
///
/// Missing ids are generated at call time; the reply reports the ids actually sent.
#[derive(Debug, Clone, Builder)]
pub struct TaskRequest {
    #[builder(into)]
    pub text: String,
    pub file: Option<FileAttachment>,
    #[builder(into)]
    pub session_id: Option<String>,
    #[builder(into)]
    pub task_id: Option<String>,
    /// Aborts the in-flight network work when cancelled.
    #[builder(default)]
    pub cancel: CancellationToken,
}

impl TaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self::builder().text(text).build()
    }
}

/// Result of a task submission.
#[derive(Debug, Clone)]
pub struct TaskReply {
    pub task_id: String,
    pub session_id: String,
    /// The envelope this client transmitted. Kept apart from `body` so it can
    /// never be confused with a same-named field returned by the server.
    pub envelope: Envelope,
    /// Raw server payload: the single document, the last streamed value, or
    /// the recovered task state.
    pub body: Value,
}

impl TaskReply {
    /// Task id assigned by the server, when it reports one.
    pub fn server_task_id(&self) -> Option<&str> {
        self.body
            .pointer("/result/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn normalize(&self) -> NormalizedResponse {
        normalize(&self.body)
    }
}

/// Receives each reconstructed stream value, in order.
pub type ChunkCallback<'a> = dyn for<'v> FnMut(&'v Value) + Send + 'a;

/// Operations against one agent endpoint.
///
/// Implementations hold no state across calls beyond the endpoint address;
/// every call is independently retryable and none retries by itself.
#[async_trait]
pub trait AgentProtocol: Send + Sync {
    fn endpoint_url(&self) -> &str;

    async fn fetch_capability_card(&self) -> Result<CapabilityCard>;

    async fn send_task(&self, request: TaskRequest) -> Result<TaskReply>;

    /// Submit and consume the reply incrementally. `on_chunk` sees every
    /// reconstructed value in order, exactly once, before this resolves.
    async fn send_task_streaming(
        &self,
        request: TaskRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<TaskReply>;

    async fn get_task(&self, task_id: &str) -> Result<Value>;
}

/// Creates the client for an endpoint; replaced clients are simply dropped.
pub type ClientFactory = Arc<dyn Fn(&AgentEndpoint) -> Arc<dyn AgentProtocol> + Send + Sync>;

/// Factory producing HTTP clients that share one configuration.
pub fn http_client_factory(config: Arc<crate::config::ClientConfig>) -> ClientFactory {
    Arc::new(move |endpoint: &AgentEndpoint| {
        Arc::new(AgentClient::new(endpoint.url.clone(), config.clone())) as Arc<dyn AgentProtocol>
    })
}
