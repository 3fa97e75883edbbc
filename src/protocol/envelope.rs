use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::MethodNames;
use crate::error::Result;
use crate::types::OutboundMessage;

pub const JSONRPC_VERSION: &str = "2.0";

/// The three task operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMethod {
    Send,
    SendStreaming,
    Get,
}

impl ProtocolMethod {
    /// Wire name under the given naming scheme.
    pub fn wire_name(self, names: &MethodNames) -> &str {
        match self {
            Self::Send => &names.send,
            Self::SendStreaming => &names.send_streaming,
            Self::Get => &names.get,
        }
    }
}

/// Parameters shared by all task methods. `id` is the task id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_output_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<OutboundMessage>,
}

impl TaskParams {
    pub fn submit(
        task_id: impl Into<String>,
        session_id: impl Into<String>,
        accepted_output_modes: Vec<String>,
        message: OutboundMessage,
    ) -> Self {
        Self {
            id: task_id.into(),
            session_id: Some(session_id.into()),
            accepted_output_modes: Some(accepted_output_modes),
            message: Some(message),
        }
    }

    pub fn query(task_id: impl Into<String>) -> Self {
        Self {
            id: task_id.into(),
            session_id: None,
            accepted_output_modes: None,
            message: None,
        }
    }
}

/// A JSON-RPC 2.0 request. `id` identifies the call, never the task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl Envelope {
    /// Task id carried in the params, if any.
    pub fn task_id(&self) -> Option<&str> {
        self.params.get("id").and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.params.get("sessionId").and_then(Value::as_str)
    }
}

/// Builds envelopes with a fresh call id per request.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    methods: MethodNames,
}

impl RequestBuilder {
    pub fn new(methods: MethodNames) -> Self {
        Self { methods }
    }

    pub fn build(&self, method: ProtocolMethod, params: &TaskParams) -> Result<Envelope> {
        let envelope = Envelope {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            method: method.wire_name(&self.methods).to_string(),
            params: serde_json::to_value(params)?,
        };
        debug!(method = %envelope.method, id = %envelope.id, task_id = %params.id, "built request envelope");
        Ok(envelope)
    }
}
