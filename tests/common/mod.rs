//! Shared test helpers and a scripted agent.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use tasklink::client::{AgentProtocol, ChunkCallback, ClientFactory, TaskReply, TaskRequest};
use tasklink::config::MethodNames;
use tasklink::error::{Result, TaskLinkError};
use tasklink::protocol::{ProtocolMethod, RequestBuilder, TaskParams};
use tasklink::types::{AgentEndpoint, CapabilityCard, OutboundMessage};

/// One canned answer.
pub enum Script {
    /// A single JSON document.
    Document(Value),
    /// Values delivered one by one through `on_chunk`; the last is the reply body.
    Stream(Vec<Value>),
    /// An endpoint error with this status.
    Fail(u16),
    /// Wait for the test to hand over the real script.
    Gated(oneshot::Receiver<Script>),
}

/// An agent that answers from a queue of scripts and records every request.
pub struct ScriptedAgent {
    url: String,
    builder: RequestBuilder,
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<TaskRequest>>,
}

impl ScriptedAgent {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            builder: RequestBuilder::new(MethodNames::default()),
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Queue a call that blocks until the returned sender supplies its script.
    pub fn queue_gated(&self) -> oneshot::Sender<Script> {
        let (tx, rx) = oneshot::channel();
        self.queue(Script::Gated(rx));
        tx
    }

    pub fn requests(&self) -> Vec<TaskRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until at least `count` calls have reached the agent.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.lock().unwrap().len() < count {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    async fn answer(
        &self,
        request: TaskRequest,
        method: ProtocolMethod,
        on_chunk: Option<&mut ChunkCallback<'_>>,
    ) -> Result<TaskReply> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script queued");
        let script = match script {
            Script::Gated(rx) => rx.await.expect("gate dropped"),
            other => other,
        };

        let task_id = request.task_id.clone().expect("coordinator sends a task id");
        let session_id = request
            .session_id
            .clone()
            .expect("coordinator sends a session id");
        let message = OutboundMessage::user(request.text.clone(), request.file.as_ref());
        let params = TaskParams::submit(
            task_id.clone(),
            session_id.clone(),
            vec!["text".to_string()],
            message,
        );
        let envelope = self.builder.build(method, &params)?;

        let body = match script {
            Script::Document(body) => {
                if let Some(on_chunk) = on_chunk {
                    on_chunk(&body);
                }
                body
            }
            Script::Stream(values) => {
                let on_chunk = on_chunk.expect("stream scripts need a streaming call");
                for value in &values {
                    on_chunk(value);
                }
                values.last().cloned().unwrap_or(Value::Null)
            }
            Script::Fail(status) => return Err(TaskLinkError::endpoint(status, None)),
            Script::Gated(_) => panic!("gated script released another gate"),
        };
        Ok(TaskReply {
            task_id,
            session_id,
            envelope,
            body,
        })
    }
}

#[async_trait]
impl AgentProtocol for ScriptedAgent {
    fn endpoint_url(&self) -> &str {
        &self.url
    }

    async fn fetch_capability_card(&self) -> Result<CapabilityCard> {
        Ok(serde_json::from_value(json!({"name": "Scripted", "capabilities": {"streaming": true}}))?)
    }

    async fn send_task(&self, request: TaskRequest) -> Result<TaskReply> {
        self.answer(request, ProtocolMethod::Send, None).await
    }

    async fn send_task_streaming(
        &self,
        request: TaskRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<TaskReply> {
        self.answer(request, ProtocolMethod::SendStreaming, Some(on_chunk))
            .await
    }

    async fn get_task(&self, task_id: &str) -> Result<Value> {
        Ok(json!({"result": {"id": task_id}}))
    }
}

/// Factory that hands out the same scripted agent for every endpoint.
pub fn factory(agent: Arc<ScriptedAgent>) -> ClientFactory {
    Arc::new(move |_: &AgentEndpoint| agent.clone() as Arc<dyn AgentProtocol>)
}

/// A completed reply carrying `text` in the status message.
pub fn completed(task_id: &str, text: &str) -> Value {
    reply(task_id, "completed", text)
}

pub fn reply(task_id: &str, state: &str, text: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "rpc-1",
        "result": {
            "id": task_id,
            "status": {
                "state": state,
                "message": {"role": "agent", "parts": [{"kind": "text", "text": text}]}
            }
        }
    })
}
