//! Per-agent sessions, task continuation and chat history.
//!
//! The [`Coordinator`] owns one client per registered agent plus that agent's
//! session and [`ChatLog`]. Locks are never held across an await, so agents
//! progress independently and history writes happen only between network
//! suspensions.

pub mod record;
pub mod session;

pub use record::{ChatLog, ChatRecord, Sender, PENDING_CONTENT};
pub use session::{continuation, Continuation, ConversationPhase, Session};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{http_client_factory, AgentProtocol, ClientFactory, TaskReply, TaskRequest};
use crate::config::ClientConfig;
use crate::error::{Result, TaskLinkError};
use crate::normalize::normalize;
use crate::protocol::{ProtocolMethod, RequestBuilder, TaskParams};
use crate::types::{AgentEndpoint, CapabilityCard, FileAttachment, OutboundMessage};
use crate::util::text::preview;

#[derive(Debug, Default)]
struct Conversation {
    session: Option<Session>,
    log: ChatLog,
}

impl Conversation {
    fn ensure_session(&mut self, agent_id: &str) -> &Session {
        self.session.get_or_insert_with(|| {
            let session = Session::new(agent_id);
            info!(agent_id, session_id = %session.session_id, "session created");
            session
        })
    }
}

struct AgentSlot {
    endpoint: AgentEndpoint,
    client: Arc<dyn AgentProtocol>,
    conversation: Arc<Mutex<Conversation>>,
}

fn lock(conversation: &Mutex<Conversation>) -> MutexGuard<'_, Conversation> {
    conversation.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One outbound user turn.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub text: String,
    pub file: Option<FileAttachment>,
    pub cancel: CancellationToken,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Owns agent clients, sessions and chat histories.
pub struct Coordinator {
    agents: RwLock<HashMap<String, AgentSlot>>,
    factory: ClientFactory,
    builder: RequestBuilder,
    accepted_output_modes: Vec<String>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("agents", &self.agent_ids())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Coordinator talking HTTP to every agent.
    pub fn new(config: Arc<ClientConfig>) -> Self {
        let factory = http_client_factory(config.clone());
        Self::with_factory(&config, factory)
    }

    pub fn with_factory(config: &ClientConfig, factory: ClientFactory) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            factory,
            builder: RequestBuilder::new(config.methods.clone()),
            accepted_output_modes: config.accepted_output_modes.clone(),
        }
    }

    fn read_agents(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, AgentSlot>> {
        self.agents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_agents(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, AgentSlot>> {
        self.agents.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot<T>(&self, agent_id: &str, f: impl FnOnce(&AgentSlot) -> T) -> Result<T> {
        self.read_agents()
            .get(agent_id)
            .map(f)
            .ok_or_else(|| TaskLinkError::InvalidArgument(format!("unknown agent: {agent_id}")))
    }

    fn conversation(&self, agent_id: &str) -> Result<Arc<Mutex<Conversation>>> {
        self.slot(agent_id, |slot| slot.conversation.clone())
    }

    /// Register an agent, replacing any previous registration with the same id.
    pub fn add_agent(&self, endpoint: AgentEndpoint) {
        let client = (self.factory)(&endpoint);
        info!(agent_id = %endpoint.id, url = %endpoint.url, "agent registered");
        self.write_agents().insert(
            endpoint.id.clone(),
            AgentSlot {
                endpoint,
                client,
                conversation: Arc::default(),
            },
        );
    }

    /// Update an agent's endpoint. A changed url gets a fresh client; the
    /// session and history are kept.
    pub fn update_agent(&self, endpoint: AgentEndpoint) -> Result<()> {
        let mut agents = self.write_agents();
        let slot = agents.get_mut(&endpoint.id).ok_or_else(|| {
            TaskLinkError::InvalidArgument(format!("unknown agent: {}", endpoint.id))
        })?;
        if slot.endpoint.url != endpoint.url {
            debug!(agent_id = %endpoint.id, url = %endpoint.url, "endpoint url changed, replacing client");
            slot.client = (self.factory)(&endpoint);
        }
        slot.endpoint = endpoint;
        Ok(())
    }

    pub fn remove_agent(&self, agent_id: &str) -> Option<AgentEndpoint> {
        let removed = self.write_agents().remove(agent_id).map(|slot| slot.endpoint);
        if removed.is_some() {
            info!(agent_id, "agent removed");
        }
        removed
    }

    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read_agents().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn endpoint(&self, agent_id: &str) -> Option<AgentEndpoint> {
        self.slot(agent_id, |slot| slot.endpoint.clone()).ok()
    }

    pub fn client(&self, agent_id: &str) -> Option<Arc<dyn AgentProtocol>> {
        self.slot(agent_id, |slot| slot.client.clone()).ok()
    }

    /// Select an agent, creating its session on first use. Returns the session id.
    pub fn select_agent(&self, agent_id: &str) -> Result<String> {
        let conversation = self.conversation(agent_id)?;
        let mut conversation = lock(&conversation);
        Ok(conversation.ensure_session(agent_id).session_id.clone())
    }

    pub fn session_id(&self, agent_id: &str) -> Option<String> {
        let conversation = self.conversation(agent_id).ok()?;
        let conversation = lock(&conversation);
        conversation.session.as_ref().map(|s| s.session_id.clone())
    }

    pub fn history(&self, agent_id: &str) -> Vec<ChatRecord> {
        match self.conversation(agent_id) {
            Ok(conversation) => lock(&conversation).log.records().to_vec(),
            Err(_) => Vec::new(),
        }
    }

    pub fn phase(&self, agent_id: &str) -> Option<ConversationPhase> {
        let conversation = self.conversation(agent_id).ok()?;
        let conversation = lock(&conversation);
        Some(session::phase(conversation.session.as_ref(), &conversation.log))
    }

    /// Discard this agent's history and start a new session.
    pub fn reset_conversation(&self, agent_id: &str) -> Result<String> {
        let conversation = self.conversation(agent_id)?;
        let mut conversation = lock(&conversation);
        conversation.log.clear();
        let session = Session::new(agent_id);
        let session_id = session.session_id.clone();
        conversation.session = Some(session);
        info!(agent_id, session_id = %session_id, "conversation reset");
        Ok(session_id)
    }

    pub async fn fetch_card(&self, agent_id: &str) -> Result<CapabilityCard> {
        let client = self.slot(agent_id, |slot| slot.client.clone())?;
        client.fetch_capability_card().await
    }

    pub async fn send_message(&self, agent_id: &str, message: OutgoingMessage) -> Result<ChatRecord> {
        self.send_message_with(agent_id, message, |_| {}).await
    }

    /// Send one user turn and fold the reply into the agent's history.
    ///
    /// `on_update` sees the placeholder after every streamed value and then
    /// the settled record. Transport failures become an error record in the
    /// history and are returned as `Ok`; only an unknown agent or a turn that
    /// collides with one already in flight is an `Err`.
    pub async fn send_message_with<F>(
        &self,
        agent_id: &str,
        message: OutgoingMessage,
        mut on_update: F,
    ) -> Result<ChatRecord>
    where
        F: FnMut(&ChatRecord) + Send,
    {
        let (client, streaming, conversation) = self.slot(agent_id, |slot| {
            (
                slot.client.clone(),
                slot.endpoint.streaming,
                slot.conversation.clone(),
            )
        })?;
        let method = if streaming {
            ProtocolMethod::SendStreaming
        } else {
            ProtocolMethod::Send
        };

        let (request, user_id, pending_id) = {
            let mut guard = lock(&conversation);
            if guard.log.pending().is_some() {
                return Err(TaskLinkError::InvalidArgument(format!(
                    "agent {agent_id} is still answering the previous message"
                )));
            }
            let session_id = guard.ensure_session(agent_id).session_id.clone();
            let task_id = continuation(&guard.log).into_task_id();

            let outbound = OutboundMessage::user(message.text.clone(), message.file.as_ref());
            let provisional = self
                .builder
                .build(
                    method,
                    &TaskParams::submit(
                        task_id.clone(),
                        session_id.clone(),
                        self.accepted_output_modes.clone(),
                        outbound,
                    ),
                )
                .and_then(|envelope| Ok(serde_json::to_value(envelope)?))
                .ok();

            let user = ChatRecord::user(
                message.text.clone(),
                message.file.as_ref().map(|f| f.name.clone()),
                provisional,
            );
            let user_id = user.id.clone();
            let pending = ChatRecord::pending_agent();
            let pending_id = pending.id.clone();
            guard.log.append(user)?;
            guard.log.append(pending)?;

            info!(
                agent_id,
                task_id = %task_id,
                session_id = %session_id,
                streaming,
                message = %preview(&message.text),
                "sending message"
            );
            let request = TaskRequest::builder()
                .text(message.text)
                .maybe_file(message.file)
                .session_id(session_id)
                .task_id(task_id)
                .cancel(message.cancel)
                .build();
            (request, user_id, pending_id)
        };

        let outcome = if streaming {
            let mut on_chunk = |value: &Value| {
                let response = normalize(value);
                let updated = lock(&conversation)
                    .log
                    .update(&pending_id, |record| record.absorb(&response, value));
                match updated {
                    Some(record) => on_update(&record),
                    None => debug!("placeholder gone, dropping streamed update"),
                }
            };
            client.send_task_streaming(request, &mut on_chunk).await
        } else {
            client.send_task(request).await
        };

        let settled = match outcome {
            Ok(reply) => self.settle(&conversation, &user_id, &pending_id, reply),
            Err(err) => {
                warn!(agent_id, error = %err, "message failed");
                let record = ChatRecord::error(&err);
                let mut guard = lock(&conversation);
                if guard.log.remove(&pending_id).is_some() {
                    guard.log.append(record.clone())?;
                } else {
                    debug!(agent_id, "conversation reset while awaiting reply, discarding error");
                }
                record
            }
        };
        on_update(&settled);
        Ok(settled)
    }

    fn settle(
        &self,
        conversation: &Mutex<Conversation>,
        user_id: &str,
        pending_id: &str,
        reply: TaskReply,
    ) -> ChatRecord {
        let id = reply
            .server_task_id()
            .unwrap_or(&reply.task_id)
            .to_string();
        let response = reply.normalize();
        let envelope = serde_json::to_value(&reply.envelope).ok();

        let mut guard = lock(conversation);
        // Streamed fields survive a final value that lacks them.
        let mut record = match guard.log.records().iter().find(|r| r.id == pending_id) {
            Some(placeholder) if placeholder.raw_exchange.is_some() => {
                let mut record = placeholder.clone();
                record.absorb(&response, &reply.body);
                record
            }
            _ => ChatRecord::agent(id.clone(), response, reply.body.clone()),
        };
        record.id = id;
        record.pending = false;
        record.timestamp = chrono::Utc::now();

        if guard.log.replace(pending_id, record.clone()) {
            guard.log.update(user_id, |user| user.raw_exchange = envelope);
            debug!(task_id = %record.id, state = ?record.state, "reply recorded");
        } else {
            debug!(task_id = %record.id, "conversation reset while awaiting reply, discarding");
        }
        record
    }
}
