//! Session identity and the task continuation decision.

use serde::{Deserialize, Serialize};

use super::record::ChatLog;
use crate::types::TaskState;

/// Client-side correlation token for one agent's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub agent_id: String,
    pub session_id: String,
}

impl Session {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Where an agent's conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConversationPhase {
    NoSession,
    AwaitingResponse,
    Idle,
    AwaitingInput,
}

/// Task id to use for the next outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    NewTask,
    Continue { task_id: String },
}

impl Continuation {
    /// The task id to send, generating one for a new task.
    pub fn into_task_id(self) -> String {
        match self {
            Self::NewTask => uuid::Uuid::new_v4().to_string(),
            Self::Continue { task_id } => task_id,
        }
    }
}

/// Continue only when the latest settled agent record is awaiting input.
pub fn continuation(log: &ChatLog) -> Continuation {
    match log.last_agent() {
        Some(record) if record.state.is_some_and(TaskState::awaits_input) && !record.is_error => {
            Continuation::Continue {
                task_id: record.id.clone(),
            }
        }
        _ => Continuation::NewTask,
    }
}

pub fn phase(session: Option<&Session>, log: &ChatLog) -> ConversationPhase {
    if session.is_none() {
        return ConversationPhase::NoSession;
    }
    if log.pending().is_some() {
        return ConversationPhase::AwaitingResponse;
    }
    match continuation(log) {
        Continuation::Continue { .. } => ConversationPhase::AwaitingInput,
        Continuation::NewTask => ConversationPhase::Idle,
    }
}
