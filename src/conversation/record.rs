//! Chat records and the per-agent append-only log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TaskLinkError};
use crate::types::{Artifact, NormalizedResponse, TaskState};

/// Placeholder text shown while a response is outstanding.
pub const PENDING_CONTENT: &str = "...";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// One entry in an agent's chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// For agent records, the task id the reply belongs to.
    pub id: String,
    pub sender: Sender,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TaskState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Request envelope for user records, server payload for agent records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_exchange: Option<Value>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub is_error: bool,
}

impl ChatRecord {
    pub fn user(text: impl Into<String>, attachment: Option<String>, raw: Option<Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            content: text.into(),
            state: None,
            artifacts: None,
            attachment,
            timestamp: Utc::now(),
            raw_exchange: raw,
            pending: false,
            is_error: false,
        }
    }

    pub fn pending_agent() -> Self {
        Self {
            id: format!("pending-{}", uuid::Uuid::new_v4()),
            sender: Sender::Agent,
            content: PENDING_CONTENT.to_string(),
            state: None,
            artifacts: None,
            attachment: None,
            timestamp: Utc::now(),
            raw_exchange: None,
            pending: true,
            is_error: false,
        }
    }

    pub fn agent(id: impl Into<String>, response: NormalizedResponse, raw: Value) -> Self {
        Self {
            id: id.into(),
            sender: Sender::Agent,
            content: response.content,
            state: response.state,
            artifacts: response.artifacts,
            attachment: None,
            timestamp: Utc::now(),
            raw_exchange: Some(raw),
            pending: false,
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Agent,
            content: format!("Error: {message}"),
            state: None,
            artifacts: None,
            attachment: None,
            timestamp: Utc::now(),
            raw_exchange: None,
            pending: false,
            is_error: true,
        }
    }

    /// Fold an intermediate response into this record. Fields the response
    /// lacks keep their previous values.
    pub fn absorb(&mut self, response: &NormalizedResponse, raw: &Value) {
        if response.has_content() {
            self.content = response.content.clone();
        }
        if response.state.is_some() {
            self.state = response.state;
        }
        if response.artifacts.is_some() {
            self.artifacts = response.artifacts.clone();
        }
        self.raw_exchange = Some(raw.clone());
    }
}

/// Ordered records for one agent.
///
/// Records are only appended or replaced in place, and at most one pending
/// placeholder exists at a time.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    records: Vec<ChatRecord>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ChatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, record: ChatRecord) -> Result<()> {
        if record.pending && self.pending().is_some() {
            return Err(TaskLinkError::InvalidArgument(
                "chat log already holds a pending record".to_string(),
            ));
        }
        self.records.push(record);
        Ok(())
    }

    /// Replace the record with `id` in place. Returns false if it is gone.
    pub fn replace(&mut self, id: &str, record: ChatRecord) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Mutate the record with `id` in place, returning a copy of the result.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut ChatRecord)) -> Option<ChatRecord> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        f(record);
        Some(record.clone())
    }

    pub fn pending(&self) -> Option<&ChatRecord> {
        self.records.iter().find(|r| r.pending)
    }

    /// Remove the record with `id`, if it is still present.
    pub fn remove(&mut self, id: &str) -> Option<ChatRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Most recent settled agent-authored record.
    pub fn last_agent(&self) -> Option<&ChatRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.sender == Sender::Agent && !r.pending)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
