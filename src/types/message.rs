//! Outbound message types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskLinkError};

/// Author of a protocol message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

/// A file handed to the core by the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: Option<String>,
    pub base64_content: String,
}

impl FileAttachment {
    pub fn new(
        name: impl Into<String>,
        mime_type: Option<String>,
        base64_content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type,
            base64_content: base64_content.into(),
        }
    }

    /// Encode raw bytes.
    pub fn from_bytes(name: impl Into<String>, mime_type: Option<String>, bytes: &[u8]) -> Self {
        Self::new(name, mime_type, STANDARD.encode(bytes))
    }
}

/// Wire shape of an embedded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
}

/// One part of an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    File { file: FilePayload },
}

impl From<&FileAttachment> for MessagePart {
    fn from(attachment: &FileAttachment) -> Self {
        MessagePart::File {
            file: FilePayload {
                name: attachment.name.clone(),
                mime_type: attachment.mime_type.clone(),
                bytes: Some(attachment.base64_content.clone()),
            },
        }
    }
}

/// A message sent to an agent. Always carries at least one part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    role: MessageRole,
    parts: Vec<MessagePart>,
}

impl OutboundMessage {
    /// Create a user message from explicit parts.
    pub fn new(parts: Vec<MessagePart>) -> Result<Self> {
        if parts.is_empty() {
            return Err(TaskLinkError::InvalidArgument(
                "outbound message needs at least one part".to_string(),
            ));
        }
        Ok(Self {
            role: MessageRole::User,
            parts,
        })
    }

    /// Text followed by an optional attachment.
    pub fn user(text: impl Into<String>, file: Option<&FileAttachment>) -> Self {
        let mut parts = vec![MessagePart::Text { text: text.into() }];
        if let Some(file) = file {
            parts.push(file.into());
        }
        Self {
            role: MessageRole::User,
            parts,
        }
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }
}
