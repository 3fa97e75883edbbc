//! Task state, artifacts and the canonical response view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Content used when no extraction path produced text.
pub const NO_CONTENT: &str = "No response content found";

/// Normalized task state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TaskState {
    Unknown,
    Working,
    Completed,
    InputRequired,
    Error,
}

impl TaskState {
    /// Map a wire state string onto the normalized set.
    ///
    /// `submitted` is folded into `working`; the terminal failure states
    /// (`failed`, `rejected`, `canceled`) fold into `error`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "working" | "submitted" => Self::Working,
            "completed" => Self::Completed,
            "input-required" | "input_required" => Self::InputRequired,
            "error" | "failed" | "rejected" | "canceled" | "cancelled" => Self::Error,
            _ => Self::Unknown,
        }
    }

    /// Whether the agent is waiting for more input on the same task.
    pub fn awaits_input(self) -> bool {
        self == Self::InputRequired
    }
}

/// One part of an artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtifactPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Tag older agents send in place of `kind`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub legacy_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "file", skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<Value>,
}

impl ArtifactPart {
    /// `kind`, falling back to the legacy `type` tag.
    pub fn tag(&self) -> Option<&str> {
        self.kind.as_deref().or(self.legacy_kind.as_deref())
    }

    pub fn is_text(&self) -> bool {
        self.tag() == Some("text")
    }
}

/// A named output attached to a task result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parts: Vec<ArtifactPart>,
}

impl Artifact {
    /// First non-empty text part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts
            .iter()
            .filter(|p| p.is_text())
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.is_empty())
    }
}

/// Canonical `{content, state, artifacts}` view of any agent response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedResponse {
    pub content: String,
    pub state: Option<TaskState>,
    pub artifacts: Option<Vec<Artifact>>,
}

impl NormalizedResponse {
    /// Whether any content path matched.
    pub fn has_content(&self) -> bool {
        self.content != NO_CONTENT
    }
}

impl Default for NormalizedResponse {
    fn default() -> Self {
        Self {
            content: NO_CONTENT.to_string(),
            state: None,
            artifacts: None,
        }
    }
}
