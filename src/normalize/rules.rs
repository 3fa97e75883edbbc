//! Extraction rules, in precedence order.

use serde_json::Value;
use tracing::debug;

use crate::types::{Artifact, TaskState};

/// Projects response text out of one known shape.
#[derive(Debug, Clone, Copy)]
pub struct ContentRule {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct StateRule {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<TaskState>,
}

#[derive(Debug, Clone, Copy)]
pub struct ArtifactRule {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<Vec<Artifact>>,
}

/// Name of the artifact whose text doubles as the primary content.
pub const RESULT_ARTIFACT: &str = "result";

pub const CONTENT_RULES: &[ContentRule] = &[
    ContentRule {
        name: "result.artifacts[result].parts",
        extract: result_artifact_text,
    },
    ContentRule {
        name: "result.status.message.parts",
        extract: status_message_text,
    },
    ContentRule {
        name: "result.content",
        extract: result_content,
    },
    ContentRule {
        name: "result.message.parts",
        extract: result_message_text,
    },
    ContentRule {
        name: "result.agent_response.content",
        extract: agent_response_content,
    },
    ContentRule {
        name: "content",
        extract: top_level_content,
    },
    ContentRule {
        name: "text|message",
        extract: top_level_text_or_message,
    },
];

pub const STATE_RULES: &[StateRule] = &[StateRule {
    name: "result.status.state",
    extract: status_state,
}];

pub const ARTIFACT_RULES: &[ArtifactRule] = &[ArtifactRule {
    name: "result.artifacts",
    extract: result_artifacts,
}];

fn string_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |node, key| node.get(key))?
        .as_str()
}

fn is_text_part(part: &Value) -> bool {
    let tag = part
        .get("kind")
        .or_else(|| part.get("type"))
        .and_then(Value::as_str);
    tag == Some("text")
}

/// First non-empty text-typed part of a `parts` array.
fn first_text_part(parts: Option<&Value>) -> Option<String> {
    parts?
        .as_array()?
        .iter()
        .filter(|part| is_text_part(part))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn result_artifact_text(value: &Value) -> Option<String> {
    result_artifacts(value)?
        .iter()
        .filter(|artifact| artifact.name.as_deref() == Some(RESULT_ARTIFACT))
        .find_map(|artifact| artifact.first_text().map(str::to_string))
}

fn status_message_text(value: &Value) -> Option<String> {
    first_text_part(value.pointer("/result/status/message/parts"))
}

fn result_content(value: &Value) -> Option<String> {
    string_at(value, &["result", "content"]).map(str::to_string)
}

fn result_message_text(value: &Value) -> Option<String> {
    first_text_part(value.pointer("/result/message/parts"))
}

fn agent_response_content(value: &Value) -> Option<String> {
    string_at(value, &["result", "agent_response", "content"]).map(str::to_string)
}

fn top_level_content(value: &Value) -> Option<String> {
    string_at(value, &["content"]).map(str::to_string)
}

fn top_level_text_or_message(value: &Value) -> Option<String> {
    ["text", "message"]
        .iter()
        .filter_map(|field| string_at(value, &[*field]))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn status_state(value: &Value) -> Option<TaskState> {
    string_at(value, &["result", "status", "state"]).map(TaskState::from_wire)
}

fn result_artifacts(value: &Value) -> Option<Vec<Artifact>> {
    let artifacts = value.pointer("/result/artifacts")?.as_array()?;
    Some(
        artifacts
            .iter()
            .filter_map(|raw| match serde_json::from_value::<Artifact>(raw.clone()) {
                Ok(artifact) => Some(artifact),
                Err(err) => {
                    debug!(error = %err, "dropping artifact with unexpected shape");
                    None
                }
            })
            .collect(),
    )
}
