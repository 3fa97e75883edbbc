//! Agent directory persistence, import and export.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, info};

use super::{default_dir, ensure_parent, read_optional};
use crate::error::{Result, TaskLinkError};
use crate::types::AgentEndpoint;

const AGENTS_FILE: &str = "agents.json";

/// Storage abstraction for the configured agents.
pub trait AgentDirectory: Send + Sync {
    /// Stored agents; the local default agent when nothing was ever saved.
    fn load(&self) -> Result<Vec<AgentEndpoint>>;
    fn save(&self, agents: &[AgentEndpoint]) -> Result<()>;
}

/// Agents kept as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileAgentDirectory {
    path: PathBuf,
}

impl FileAgentDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn new_default() -> Self {
        Self::new(default_dir().join(AGENTS_FILE))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl AgentDirectory for FileAgentDirectory {
    fn load(&self) -> Result<Vec<AgentEndpoint>> {
        let Some(raw) = read_optional(&self.path)? else {
            debug!(path = %self.path.display(), "no agent directory, using local default");
            return Ok(vec![AgentEndpoint::local_default()]);
        };
        serde_json::from_str(&raw).map_err(|e| TaskLinkError::decode(raw, e))
    }

    fn save(&self, agents: &[AgentEndpoint]) -> Result<()> {
        ensure_parent(&self.path)?;
        fs::write(&self.path, export_agents(agents)?)?;
        info!(count = agents.len(), path = %self.path.display(), "saved agents");
        Ok(())
    }
}

/// Process-local directory, used when no durable storage is available.
#[derive(Debug, Default)]
pub struct MemoryAgentDirectory {
    agents: Mutex<Option<Vec<AgentEndpoint>>>,
}

impl MemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentDirectory for MemoryAgentDirectory {
    fn load(&self) -> Result<Vec<AgentEndpoint>> {
        let agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(agents
            .clone()
            .unwrap_or_else(|| vec![AgentEndpoint::local_default()]))
    }

    fn save(&self, agents: &[AgentEndpoint]) -> Result<()> {
        *self.agents.lock().unwrap_or_else(PoisonError::into_inner) = Some(agents.to_vec());
        Ok(())
    }
}

/// Render agents as pretty JSON for backup or sharing.
pub fn export_agents(agents: &[AgentEndpoint]) -> Result<String> {
    Ok(serde_json::to_string_pretty(agents)?)
}

/// Parse and validate an exported agent list.
///
/// Every entry needs a non-empty `name` and `url`; entries without an `id`
/// get a fresh one. Nothing is persisted here.
pub fn import_agents(json: &str) -> Result<Vec<AgentEndpoint>> {
    let parsed: Value =
        serde_json::from_str(json).map_err(|e| TaskLinkError::Store(format!("invalid JSON: {e}")))?;
    let Value::Array(entries) = parsed else {
        return Err(TaskLinkError::Store(
            "invalid format: agents must be an array".to_string(),
        ));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, mut entry)| {
            let has = |field: &str| {
                entry
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| !v.trim().is_empty())
            };
            if !has("name") || !has("url") {
                return Err(TaskLinkError::Store(format!(
                    "invalid agent at position {index}: missing required fields"
                )));
            }
            if let Some(object) = entry.as_object_mut() {
                let missing_id = object
                    .get("id")
                    .and_then(Value::as_str)
                    .map_or(true, str::is_empty);
                if missing_id {
                    object.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
                }
            }
            serde_json::from_value(entry).map_err(|e| {
                TaskLinkError::Store(format!("invalid agent at position {index}: {e}"))
            })
        })
        .collect()
}
