//! Durable agent directory and settings record.

pub mod agents;
pub mod settings;

pub use agents::{
    export_agents, import_agents, AgentDirectory, FileAgentDirectory, MemoryAgentDirectory,
};
pub use settings::{FileSettingsStore, Settings};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// `~/.tasklink`, or `.tasklink` when no home directory is known.
pub fn default_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".tasklink"))
        .unwrap_or_else(|| PathBuf::from(".tasklink"))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// File contents, or `None` if the file does not exist.
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
