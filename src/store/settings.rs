//! Application settings record.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{default_dir, ensure_parent, read_optional};
use crate::error::{Result, TaskLinkError};

const SETTINGS_FILE: &str = "settings.toml";

/// Flat settings record. Fields missing from storage keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether the command-line front end emits log output.
    pub log_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { log_enabled: true }
    }
}

/// Settings persisted as TOML.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn new_default() -> Self {
        Self::new(default_dir().join(SETTINGS_FILE))
    }

    pub fn load(&self) -> Result<Settings> {
        match read_optional(&self.path)? {
            Some(raw) => toml::from_str(&raw)
                .map_err(|e| TaskLinkError::Store(format!("invalid settings file: {e}"))),
            None => Ok(Settings::default()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        ensure_parent(&self.path)?;
        let serialized = toml::to_string(settings)
            .map_err(|e| TaskLinkError::Store(format!("could not encode settings: {e}")))?;
        fs::write(&self.path, serialized)?;
        info!(path = %self.path.display(), "saved settings");
        Ok(())
    }

    /// Overwrite stored settings with the defaults.
    pub fn reset(&self) -> Result<Settings> {
        let settings = Settings::default();
        self.save(&settings)?;
        Ok(settings)
    }
}
