//! Workspace settings loaded from `quill.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quill_sync::SyncConfig;

/// Name of the settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "quill.toml";

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "QUILL_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory standing in for the remote store. Files in it are the
    /// cloud copies; its absence means the connection is down.
    pub remote_dir: PathBuf,
    #[serde(flatten)]
    pub sync: SyncConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_dir: PathBuf::from("remote"),
            sync: SyncConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `QUILL_CONFIG` if set, otherwise from
    /// `./quill.toml`, otherwise defaults.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(SETTINGS_ENV) {
            Some(p) => PathBuf::from(p),
            None => {
                let p = PathBuf::from(SETTINGS_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        settings.sync.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}
