//! Configuration for the sync core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the sync coordinator and debouncer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory for persisted timestamps and pending-upload flags
    pub state_dir: PathBuf,

    /// Quiet period after a local edit before a sync pass runs
    /// (default: 3 seconds)
    #[serde(with = "duration_ms", rename = "debounce_delay_ms")]
    pub debounce_delay: Duration,

    /// Band within which local and remote timestamps are treated as equal,
    /// absorbing clock-skew and round-trip latency noise (default: 2 seconds)
    #[serde(with = "duration_ms", rename = "tolerance_ms")]
    pub tolerance: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".quillpad/state"),
            debounce_delay: Duration::from_millis(3000),
            tolerance: Duration::from_millis(2000),
        }
    }
}

impl SyncConfig {
    /// Load config from TOML file
    pub fn from_toml(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.state_dir.as_os_str().is_empty() {
            anyhow::bail!("state_dir cannot be empty");
        }
        if self.tolerance.is_zero() {
            anyhow::bail!("tolerance_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Serialize `Duration` fields as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
