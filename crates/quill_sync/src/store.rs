//! Durable per-file timestamp records
//!
//! Two instants are tracked per file identity:
//!
//! - `local_modified`: stamped on every local save; absent means "never
//!   edited locally since last reset"
//! - `last_sync`: stamped only on a confirmed successful reconciliation.
//!   Kept as an audit trail; the decision logic never reads it back.
//!
//! Records live in `<state_dir>/timestamps.json`, loaded once at open and
//! rewritten on every mutation so they survive process restarts.

use chrono::{DateTime, Utc};
use quill_common::{FileId, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

const TIMESTAMPS_FILE: &str = "timestamps.json";

/// Timestamp record for a single file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_modified: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

/// Persisted map of per-file timestamp records
pub struct TimestampStore {
    path: PathBuf,
    records: Mutex<HashMap<FileId, FileTimestamps>>,
}

impl TimestampStore {
    /// Open (or create) the store under `state_dir`
    pub fn open(state_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_dir = state_dir.into();
        fs::create_dir_all(&state_dir)?;
        let path = state_dir.join(TIMESTAMPS_FILE);

        let records = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Instant of the last local save for `file`
    pub fn local_modified(&self, file: &FileId) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .expect("timestamp store lock poisoned")
            .get(file)
            .and_then(|record| record.local_modified)
    }

    /// Stamp the local-modified instant for `file`
    pub fn set_local_modified(
        &self,
        file: &FileId,
        instant: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update(file, |record| record.local_modified = Some(instant))
    }

    /// Instant of the last confirmed reconciliation for `file`
    pub fn last_sync(&self, file: &FileId) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .expect("timestamp store lock poisoned")
            .get(file)
            .and_then(|record| record.last_sync)
    }

    /// Stamp the last-sync instant for `file` with the current time
    pub fn mark_synced(&self, file: &FileId) -> Result<(), StoreError> {
        let now = Utc::now();
        tracing::debug!(file = %file, at = %now, "Last sync time stamped");
        self.update(file, |record| record.last_sync = Some(now))
    }

    /// Move the timestamp record from `old` to `new` (file-rename lifecycle)
    pub fn rename(&self, old: &FileId, new: &FileId) -> Result<(), StoreError> {
        let snapshot = {
            let mut records = self.records.lock().expect("timestamp store lock poisoned");
            if let Some(record) = records.remove(old) {
                records.insert(new.clone(), record);
            }
            records.clone()
        };
        self.persist(&snapshot)
    }

    /// Drop all timestamp records for `file` (file-removal lifecycle)
    pub fn remove(&self, file: &FileId) -> Result<(), StoreError> {
        let snapshot = {
            let mut records = self.records.lock().expect("timestamp store lock poisoned");
            records.remove(file);
            records.clone()
        };
        self.persist(&snapshot)
    }

    fn update(
        &self,
        file: &FileId,
        apply: impl FnOnce(&mut FileTimestamps),
    ) -> Result<(), StoreError> {
        let snapshot = {
            let mut records = self.records.lock().expect("timestamp store lock poisoned");
            apply(records.entry(file.clone()).or_default());
            records.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, records: &HashMap<FileId, FileTimestamps>) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
