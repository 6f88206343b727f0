//! Sync status reporting types

use quill_common::FileId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of (or phase within) a reconciliation pass, as shown to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Up to date, nothing in flight
    Idle,

    /// A reconciliation pass is running
    Syncing,

    /// Network reported unavailable; pass skipped
    Offline,

    /// No remote connection configured yet (pre-login steady state)
    NotConnected,

    /// The pass ended in a failure; see the report message
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Offline => "offline",
            SyncStatus::NotConnected => "not connected",
            SyncStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// One status transition emitted through the status sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: SyncStatus,
    /// Branch-specific diagnostic; empty on non-error transitions
    pub message: String,
    pub file: Option<FileId>,
}

impl StatusReport {
    pub fn new(status: SyncStatus, file: Option<FileId>) -> Self {
        Self {
            status,
            message: String::new(),
            file,
        }
    }

    pub fn with_message(status: SyncStatus, message: impl Into<String>, file: Option<FileId>) -> Self {
        Self {
            status,
            message: message.into(),
            file,
        }
    }
}
