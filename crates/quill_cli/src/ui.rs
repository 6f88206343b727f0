//! Terminal-facing port adapters: the conflict prompt and the status sink

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

use quill_common::FileId;
use quill_sync::{ConflictChoice, ConflictPrompt, RemoteError, StatusReport, StatusSink, SyncStatus};

/// Asks the user on stdin which side of a conflict wins
pub struct TerminalPrompt;

#[async_trait]
impl ConflictPrompt for TerminalPrompt {
    async fn resolve(
        &self,
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
        file: &FileId,
    ) -> Result<ConflictChoice, RemoteError> {
        eprintln!("Conflict on {file}:");
        eprintln!("  local copy modified  {local}");
        eprintln!("  remote copy modified {remote}");
        eprint!("Keep [l]ocal, keep [r]emote, or [c]ancel? ");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|err| RemoteError::Api(format!("conflict prompt read failed: {err}")))?;
            let Some(line) = line else {
                // stdin closed: treat as cancel, never guess for the user
                return Ok(ConflictChoice::Cancel);
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "l" | "local" => return Ok(ConflictChoice::KeepLocal),
                "r" | "remote" => return Ok(ConflictChoice::KeepRemote),
                "c" | "cancel" | "" => return Ok(ConflictChoice::Cancel),
                other => eprint!("Unrecognized answer {other:?}, expected l/r/c: "),
            }
        }
    }
}

/// A prompt for non-interactive runs: always answers with a fixed choice
pub struct FixedPrompt(pub ConflictChoice);

#[async_trait]
impl ConflictPrompt for FixedPrompt {
    async fn resolve(
        &self,
        _local: DateTime<Utc>,
        _remote: DateTime<Utc>,
        file: &FileId,
    ) -> Result<ConflictChoice, RemoteError> {
        tracing::info!(file = %file, choice = ?self.0, "Resolving conflict non-interactively");
        Ok(self.0)
    }
}

/// Logs status transitions and remembers the most recent one
#[derive(Default)]
pub struct CliSink {
    last: Mutex<Option<StatusReport>>,
}

impl CliSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last status reported, once a pass has run
    pub fn last_report(&self) -> Option<StatusReport> {
        self.last.lock().expect("status sink lock poisoned").clone()
    }
}

impl StatusSink for CliSink {
    fn report(&self, report: &StatusReport) {
        match report.status {
            SyncStatus::Error => {
                tracing::error!(file = ?report.file, message = %report.message, "Sync status: error")
            }
            SyncStatus::Offline | SyncStatus::NotConnected => {
                tracing::warn!(file = ?report.file, status = %report.status, "Sync status changed")
            }
            _ => tracing::info!(file = ?report.file, status = %report.status, "Sync status changed"),
        }
        *self.last.lock().expect("status sink lock poisoned") = Some(report.clone());
    }
}
