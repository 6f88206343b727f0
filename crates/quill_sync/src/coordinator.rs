//! Sync coordinator orchestration
//!
//! One call to [`SyncCoordinator::coordinate`] runs exactly one
//! reconciliation pass for the currently active file: read both timestamps,
//! classify the relationship, then upload, download, resolve a conflict or
//! do nothing. Stored state is mutated only after the corresponding network
//! operation confirms success, so a failed pass leaves everything as it was.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use quill_common::FileId;

use crate::config::SyncConfig;
use crate::offline::PendingUploadTracker;
use crate::ports::{ConflictChoice, ConflictPrompt, Connectivity, LocalStore, RemoteStore, StatusSink};
use crate::status::{StatusReport, SyncStatus};
use crate::store::TimestampStore;
use crate::{Result, SyncError};

/// What one reconciliation pass should do, decided before any transfer I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Local is authoritative: upload, stamp sync time, clear pending
    UploadLocal,

    /// Remote exists and local has no edit history: download and overwrite
    /// local unconditionally, stamp sync time, clear pending
    AdoptRemote,

    /// Remote moved on and nothing local is at risk: download and overwrite,
    /// stamp sync time; the pending flag is left untouched (already false)
    FollowRemote,

    /// Timestamps within the tolerance band: no I/O, clear pending
    InSync,

    /// Neither side has anything to reconcile: no I/O, clear pending
    Nothing,

    /// Remote is newer while local edits are pending: the user decides
    Conflict {
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
    },
}

/// Classify one file's local/remote timestamp relationship.
///
/// Cases are evaluated in priority order: remote-absent branches first, then
/// the tolerance band, then strict ordering. `pending` only matters in the
/// remote-newer case, where it separates a genuine conflict from a simple
/// update.
pub fn classify(
    local: Option<DateTime<Utc>>,
    remote: Option<DateTime<Utc>>,
    pending: bool,
    tolerance: Duration,
) -> SyncDecision {
    match (local, remote) {
        (Some(_), None) => SyncDecision::UploadLocal,
        (None, None) => SyncDecision::Nothing,
        (None, Some(_)) => SyncDecision::AdoptRemote,
        (Some(local), Some(remote)) => {
            let drift = (remote - local).abs();
            if drift <= tolerance {
                SyncDecision::InSync
            } else if remote > local {
                if pending {
                    SyncDecision::Conflict { local, remote }
                } else {
                    SyncDecision::FollowRemote
                }
            } else {
                SyncDecision::UploadLocal
            }
        }
    }
}

/// Orchestrates reconciliation passes for the active file
pub struct SyncCoordinator {
    local: Arc<dyn LocalStore>,
    network: Arc<dyn Connectivity>,
    prompt: Arc<dyn ConflictPrompt>,
    sink: Arc<dyn StatusSink>,
    timestamps: Arc<TimestampStore>,
    pending: Arc<PendingUploadTracker>,
    tolerance: Duration,

    /// Remote handle, absent until the backend has been connected.
    /// Held behind a lock so connect/disconnect can race a running pass.
    connection: StdMutex<Option<Arc<dyn RemoteStore>>>,

    /// At most one reconciliation pass may be in flight at a time.
    pass_lock: Mutex<()>,
}

impl SyncCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local: Arc<dyn LocalStore>,
        network: Arc<dyn Connectivity>,
        prompt: Arc<dyn ConflictPrompt>,
        sink: Arc<dyn StatusSink>,
        timestamps: Arc<TimestampStore>,
        pending: Arc<PendingUploadTracker>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            local,
            network,
            prompt,
            sink,
            timestamps,
            pending,
            tolerance: Duration::milliseconds(config.tolerance.as_millis() as i64),
            connection: StdMutex::new(None),
            pass_lock: Mutex::new(()),
        }
    }

    /// Attach the remote backend handle (on login / startup)
    pub fn connect(&self, remote: Arc<dyn RemoteStore>) {
        *self.connection.lock().expect("connection lock poisoned") = Some(remote);
    }

    /// Detach the remote backend handle (on logout)
    pub fn disconnect(&self) {
        *self.connection.lock().expect("connection lock poisoned") = None;
    }

    fn connection(&self) -> Option<Arc<dyn RemoteStore>> {
        self.connection
            .lock()
            .expect("connection lock poisoned")
            .clone()
    }

    /// Run exactly one reconciliation pass for the currently active file.
    ///
    /// Never returns an error: every failure is caught here and communicated
    /// through the status sink, leaving retry to the next triggered pass.
    pub async fn coordinate(&self) {
        let _pass = self.pass_lock.lock().await;

        let Some(file) = self.local.active_file() else {
            let err = SyncError::NoActiveFile;
            tracing::error!(error = %err, "Sync failed: could not determine active file");
            self.sink.report(&StatusReport::with_message(
                SyncStatus::Error,
                err.to_string(),
                None,
            ));
            return;
        };
        tracing::debug!(file = %file, "Starting coordinated sync");

        let Some(remote) = self.connection() else {
            // Expected steady state before login; no status change.
            tracing::warn!("Remote backend not connected, cannot sync");
            return;
        };

        if !self.network.is_online() {
            tracing::warn!(file = %file, "Cannot sync, application is offline");
            self.sink
                .report(&StatusReport::new(SyncStatus::Offline, Some(file)));
            return;
        }

        self.sink
            .report(&StatusReport::new(SyncStatus::Syncing, Some(file.clone())));

        let (status, message) = match self.run_pass(remote.as_ref(), &file).await {
            Ok(()) => (SyncStatus::Idle, String::new()),
            Err(err) => {
                tracing::error!(file = %file, error = %err, "Sync pass failed");
                (SyncStatus::Error, err.to_string())
            }
        };

        // Exactly one exit report, chosen from the live connection state:
        // a disconnect while the pass ran wins over the computed status.
        if self.connection().is_some() {
            self.sink
                .report(&StatusReport::with_message(status, message, Some(file)));
        } else {
            self.sink
                .report(&StatusReport::new(SyncStatus::NotConnected, None));
        }
    }

    async fn run_pass(&self, remote: &dyn RemoteStore, file: &FileId) -> Result<()> {
        let local_modified = self.timestamps.local_modified(file);
        let remote_modified = match remote.metadata(file).await {
            Ok(meta) => meta.server_modified.filter(|_| meta.exists),
            Err(err) => {
                // Baseline behavior: a failed metadata fetch is handled like
                // "remote absent". See DESIGN.md for the tradeoff.
                let err = SyncError::RemoteFetch(err.to_string());
                tracing::warn!(
                    file = %file,
                    error = %err,
                    "Treating remote as absent"
                );
                None
            }
        };

        tracing::debug!(
            file = %file,
            local = ?local_modified,
            remote = ?remote_modified,
            "Sync check"
        );

        let pending = self.pending.is_pending(file);
        let decision = classify(local_modified, remote_modified, pending, self.tolerance);
        tracing::debug!(file = %file, ?decision, pending, "Reconciliation decision");

        match decision {
            SyncDecision::UploadLocal => {
                self.upload(remote, file, "upload of local version failed")
                    .await
            }
            SyncDecision::AdoptRemote => {
                self.download(remote, file, true, "initial download failed")
                    .await
            }
            SyncDecision::FollowRemote => {
                self.download(remote, file, false, "download of newer remote version failed")
                    .await
            }
            SyncDecision::InSync => {
                tracing::debug!(file = %file, "Timestamps within tolerance, assuming synced");
                self.pending.clear_pending(file)?;
                Ok(())
            }
            SyncDecision::Nothing => {
                tracing::debug!(file = %file, "Nothing on either side, nothing to sync");
                self.pending.clear_pending(file)?;
                Ok(())
            }
            SyncDecision::Conflict { local, remote: remote_ts } => {
                self.resolve_conflict(remote, file, local, remote_ts).await
            }
        }
    }

    async fn resolve_conflict(
        &self,
        remote: &dyn RemoteStore,
        file: &FileId,
        local_ts: DateTime<Utc>,
        remote_ts: DateTime<Utc>,
    ) -> Result<()> {
        tracing::info!(
            file = %file,
            local = %local_ts,
            remote = %remote_ts,
            "Conflict detected: remote is newer but local changes are pending"
        );

        let choice = self
            .prompt
            .resolve(local_ts, remote_ts, file)
            .await
            .map_err(|err| {
                SyncError::ConflictResolution(format!("conflict resolution for {file}: {err}"))
            })?;
        tracing::info!(file = %file, ?choice, "Conflict resolved by user");

        match choice {
            ConflictChoice::KeepLocal => {
                self.upload(remote, file, "upload after conflict (local kept) failed")
                    .await
            }
            ConflictChoice::KeepRemote => {
                self.download(remote, file, true, "download after conflict (remote kept) failed")
                    .await
            }
            ConflictChoice::Cancel => {
                // No I/O; the unresolved conflict stays pending for the next pass.
                tracing::info!(file = %file, "Conflict resolution cancelled, no sync action taken");
                Ok(())
            }
        }
    }

    async fn upload(&self, remote: &dyn RemoteStore, file: &FileId, context: &str) -> Result<()> {
        let content = self.local.content(file)?;
        remote
            .upload(file, &content)
            .await
            .map_err(|err| SyncError::Upload(format!("{context} for {file}: {err}")))?;

        self.timestamps.mark_synced(file)?;
        self.pending.clear_pending(file)?;
        tracing::info!(file = %file, "Local version uploaded");
        Ok(())
    }

    async fn download(
        &self,
        remote: &dyn RemoteStore,
        file: &FileId,
        clear_pending: bool,
        context: &str,
    ) -> Result<()> {
        let content = remote
            .download(file)
            .await
            .map_err(|err| SyncError::Download(format!("{context} for {file}: {err}")))?;

        self.local.save_content(file, &content)?;
        self.timestamps.mark_synced(file)?;
        if clear_pending {
            self.pending.clear_pending(file)?;
        }
        tracing::info!(file = %file, "Local storage overwritten with remote content");
        Ok(())
    }
}
