//! Change-debounce trigger
//!
//! Local-edit notifications arrive on an mpsc channel. Each edit of the
//! active file resets a single owned deadline; only the most recent edit
//! within the quiet window triggers one coordinator pass, earlier scheduled
//! passes are superseded without ever running. An edit that arrives while
//! offline immediately marks the pending-upload flag so a later reconnect
//! knows a conflict check is warranted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;

use quill_common::FileId;

use crate::config::SyncConfig;
use crate::coordinator::SyncCoordinator;
use crate::offline::PendingUploadTracker;
use crate::ports::{Connectivity, LocalStore};

/// Notification emitted by local storage after a content save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChangeEvent {
    pub file: FileId,
    pub timestamp: DateTime<Utc>,
}

impl LocalChangeEvent {
    pub fn now(file: FileId) -> Self {
        Self {
            file,
            timestamp: Utc::now(),
        }
    }
}

/// Listens for local edits and schedules debounced coordinator passes
pub struct ChangeDebouncer {
    coordinator: Arc<SyncCoordinator>,
    local: Arc<dyn LocalStore>,
    network: Arc<dyn Connectivity>,
    pending: Arc<PendingUploadTracker>,
    delay: Duration,
    rx: mpsc::UnboundedReceiver<LocalChangeEvent>,
}

impl ChangeDebouncer {
    /// Build the debouncer and the sender half of its notification channel
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        local: Arc<dyn LocalStore>,
        network: Arc<dyn Connectivity>,
        pending: Arc<PendingUploadTracker>,
        config: &SyncConfig,
    ) -> (mpsc::UnboundedSender<LocalChangeEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            coordinator,
            local,
            network,
            pending,
            delay: config.debounce_delay,
            rx,
        };
        (tx, debouncer)
    }

    /// Event loop; runs until the notification channel closes
    pub async fn run(mut self) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if self.note_edit(&event) {
                                deadline = Some(Instant::now() + self.delay);
                            }
                        }
                        None => {
                            tracing::debug!("Change channel closed, stopping debouncer");
                            break;
                        }
                    }
                }
                () = wait_for(deadline) => {
                    deadline = None;
                    tracing::debug!("Debounce window elapsed, triggering sync pass");
                    self.coordinator.coordinate().await;
                }
            }
        }
    }

    /// Record one edit; returns whether the debounce deadline should reset
    fn note_edit(&self, event: &LocalChangeEvent) -> bool {
        let active = self.local.active_file();
        if active.as_ref() != Some(&event.file) {
            tracing::debug!(file = %event.file, "Local change ignored for non-active file");
            return false;
        }

        if !self.network.is_online() {
            tracing::warn!(
                file = %event.file,
                "Offline: setting upload pending flag due to local change"
            );
            if let Err(err) = self.pending.mark_pending(&event.file) {
                tracing::error!(file = %event.file, error = %err, "Failed to persist pending flag");
            }
        }

        tracing::debug!(
            file = %event.file,
            at = %event.timestamp,
            delay_ms = self.delay.as_millis() as u64,
            "Local change for active file, debouncing sync"
        );
        true
    }
}

/// Sleep until `deadline`, or forever when no deadline is armed
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
