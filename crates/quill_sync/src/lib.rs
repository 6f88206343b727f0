//! # QuillPad Sync Core
//!
//! Timestamp-based synchronization of a single text file against a remote
//! cloud-storage backend, built for offline-capable editors.
//!
//! ## Architecture
//!
//! - **Coordinator**: one reconciliation pass per invocation; compares the
//!   local-modified instant against the remote server-modified instant and
//!   drives upload, download or user conflict resolution
//! - **Offline Support**: durable per-file pending-upload flags so a later
//!   reconnect knows a conflict check is warranted
//! - **Debounce**: local edits schedule a pass after a quiet period instead
//!   of one round trip per keystroke
//! - **Ports**: the remote API client, local storage, connectivity probe,
//!   conflict prompt and status sink are injected trait objects
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quill_sync::{SyncConfig, SyncCoordinator, TimestampStore, PendingUploadTracker};
//! # use quill_sync::ports::{LocalStore, RemoteStore, Connectivity, ConflictPrompt, StatusSink};
//! # async fn demo(
//! #     local: Arc<dyn LocalStore>,
//! #     remote: Arc<dyn RemoteStore>,
//! #     network: Arc<dyn Connectivity>,
//! #     prompt: Arc<dyn ConflictPrompt>,
//! #     sink: Arc<dyn StatusSink>,
//! # ) -> anyhow::Result<()> {
//! let config = SyncConfig::default();
//! let timestamps = Arc::new(TimestampStore::open(&config.state_dir)?);
//! let pending = Arc::new(PendingUploadTracker::open(&config.state_dir)?);
//!
//! let coordinator = SyncCoordinator::new(
//!     local, network, prompt, sink, timestamps, pending, &config,
//! );
//! coordinator.connect(remote);
//! coordinator.coordinate().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod offline;
pub mod ports;
pub mod status;
pub mod store;

pub use config::SyncConfig;
pub use coordinator::SyncCoordinator;
pub use debounce::{ChangeDebouncer, LocalChangeEvent};
pub use offline::PendingUploadTracker;
pub use ports::{
    ConflictChoice, ConflictPrompt, Connectivity, LocalStore, RemoteError, RemoteMetadata,
    RemoteStore, StatusSink,
};
pub use status::{StatusReport, SyncStatus};
pub use store::TimestampStore;

pub use quill_common::{FileId, StoreError};

/// Common result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur during sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No active file to sync")]
    NoActiveFile,

    #[error("Remote metadata fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Conflict resolution failed: {0}")]
    ConflictResolution(String),

    #[error("Store error: {0}")]
    Store(#[from] quill_common::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
