//! Consumed interfaces (ports) of the sync core
//!
//! The editor's local storage, the cloud backend client, the connectivity
//! probe, the conflict dialog and the status indicator all live outside this
//! crate. The coordinator only sees these traits, injected as `Arc<dyn _>`
//! trait objects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_common::{FileId, StoreError};
use thiserror::Error;

use crate::status::StatusReport;

/// Errors surfaced by the remote backend adapter
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote backend unavailable: {0}")]
    Unavailable(String),

    #[error("Remote API error: {0}")]
    Api(String),

    #[error("Remote returned no content for {0}")]
    MissingContent(FileId),
}

/// Metadata for a remote file, fetched fresh on every reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Whether the file exists on the remote side at all
    pub exists: bool,
    /// Server-side last-modified instant, when the file exists
    pub server_modified: Option<DateTime<Utc>>,
}

impl RemoteMetadata {
    /// Metadata for a file confirmed absent on the remote side
    pub fn absent() -> Self {
        Self {
            exists: false,
            server_modified: None,
        }
    }

    pub fn present(server_modified: DateTime<Utc>) -> Self {
        Self {
            exists: true,
            server_modified: Some(server_modified),
        }
    }
}

/// The user's three-way choice when both sides changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Upload the local copy, overwriting remote
    KeepLocal,
    /// Download the remote copy, overwriting local
    KeepRemote,
    /// Leave both sides untouched; the conflict stays pending
    Cancel,
}

/// Local content storage for the editor's files
///
/// Timestamps are not read through this trait; they live in the
/// [`crate::TimestampStore`]. Implementers of `save_content` are expected to
/// stamp the local-modified instant there. The local-edit notification is
/// NOT part of this contract: the coordinator itself writes through
/// `save_content` when adopting remote content, and those writes must not
/// loop back into the debouncer.
pub trait LocalStore: Send + Sync {
    /// Identity of the file the user is currently editing, if any
    fn active_file(&self) -> Option<FileId>;

    fn content(&self, file: &FileId) -> Result<String, StoreError>;

    /// Overwrite the locally stored content
    fn save_content(&self, file: &FileId, content: &str) -> Result<(), StoreError>;
}

/// The cloud-storage backend, reduced to the three calls the coordinator needs
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn metadata(&self, file: &FileId) -> Result<RemoteMetadata, RemoteError>;

    async fn download(&self, file: &FileId) -> Result<String, RemoteError>;

    async fn upload(&self, file: &FileId, content: &str) -> Result<(), RemoteError>;
}

/// Ambient network reachability probe
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// User-driven conflict resolution dialog
#[async_trait]
pub trait ConflictPrompt: Send + Sync {
    /// Present both candidate instants and await the user's choice
    async fn resolve(
        &self,
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
        file: &FileId,
    ) -> Result<ConflictChoice, RemoteError>;
}

/// Sink for status transitions shown in the UI
pub trait StatusSink: Send + Sync {
    fn report(&self, report: &StatusReport);
}
