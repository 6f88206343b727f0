//! Common types for QuillPad
//!
//! This crate provides the shared data structures used across all QuillPad
//! components: the file identity type, shared error cases, and telemetry
//! initialization.

pub mod telemetry;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque path-like identity of a logical file.
///
/// The same identity on the local and remote side names the same logical
/// document. Treated as an opaque string everywhere; only the storage
/// adapters know how to map it onto real paths or keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors shared by QuillPad's storage-facing components
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No content stored for file: {0}")]
    MissingContent(FileId),

    #[error("State directory not initialized: {0}")]
    UninitializedState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Exit codes (sysexits-inspired)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_CONFIG_ERROR: i32 = 101;
