//! Shared test utilities for QuillPad test suites
//!
//! This crate provides common testing utilities to eliminate code duplication
//! across test suites and ensure consistent test environments.
//!
//! # Modules
//!
//! - [`workspace`]: Temporary state-directory setup
//! - [`cli`]: Command builders with pre-configured environments
//! - [`logging`]: Test logging configuration
//! - [`fakes`]: In-memory implementations of the sync core's ports
//!
//! # Example
//!
//! ```rust
//! use quill_test_helpers::prelude::*;
//!
//! suppress_logs();
//! let state_dir = temp_state_dir();
//! let remote = MemoryRemote::default();
//! // Wire state_dir + remote + the other fakes into the coordinator under test
//! assert!(state_dir.path().exists());
//! assert_eq!(remote.transfers(), 0);
//! ```

pub mod cli;
pub mod fakes;
pub mod logging;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cli::quill_command;
    pub use crate::fakes::{
        FixedConnectivity, MemoryLocal, MemoryRemote, RecordingSink, ScriptedPrompt,
    };
    pub use crate::logging::{init_test_logging, suppress_logs};
    pub use crate::workspace::{state_dir_with_config, temp_state_dir};
}
