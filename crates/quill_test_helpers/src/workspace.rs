//! State-directory setup utilities for tests
//!
//! Provides functions to create temporary directories shaped like a QuillPad
//! state dir for integration testing.

use assert_fs::TempDir;
use std::fs;

/// Create a temporary directory usable as a sync state dir
///
/// The directory will be automatically cleaned up when the `TempDir` is dropped.
///
/// # Example
///
/// ```rust
/// use quill_test_helpers::workspace::temp_state_dir;
///
/// let state = temp_state_dir();
/// // Pass state.path() as the state_dir of the stores under test
/// ```
pub fn temp_state_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a temp directory containing a `quill.toml` with the given contents
///
/// # Example
///
/// ```rust
/// use quill_test_helpers::workspace::state_dir_with_config;
///
/// let state = state_dir_with_config("debounce_delay_ms = 100\ntolerance_ms = 2000\nstate_dir = \".\"\n");
/// assert!(state.path().join("quill.toml").exists());
/// ```
pub fn state_dir_with_config(config_toml: &str) -> TempDir {
    let temp = temp_state_dir();
    fs::write(temp.path().join("quill.toml"), config_toml).expect("Failed to write quill.toml");
    temp
}
