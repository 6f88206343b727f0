//! CLI command builders for tests
//!
//! Provides pre-configured command builders with clean environments
//! to prevent log pollution and ensure consistent test execution.

use assert_cmd::Command;

/// Get a Command for the `quill` binary with clean environment
///
/// This command is pre-configured with:
/// - `RUST_LOG=error` to suppress INFO/DEBUG logs in tests
/// - Clean environment to avoid interference from user settings
///
/// # Example
///
/// ```rust,no_run
/// use quill_test_helpers::cli::quill_command;
///
/// let output = quill_command()
///     .arg("--version")
///     .assert()
///     .success();
/// ```
pub fn quill_command() -> Command {
    let mut cmd = Command::cargo_bin("quill").expect("Failed to find quill binary");
    cmd.env("RUST_LOG", "error");
    cmd.env_remove("QUILL_CONFIG"); // Don't use user's config
    cmd
}
