//! End-to-end reconciliation scenarios against in-memory ports

use std::sync::Arc;

use assert_fs::TempDir;
use chrono::{DateTime, Duration, TimeZone, Utc};

use quill_sync::ports::{ConflictChoice, RemoteError, RemoteStore};
use quill_sync::{
    FileId, PendingUploadTracker, RemoteMetadata, SyncConfig, SyncCoordinator, SyncStatus,
    TimestampStore,
};
use quill_test_helpers::prelude::*;

const NOTE: &str = "/notes/todo.txt";

struct Harness {
    local: Arc<MemoryLocal>,
    remote: Arc<MemoryRemote>,
    network: Arc<FixedConnectivity>,
    prompt: Arc<ScriptedPrompt>,
    sink: Arc<RecordingSink>,
    timestamps: Arc<TimestampStore>,
    pending: Arc<PendingUploadTracker>,
    coordinator: Arc<SyncCoordinator>,
    _state: TempDir,
}

impl Harness {
    fn file(&self) -> FileId {
        FileId::from(NOTE)
    }
}

fn harness(prompt: ScriptedPrompt) -> Harness {
    suppress_logs();

    let state = temp_state_dir();
    let config = SyncConfig {
        state_dir: state.path().to_path_buf(),
        ..Default::default()
    };

    let local = Arc::new(MemoryLocal::with_active(NOTE));
    let remote = Arc::new(MemoryRemote::default());
    let network = Arc::new(FixedConnectivity::online());
    let prompt = Arc::new(prompt);
    let sink = Arc::new(RecordingSink::default());
    let timestamps = Arc::new(TimestampStore::open(state.path()).unwrap());
    let pending = Arc::new(PendingUploadTracker::open(state.path()).unwrap());

    let coordinator = Arc::new(SyncCoordinator::new(
        local.clone(),
        network.clone(),
        prompt.clone(),
        sink.clone(),
        timestamps.clone(),
        pending.clone(),
        &config,
    ));
    coordinator.connect(remote.clone());

    Harness {
        local,
        remote,
        network,
        prompt,
        sink,
        timestamps,
        pending,
        coordinator,
        _state: state,
    }
}

fn scenario_local_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

fn scenario_remote_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 5).unwrap()
}

// P5: remote absent, local timestamp present -> first-sync upload
#[tokio::test]
async fn first_sync_uploads_local_version() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "hello from quill");
    h.timestamps.set_local_modified(&file, Utc::now()).unwrap();
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.remote.upload_calls(), 1);
    assert_eq!(h.remote.download_calls(), 0);
    assert_eq!(h.remote.content_of(&file).as_deref(), Some("hello from quill"));
    assert!(h.timestamps.last_sync(&file).is_some());
    assert!(!h.pending.is_pending(&file));
    assert_eq!(
        h.sink.statuses(),
        vec![SyncStatus::Syncing, SyncStatus::Idle]
    );
}

// P5: remote absent AND local timestamp absent -> true no-op
#[tokio::test]
async fn nothing_on_either_side_is_a_clean_noop() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.remote.transfers(), 0);
    assert!(!h.pending.is_pending(&file));
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
    assert!(h.timestamps.last_sync(&file).is_none());
}

// P6: remote present, local timestamp absent -> unconditional download
#[tokio::test]
async fn first_sync_download_overwrites_stale_local_content() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "stale leftover draft");
    h.remote.put(file.as_str(), "remote wins", Utc::now());
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.remote.download_calls(), 1);
    assert_eq!(h.remote.upload_calls(), 0);
    assert_eq!(h.local.saves(), 1);
    assert_eq!(h.local.content_of(&file).as_deref(), Some("remote wins"));
    assert!(h.timestamps.last_sync(&file).is_some());
    assert!(!h.pending.is_pending(&file));
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

// P1: a second pass with no intervening edits performs no transfers
#[tokio::test]
async fn coordinate_is_idempotent() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "latest draft");
    h.timestamps.set_local_modified(&file, Utc::now()).unwrap();
    h.remote
        .put(file.as_str(), "old draft", Utc::now() - Duration::seconds(30));

    h.coordinator.coordinate().await;
    assert_eq!(h.remote.upload_calls(), 1);

    let local_modified = h.timestamps.local_modified(&file);
    let last_sync = h.timestamps.last_sync(&file);

    // Second pass: upload stamped the remote right next to the local instant,
    // so it lands in the tolerance-band no-op case.
    h.coordinator.coordinate().await;

    assert_eq!(h.remote.transfers(), 1);
    assert_eq!(h.timestamps.local_modified(&file), local_modified);
    assert_eq!(h.timestamps.last_sync(&file), last_sync);
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

// P3: local strictly newer beyond the band -> upload wins, no conflict
#[tokio::test]
async fn newer_local_uploads_without_consulting_the_user() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "current local content");
    h.timestamps.set_local_modified(&file, Utc::now()).unwrap();
    h.remote
        .put(file.as_str(), "outdated", Utc::now() - Duration::seconds(10));
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.prompt.calls(), 0);
    assert_eq!(h.remote.upload_calls(), 1);
    assert_eq!(
        h.remote.content_of(&file).as_deref(),
        Some("current local content")
    );
    assert!(h.timestamps.last_sync(&file).is_some());
    assert!(!h.pending.is_pending(&file));
}

// Scenario from the test plan: remote newer by 5s, pending false
// -> simple update, never a conflict dialog
#[tokio::test]
async fn newer_remote_without_pending_edits_downloads_silently() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "local copy");
    h.timestamps
        .set_local_modified(&file, scenario_local_instant())
        .unwrap();
    h.remote
        .put(file.as_str(), "remote copy", scenario_remote_instant());

    h.coordinator.coordinate().await;

    assert_eq!(h.prompt.calls(), 0);
    assert_eq!(h.remote.download_calls(), 1);
    assert_eq!(h.remote.upload_calls(), 0);
    assert_eq!(h.local.content_of(&file).as_deref(), Some("remote copy"));
    assert!(h.timestamps.last_sync(&file).is_some());
    assert!(!h.pending.is_pending(&file));
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

// Scenario from the test plan: same instants, pending true, user keeps local
#[tokio::test]
async fn conflict_resolved_for_local_uploads_and_clears_pending() {
    let h = harness(ScriptedPrompt::answering(ConflictChoice::KeepLocal));
    let file = h.file();

    h.local.insert_content(file.clone(), "my unsynced edits");
    h.timestamps
        .set_local_modified(&file, scenario_local_instant())
        .unwrap();
    h.remote
        .put(file.as_str(), "their version", scenario_remote_instant());
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.prompt.calls(), 1);
    assert_eq!(
        h.prompt.last_instants(),
        Some((scenario_local_instant(), scenario_remote_instant()))
    );
    assert_eq!(h.remote.upload_calls(), 1);
    assert_eq!(h.remote.download_calls(), 0);
    assert_eq!(
        h.remote.content_of(&file).as_deref(),
        Some("my unsynced edits")
    );
    assert!(!h.pending.is_pending(&file));
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

#[tokio::test]
async fn conflict_resolved_for_remote_downloads_and_clears_pending() {
    let h = harness(ScriptedPrompt::answering(ConflictChoice::KeepRemote));
    let file = h.file();

    h.local.insert_content(file.clone(), "my unsynced edits");
    h.timestamps
        .set_local_modified(&file, scenario_local_instant())
        .unwrap();
    h.remote
        .put(file.as_str(), "their version", scenario_remote_instant());
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.prompt.calls(), 1);
    assert_eq!(h.remote.download_calls(), 1);
    assert_eq!(h.remote.upload_calls(), 0);
    assert_eq!(h.local.content_of(&file).as_deref(), Some("their version"));
    assert!(!h.pending.is_pending(&file));
}

// P4: cancel leaves the pending flag set and performs no transfer I/O
#[tokio::test]
async fn cancelled_conflict_keeps_pending_and_does_no_io() {
    let h = harness(ScriptedPrompt::answering(ConflictChoice::Cancel));
    let file = h.file();

    h.local.insert_content(file.clone(), "my unsynced edits");
    h.timestamps
        .set_local_modified(&file, scenario_local_instant())
        .unwrap();
    h.remote
        .put(file.as_str(), "their version", scenario_remote_instant());
    h.pending.mark_pending(&file).unwrap();

    h.coordinator.coordinate().await;

    assert_eq!(h.prompt.calls(), 1);
    assert_eq!(h.remote.transfers(), 0);
    assert!(h.pending.is_pending(&file));
    assert!(h.timestamps.last_sync(&file).is_none());
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

#[tokio::test]
async fn missing_active_file_reports_error() {
    let h = harness(ScriptedPrompt::unreachable());
    h.local.set_active(None);

    h.coordinator.coordinate().await;

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, SyncStatus::Error);
    assert!(reports[0].message.contains("No active file"));
    assert_eq!(h.remote.metadata_calls(), 0);
}

#[tokio::test]
async fn missing_connection_aborts_silently() {
    let h = harness(ScriptedPrompt::unreachable());
    h.coordinator.disconnect();

    h.coordinator.coordinate().await;

    assert!(h.sink.reports().is_empty());
    assert_eq!(h.remote.metadata_calls(), 0);
}

#[tokio::test]
async fn offline_reports_offline_and_skips_io() {
    let h = harness(ScriptedPrompt::unreachable());
    h.network.set_online(false);

    h.coordinator.coordinate().await;

    assert_eq!(h.sink.statuses(), vec![SyncStatus::Offline]);
    assert_eq!(h.remote.metadata_calls(), 0);
}

#[tokio::test]
async fn upload_failure_leaves_state_untouched_and_reports_error() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "draft");
    h.timestamps.set_local_modified(&file, Utc::now()).unwrap();
    h.pending.mark_pending(&file).unwrap();
    h.remote.fail_upload(true);

    h.coordinator.coordinate().await;

    assert_eq!(h.sink.last_status(), Some(SyncStatus::Error));
    let reports = h.sink.reports();
    assert!(reports.last().unwrap().message.contains("Upload failed"));
    // No partial updates on failure
    assert!(h.timestamps.last_sync(&file).is_none());
    assert!(h.pending.is_pending(&file));
}

#[tokio::test]
async fn download_failure_leaves_local_content_untouched() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "precious local bytes");
    h.remote.put(file.as_str(), "remote", Utc::now());
    h.remote.fail_download(true);

    h.coordinator.coordinate().await;

    assert_eq!(h.sink.last_status(), Some(SyncStatus::Error));
    assert_eq!(
        h.local.content_of(&file).as_deref(),
        Some("precious local bytes")
    );
    assert_eq!(h.local.saves(), 0);
    assert!(h.timestamps.last_sync(&file).is_none());
}

// Baseline behavior: a failed metadata fetch is handled like "remote absent",
// so a locally edited file still gets uploaded.
#[tokio::test]
async fn metadata_failure_falls_back_to_remote_absent_branch() {
    let h = harness(ScriptedPrompt::unreachable());
    let file = h.file();

    h.local.insert_content(file.clone(), "draft");
    h.timestamps.set_local_modified(&file, Utc::now()).unwrap();
    h.remote.put(file.as_str(), "invisible", Utc::now());
    h.remote.fail_metadata(true);

    h.coordinator.coordinate().await;

    assert_eq!(h.remote.upload_calls(), 1);
    assert_eq!(h.remote.download_calls(), 0);
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

#[tokio::test]
async fn metadata_failure_with_no_local_history_is_a_noop() {
    let h = harness(ScriptedPrompt::unreachable());

    h.remote.fail_metadata(true);

    h.coordinator.coordinate().await;

    assert_eq!(h.remote.transfers(), 0);
    assert_eq!(h.sink.last_status(), Some(SyncStatus::Idle));
}

/// Remote fake that drops the coordinator's connection while serving the
/// download, so the pass ends with the backend already detached.
struct DisconnectingRemote {
    inner: MemoryRemote,
    coordinator: std::sync::OnceLock<Arc<SyncCoordinator>>,
}

#[async_trait::async_trait]
impl RemoteStore for DisconnectingRemote {
    async fn metadata(&self, file: &FileId) -> Result<RemoteMetadata, RemoteError> {
        self.inner.metadata(file).await
    }

    async fn download(&self, file: &FileId) -> Result<String, RemoteError> {
        if let Some(coordinator) = self.coordinator.get() {
            coordinator.disconnect();
        }
        self.inner.download(file).await
    }

    async fn upload(&self, file: &FileId, content: &str) -> Result<(), RemoteError> {
        self.inner.upload(file, content).await
    }
}

#[tokio::test]
async fn disconnect_during_pass_reports_not_connected_at_exit() {
    suppress_logs();

    let state = temp_state_dir();
    let config = SyncConfig {
        state_dir: state.path().to_path_buf(),
        ..Default::default()
    };

    let local = Arc::new(MemoryLocal::with_active(NOTE));
    let network = Arc::new(FixedConnectivity::online());
    let prompt = Arc::new(ScriptedPrompt::unreachable());
    let sink = Arc::new(RecordingSink::default());
    let timestamps = Arc::new(TimestampStore::open(state.path()).unwrap());
    let pending = Arc::new(PendingUploadTracker::open(state.path()).unwrap());

    let remote = Arc::new(DisconnectingRemote {
        inner: MemoryRemote::default(),
        coordinator: std::sync::OnceLock::new(),
    });
    remote.inner.put(NOTE, "remote copy", Utc::now());

    let coordinator = Arc::new(SyncCoordinator::new(
        local,
        network,
        prompt,
        sink.clone(),
        timestamps,
        pending,
        &config,
    ));
    coordinator.connect(remote.clone());
    remote.coordinator.set(coordinator.clone()).ok().unwrap();

    coordinator.coordinate().await;

    assert_eq!(
        sink.statuses(),
        vec![SyncStatus::Syncing, SyncStatus::NotConnected]
    );
}
