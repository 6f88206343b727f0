//! In-memory implementations of the sync core's ports
//!
//! Every fake is scriptable (content, timestamps, failure switches) and
//! records its calls so scenario tests can assert exactly which I/O a
//! reconciliation pass performed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quill_sync::ports::{
    ConflictChoice, ConflictPrompt, Connectivity, LocalStore, RemoteError, RemoteMetadata,
    RemoteStore, StatusSink,
};
use quill_sync::{FileId, StatusReport, StoreError, SyncStatus};

/// In-memory [`LocalStore`] with a scriptable active file
#[derive(Default)]
pub struct MemoryLocal {
    active: Mutex<Option<FileId>>,
    contents: Mutex<HashMap<FileId, String>>,
    saves: AtomicUsize,
}

impl MemoryLocal {
    pub fn with_active(file: impl Into<FileId>) -> Self {
        let local = Self::default();
        local.set_active(Some(file.into()));
        local
    }

    pub fn set_active(&self, file: Option<FileId>) {
        *self.active.lock().unwrap() = file;
    }

    pub fn insert_content(&self, file: impl Into<FileId>, content: impl Into<String>) {
        self.contents
            .lock()
            .unwrap()
            .insert(file.into(), content.into());
    }

    pub fn content_of(&self, file: &FileId) -> Option<String> {
        self.contents.lock().unwrap().get(file).cloned()
    }

    /// Number of `save_content` calls observed
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LocalStore for MemoryLocal {
    fn active_file(&self) -> Option<FileId> {
        self.active.lock().unwrap().clone()
    }

    fn content(&self, file: &FileId) -> Result<String, StoreError> {
        self.contents
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| StoreError::MissingContent(file.clone()))
    }

    fn save_content(&self, file: &FileId, content: &str) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.contents
            .lock()
            .unwrap()
            .insert(file.clone(), content.to_string());
        Ok(())
    }
}

/// In-memory [`RemoteStore`] with per-operation failure switches and counters
#[derive(Default)]
pub struct MemoryRemote {
    files: Mutex<HashMap<FileId, (String, DateTime<Utc>)>>,
    fail_metadata: AtomicBool,
    fail_download: AtomicBool,
    fail_upload: AtomicBool,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
}

impl MemoryRemote {
    /// Script a remote file with the given content and server-modified instant
    pub fn put(&self, file: impl Into<FileId>, content: impl Into<String>, modified: DateTime<Utc>) {
        self.files
            .lock()
            .unwrap()
            .insert(file.into(), (content.into(), modified));
    }

    pub fn content_of(&self, file: &FileId) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(file)
            .map(|(content, _)| content.clone())
    }

    pub fn fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Total transfer (upload + download) calls observed
    pub fn transfers(&self) -> usize {
        self.download_calls() + self.upload_calls()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn metadata(&self, file: &FileId) -> Result<RemoteMetadata, RemoteError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("scripted metadata failure".to_string()));
        }

        Ok(match self.files.lock().unwrap().get(file) {
            Some((_, modified)) => RemoteMetadata::present(*modified),
            None => RemoteMetadata::absent(),
        })
    }

    async fn download(&self, file: &FileId) -> Result<String, RemoteError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("scripted download failure".to_string()));
        }

        self.files
            .lock()
            .unwrap()
            .get(file)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| RemoteError::MissingContent(file.clone()))
    }

    async fn upload(&self, file: &FileId, content: &str) -> Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("scripted upload failure".to_string()));
        }

        self.files
            .lock()
            .unwrap()
            .insert(file.clone(), (content.to_string(), Utc::now()));
        Ok(())
    }
}

/// [`Connectivity`] probe with a settable answer
pub struct FixedConnectivity {
    online: AtomicBool,
}

impl FixedConnectivity {
    pub fn online() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: AtomicBool::new(false),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for FixedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// [`ConflictPrompt`] returning a pre-programmed choice
pub struct ScriptedPrompt {
    choice: Mutex<ConflictChoice>,
    fail: AtomicBool,
    calls: AtomicUsize,
    last_instants: Mutex<Option<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl ScriptedPrompt {
    pub fn answering(choice: ConflictChoice) -> Self {
        Self {
            choice: Mutex::new(choice),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_instants: Mutex::new(None),
        }
    }

    /// A prompt that must never be consulted; fails the pass if it is
    pub fn unreachable() -> Self {
        let prompt = Self::answering(ConflictChoice::Cancel);
        prompt.fail.store(true, Ordering::SeqCst);
        prompt
    }

    pub fn set_choice(&self, choice: ConflictChoice) {
        *self.choice.lock().unwrap() = choice;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Instants shown to the user on the most recent invocation
    pub fn last_instants(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        *self.last_instants.lock().unwrap()
    }
}

#[async_trait]
impl ConflictPrompt for ScriptedPrompt {
    async fn resolve(
        &self,
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
        _file: &FileId,
    ) -> Result<ConflictChoice, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_instants.lock().unwrap() = Some((local, remote));
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("scripted prompt failure".to_string()));
        }
        Ok(*self.choice.lock().unwrap())
    }
}

/// [`StatusSink`] capturing every report for later assertions
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<StatusReport>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<SyncStatus> {
        self.reports.lock().unwrap().last().map(|r| r.status)
    }

    /// Statuses in emission order
    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.reports.lock().unwrap().iter().map(|r| r.status).collect()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, report: &StatusReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
