//! Pending-upload tracker
//!
//! A durable boolean per file: set when a local edit fires while the network
//! is unreachable, cleared on any confirmed upload, on a download that
//! overwrites local, or on an explicit no-op resolution. The coordinator
//! reads it to tell "remote moved on uneventfully" apart from "unsynced
//! local edits AND remote moved on".

use quill_common::{FileId, StoreError};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

const PENDING_FILE: &str = "pending.json";

/// Durable set of files with edits not yet confirmed uploaded
pub struct PendingUploadTracker {
    path: PathBuf,
    pending: Mutex<BTreeSet<FileId>>,
}

impl PendingUploadTracker {
    /// Open (or create) the tracker under `state_dir`
    pub fn open(state_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_dir = state_dir.into();
        fs::create_dir_all(&state_dir)?;
        let path = state_dir.join(PENDING_FILE);

        let pending = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path,
            pending: Mutex::new(pending),
        })
    }

    pub fn is_pending(&self, file: &FileId) -> bool {
        self.pending
            .lock()
            .expect("pending tracker lock poisoned")
            .contains(file)
    }

    /// Flag `file` as having an unconfirmed offline edit
    pub fn mark_pending(&self, file: &FileId) -> Result<(), StoreError> {
        let snapshot = {
            let mut pending = self.pending.lock().expect("pending tracker lock poisoned");
            if !pending.insert(file.clone()) {
                return Ok(()); // already flagged, nothing to persist
            }
            pending.clone()
        };
        tracing::debug!(file = %file, "Upload pending flag set");
        self.persist(&snapshot)
    }

    pub fn clear_pending(&self, file: &FileId) -> Result<(), StoreError> {
        let snapshot = {
            let mut pending = self.pending.lock().expect("pending tracker lock poisoned");
            if !pending.remove(file) {
                return Ok(());
            }
            pending.clone()
        };
        tracing::debug!(file = %file, "Upload pending flag cleared");
        self.persist(&snapshot)
    }

    /// Carry the pending flag over from `old` to `new` (file-rename lifecycle)
    pub fn rename(&self, old: &FileId, new: &FileId) -> Result<(), StoreError> {
        let snapshot = {
            let mut pending = self.pending.lock().expect("pending tracker lock poisoned");
            if !pending.remove(old) {
                return Ok(());
            }
            pending.insert(new.clone());
            pending.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, pending: &BTreeSet<FileId>) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(pending)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn flags_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let file = FileId::from("/notes/todo.txt");

        {
            let tracker = PendingUploadTracker::open(temp.path()).unwrap();
            tracker.mark_pending(&file).unwrap();
            assert!(tracker.is_pending(&file));
        }

        let tracker = PendingUploadTracker::open(temp.path()).unwrap();
        assert!(tracker.is_pending(&file));
    }

    #[test]
    fn clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let tracker = PendingUploadTracker::open(temp.path()).unwrap();
        let file = FileId::from("/notes/todo.txt");

        assert!(!tracker.is_pending(&file));
        tracker.clear_pending(&file).unwrap();
        assert!(!tracker.is_pending(&file));

        tracker.mark_pending(&file).unwrap();
        tracker.mark_pending(&file).unwrap();
        tracker.clear_pending(&file).unwrap();
        assert!(!tracker.is_pending(&file));
    }

    #[test]
    fn rename_carries_the_flag() {
        let temp = TempDir::new().unwrap();
        let tracker = PendingUploadTracker::open(temp.path()).unwrap();
        let old = FileId::from("/notes/old.txt");
        let new = FileId::from("/notes/new.txt");

        tracker.mark_pending(&old).unwrap();
        tracker.rename(&old, &new).unwrap();

        assert!(!tracker.is_pending(&old));
        assert!(tracker.is_pending(&new));

        // Renaming an unflagged file is a no-op
        tracker.rename(&FileId::from("/x"), &FileId::from("/y")).unwrap();
        assert!(!tracker.is_pending(&FileId::from("/y")));
    }

    #[test]
    fn flags_are_per_file() {
        let temp = TempDir::new().unwrap();
        let tracker = PendingUploadTracker::open(temp.path()).unwrap();

        let a = FileId::from("/a.txt");
        let b = FileId::from("/b.txt");
        tracker.mark_pending(&a).unwrap();

        assert!(tracker.is_pending(&a));
        assert!(!tracker.is_pending(&b));
    }
}
