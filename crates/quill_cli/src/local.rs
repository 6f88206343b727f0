//! Workspace-backed local storage
//!
//! Content lives as plain files under `<state_dir>/content/`, one per known
//! file, with `/` in the file identity flattened to `_` for the on-disk name.
//! The set of known files and the active selection persist in
//! `<state_dir>/files.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use quill_common::{FileId, StoreError};
use quill_sync::{LocalStore, TimestampStore};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Registry {
    active: Option<FileId>,
    files: Vec<FileId>,
}

/// Local store over a state directory, shared by the CLI commands
pub struct WorkspaceLocal {
    content_dir: PathBuf,
    registry_path: PathBuf,
    registry: Mutex<Registry>,
    timestamps: Arc<TimestampStore>,
}

impl WorkspaceLocal {
    pub fn open(state_dir: &Path, timestamps: Arc<TimestampStore>) -> Result<Self> {
        let content_dir = state_dir.join("content");
        fs::create_dir_all(&content_dir)
            .with_context(|| format!("failed to create {}", content_dir.display()))?;

        let registry_path = state_dir.join("files.json");
        let registry = if registry_path.exists() {
            let raw = fs::read_to_string(&registry_path)
                .with_context(|| format!("failed to read {}", registry_path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid file registry {}", registry_path.display()))?
        } else {
            Registry::default()
        };

        Ok(Self {
            content_dir,
            registry_path,
            registry: Mutex::new(registry),
            timestamps,
        })
    }

    /// All known files, in registration order
    pub fn files(&self) -> Vec<FileId> {
        self.registry().files.clone()
    }

    /// Register a file. The first file registered becomes active.
    pub fn add(&self, file: &FileId) -> Result<()> {
        let mut registry = self.registry();
        if registry.files.contains(file) {
            return Ok(());
        }
        registry.files.push(file.clone());
        if registry.active.is_none() {
            registry.active = Some(file.clone());
        }
        self.persist(&registry)
    }

    pub fn set_active(&self, file: &FileId) -> Result<()> {
        let mut registry = self.registry();
        if !registry.files.contains(file) {
            bail!("unknown file: {file}");
        }
        registry.active = Some(file.clone());
        self.persist(&registry)
    }

    /// Forget a file and delete its stored content
    pub fn remove(&self, file: &FileId) -> Result<()> {
        let mut registry = self.registry();
        registry.files.retain(|f| f != file);
        if registry.active.as_ref() == Some(file) {
            registry.active = registry.files.first().cloned();
        }
        self.persist(&registry)?;

        let path = self.content_path(file);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to delete {}", path.display()))?;
        }
        Ok(())
    }

    /// Rename a file in the registry and move its stored content
    pub fn rename(&self, old: &FileId, new: &FileId) -> Result<()> {
        let mut registry = self.registry();
        if !registry.files.contains(old) {
            bail!("unknown file: {old}");
        }
        if registry.files.contains(new) {
            bail!("file already exists: {new}");
        }
        for entry in &mut registry.files {
            if entry == old {
                *entry = new.clone();
            }
        }
        if registry.active.as_ref() == Some(old) {
            registry.active = Some(new.clone());
        }
        self.persist(&registry)?;

        let old_path = self.content_path(old);
        if old_path.exists() {
            let new_path = self.content_path(new);
            fs::rename(&old_path, &new_path).with_context(|| {
                format!(
                    "failed to move {} to {}",
                    old_path.display(),
                    new_path.display()
                )
            })?;
        }
        Ok(())
    }

    /// On-disk path for a file's content, matching notify events back
    /// to file identities in watch mode
    pub fn content_path(&self, file: &FileId) -> PathBuf {
        self.content_dir.join(sanitize(file.as_str()))
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Map a content-directory path back to the file it stores
    pub fn file_for_path(&self, path: &Path) -> Option<FileId> {
        let name = path.file_name()?.to_str()?;
        self.registry()
            .files
            .iter()
            .find(|file| sanitize(file.as_str()) == name)
            .cloned()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().expect("file registry lock poisoned")
    }

    fn persist(&self, registry: &Registry) -> Result<()> {
        let raw = serde_json::to_string_pretty(registry).context("failed to encode registry")?;
        fs::write(&self.registry_path, raw)
            .with_context(|| format!("failed to write {}", self.registry_path.display()))?;
        Ok(())
    }
}

impl LocalStore for WorkspaceLocal {
    fn active_file(&self) -> Option<FileId> {
        let registry = self.registry();
        registry
            .active
            .clone()
            .or_else(|| registry.files.first().cloned())
    }

    fn content(&self, file: &FileId) -> Result<String, StoreError> {
        let path = self.content_path(file);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::MissingContent(file.clone()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save_content(&self, file: &FileId, content: &str) -> Result<(), StoreError> {
        fs::write(self.content_path(file), content)?;
        self.timestamps.set_local_modified(file, Utc::now())?;
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.trim_start_matches('/')
        .replace(['/', '\\'], "_")
}
