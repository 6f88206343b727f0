//! Directory-backed remote store
//!
//! A plain directory stands in for the cloud backend: each synced file is a
//! file inside it, and its filesystem mtime is the server-modified instant.
//! Connectivity maps to the directory being reachable, so pointing
//! `remote_dir` at removable or network-mounted storage exercises the
//! offline paths for real.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quill_common::FileId;
use quill_sync::{Connectivity, RemoteError, RemoteMetadata, RemoteStore};

pub struct DirRemote {
    root: PathBuf,
}

impl DirRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, file: &FileId) -> PathBuf {
        self.root.join(sanitize(file.as_str()))
    }
}

#[async_trait]
impl RemoteStore for DirRemote {
    async fn metadata(&self, file: &FileId) -> Result<RemoteMetadata, RemoteError> {
        if !self.root.exists() {
            return Err(RemoteError::Unavailable(format!(
                "remote directory {} is unreachable",
                self.root.display()
            )));
        }

        match tokio::fs::metadata(self.path_for(file)).await {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .map_err(|err| RemoteError::Api(format!("no mtime for {file}: {err}")))?;
                Ok(RemoteMetadata::present(DateTime::<Utc>::from(modified)))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RemoteMetadata::absent()),
            Err(err) => Err(RemoteError::Api(format!("metadata for {file}: {err}"))),
        }
    }

    async fn download(&self, file: &FileId) -> Result<String, RemoteError> {
        match tokio::fs::read_to_string(self.path_for(file)).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RemoteError::MissingContent(file.clone()))
            }
            Err(err) => Err(RemoteError::Api(format!("download of {file}: {err}"))),
        }
    }

    async fn upload(&self, file: &FileId, content: &str) -> Result<(), RemoteError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| RemoteError::Unavailable(format!("{}: {err}", self.root.display())))?;
        tokio::fs::write(self.path_for(file), content)
            .await
            .map_err(|err| RemoteError::Api(format!("upload of {file}: {err}")))?;
        Ok(())
    }
}

/// Online means the remote directory's parent is reachable
pub struct DirConnectivity {
    root: PathBuf,
}

impl DirConnectivity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn probe(&self) -> &Path {
        self.root.parent().unwrap_or(&self.root)
    }
}

impl Connectivity for DirConnectivity {
    fn is_online(&self) -> bool {
        self.probe().exists()
    }
}

fn sanitize(name: &str) -> String {
    name.trim_start_matches('/').replace(['/', '\\'], "_")
}
