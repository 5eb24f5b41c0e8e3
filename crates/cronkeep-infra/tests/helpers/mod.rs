//! Shared fixtures for infra integration tests.
//!
//! Run from workspace root: `cargo test -p cronkeep-infra`.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use cronkeep_core::{FileEntry, TimestampSource};
use cronkeep_infra::FileCatalog;
use cronkeep_storage::{RemoteBackend, RemoteStorage, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const DAY: Duration = Duration::from_secs(86_400);

/// A temporary watched folder whose file ages are set through mtime.
pub struct WatchedFolder {
    pub dir: TempDir,
}

impl WatchedFolder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `name` and backdate its mtime by `days`.
    pub fn write_aged(&self, name: &str, contents: &[u8], days: u64) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(SystemTime::now() - DAY * days as u32))
            .expect("Failed to backdate fixture");
        path
    }

    pub fn catalog(&self) -> FileCatalog {
        FileCatalog::new(self.path(), TimestampSource::Modified)
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        self.catalog().list("").expect("Failed to list fixture folder")
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path())
            .expect("Failed to read fixture folder")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// In-process remote that can be told to fail or to lose bytes for
/// specific keys.
#[derive(Default)]
pub struct MockRemote {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_keys: HashSet<String>,
    truncate_keys: HashSet<String>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    pub fn truncating(mut self, key: &str) -> Self {
        self.truncate_keys.insert(key.to_string());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl RemoteStorage for MockRemote {
    async fn upload(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.fail_keys.contains(key) {
            return Err(StorageError::UploadFailed(format!("refused {}", key)));
        }
        let stored = if self.truncate_keys.contains(key) && !data.is_empty() {
            data.slice(..data.len() - 1)
        } else {
            data
        };
        self.objects.lock().unwrap().insert(key.to_string(), stored);
        Ok(())
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|b| b.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn backend_type(&self) -> RemoteBackend {
        RemoteBackend::Memory
    }
}
