//! Offload of aged bundles to remote storage.

use cronkeep_core::{AppError, AppResult, FileEntry, UploadTask};
use cronkeep_storage::keys::remote_key;
use cronkeep_storage::{RemoteStorage, StorageError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one offload call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OffloadReport {
    /// Remote keys whose upload was confirmed.
    pub uploaded: Vec<String>,
    /// Local files removed after confirmation.
    pub deleted: Vec<PathBuf>,
}

/// Uploads local files into a remote destination folder.
#[derive(Clone)]
pub struct RemoteOffloader {
    root: PathBuf,
    storage: Arc<dyn RemoteStorage>,
}

impl RemoteOffloader {
    pub fn new(root: impl Into<PathBuf>, storage: Arc<dyn RemoteStorage>) -> Self {
        Self {
            root: root.into(),
            storage,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upload every entry to `{destination}/{file name}`, one at a time.
    ///
    /// A local file is only deleted when `delete_source` is set and the remote
    /// object was confirmed: the put succeeded and the remote size matches the
    /// bytes sent. The first failure stops the offload.
    #[tracing::instrument(skip(self, entries), fields(root = %self.root.display(), entries = entries.len()))]
    pub async fn upload(
        &self,
        entries: &[FileEntry],
        destination: &str,
        delete_source: bool,
    ) -> AppResult<OffloadReport> {
        let mut report = OffloadReport::default();

        for entry in entries {
            let task = UploadTask::new(entry.clone(), destination);
            let key = self.upload_one(&task).await?;

            tracing::info!(
                key = %key,
                size_bytes = task.entry.size_bytes,
                "Offload confirmed"
            );
            report.uploaded.push(key);

            if delete_source {
                let local = task.entry.path_in(&self.root);
                tokio::fs::remove_file(&local)
                    .await
                    .map_err(|e| AppError::io(&local, e))?;
                tracing::info!(path = %local.display(), "Deleted local copy after offload");
                report.deleted.push(local);
            }
        }

        Ok(report)
    }

    async fn upload_one(&self, task: &UploadTask) -> AppResult<String> {
        let file_name = task.entry.file_name_lossy().ok_or_else(|| {
            AppError::Transport(format!(
                "cannot derive a remote name for {}",
                task.entry.relative_path.display()
            ))
        })?;
        let key = remote_key(&task.destination, &file_name).map_err(transport_error)?;

        let local = task.entry.path_in(&self.root);
        let sent = self
            .storage
            .upload_file(&key, &local)
            .await
            .map_err(|e| match e {
                StorageError::IoError(source) => AppError::io(&local, source),
                other => transport_error(other),
            })?;

        let stored = self
            .storage
            .content_length(&key)
            .await
            .map_err(transport_error)?;
        if stored != sent {
            return Err(AppError::Transport(format!(
                "upload of {} not confirmed: sent {} bytes, remote reports {}",
                key, sent, stored
            )));
        }

        Ok(key)
    }
}

fn transport_error(err: StorageError) -> AppError {
    match err {
        StorageError::ConfigError(msg) => AppError::Config(msg),
        other => AppError::Transport(other.to_string()),
    }
}
