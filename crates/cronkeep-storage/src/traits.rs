//! Storage abstraction trait
//!
//! This module defines the trait every remote backend implements.

use crate::RemoteBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Remote storage abstraction
///
/// The offloader only needs to write an object and then read back its size to
/// confirm the write landed.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn upload(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Upload the file at `path` under `key` and return the bytes sent.
    ///
    /// The default reads the whole file into memory; backends that can
    /// stream should override it.
    async fn upload_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
        let data = tokio::fs::read(path).await?;
        let sent = data.len() as u64;
        self.upload(key, Bytes::from(data)).await?;
        Ok(sent)
    }

    /// Size in bytes of the object at `key`.
    async fn content_length(&self, key: &str) -> StorageResult<u64>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.content_length(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the storage backend type
    fn backend_type(&self) -> RemoteBackend;
}
