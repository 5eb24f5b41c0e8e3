use crate::keys::validate_key;
use crate::traits::{RemoteStorage, StorageError, StorageResult};
use crate::RemoteBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{MultipartUpload, ObjectStoreExt, PutPayload};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;

/// Files at least this large are sent as a multipart upload.
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;
/// S3 requires every part but the last to be at least 5 MiB.
pub const DEFAULT_PART_SIZE: usize = 16 * 1024 * 1024;

/// Remote storage backed by any `object_store` implementation
#[derive(Clone)]
pub struct ObjectStoreRemote {
    store: Arc<dyn object_store::ObjectStore>,
    backend: RemoteBackend,
    /// Human-readable location for logs (bucket name or directory).
    location: String,
    multipart_threshold: u64,
    part_size: usize,
}

impl ObjectStoreRemote {
    /// Create an S3 remote
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    ///
    /// Credentials are read from the standard AWS environment variables.
    pub fn s3(bucket: String, region: String, endpoint_url: Option<String>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            backend: RemoteBackend::S3,
            location: bucket,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
        })
    }

    /// Create a remote rooted at a local (typically network-mounted) directory.
    pub fn local(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create remote directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let store = LocalFileSystem::new_with_prefix(&base_path)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            backend: RemoteBackend::Local,
            location: base_path.display().to_string(),
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
        })
    }

    /// In-memory remote, for dry runs and tests.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            backend: RemoteBackend::Memory,
            location: "memory".to_string(),
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Change when and how files are split into parts.
    pub fn with_multipart(mut self, threshold: u64, part_size: usize) -> Self {
        self.multipart_threshold = threshold.max(1);
        self.part_size = part_size.max(1);
        self
    }

    async fn upload_multipart(&self, key: &str, path: &std::path::Path, size: u64) -> StorageResult<u64> {
        validate_key(key)?;
        let location = Path::from(key);
        let start = Instant::now();

        let mut file = tokio::fs::File::open(path).await?;
        let mut upload = self
            .store
            .put_multipart(&location)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let (sent, parts) = match self.send_parts(&mut file, upload.as_mut()).await {
            Ok(progress) => progress,
            Err(e) => {
                if let Err(abort) = upload.abort().await {
                    tracing::warn!(error = %abort, key = %key, "Failed to abort multipart upload");
                }
                tracing::error!(
                    error = %e,
                    backend = %self.backend,
                    location = %self.location,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote multipart upload failed"
                );
                return Err(e);
            }
        };
        upload
            .complete()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::info!(
            backend = %self.backend,
            location = %self.location,
            key = %key,
            size_bytes = sent,
            parts,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote multipart upload successful"
        );
        Ok(sent)
    }

    /// Stream `file` in `part_size` chunks. Returns bytes sent and part count.
    async fn send_parts(
        &self,
        file: &mut tokio::fs::File,
        upload: &mut dyn MultipartUpload,
    ) -> StorageResult<(u64, usize)> {
        let mut sent = 0u64;
        let mut parts = 0usize;
        loop {
            let mut chunk = Vec::with_capacity(self.part_size);
            let read = (&mut *file)
                .take(self.part_size as u64)
                .read_to_end(&mut chunk)
                .await?;
            if read == 0 {
                break;
            }
            upload
                .put_part(PutPayload::from(chunk))
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            sent += read as u64;
            parts += 1;
            if read < self.part_size {
                break;
            }
        }
        Ok((sent, parts))
    }
}

#[async_trait]
impl RemoteStorage for ObjectStoreRemote {
    async fn upload_file(&self, key: &str, path: &std::path::Path) -> StorageResult<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        if size >= self.multipart_threshold {
            return self.upload_multipart(key, path, size).await;
        }

        let data = tokio::fs::read(path).await?;
        let sent = data.len() as u64;
        self.upload(key, Bytes::from(data)).await?;
        Ok(sent)
    }

    async fn upload(&self, key: &str, data: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let size = data.len() as u64;
        let location = Path::from(key);

        let start = Instant::now();

        self.store
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    backend = %self.backend,
                    location = %self.location,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            backend = %self.backend,
            location = %self.location,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote upload successful"
        );

        Ok(())
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        validate_key(key)?;
        let location = Path::from(key);

        match self.store.head(&location).await {
            Ok(meta) => Ok(meta.size),
            Err(ObjectStoreError::NotFound { .. }) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> RemoteBackend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_upload_then_size_check() {
        let remote = ObjectStoreRemote::in_memory();
        remote
            .upload("dest/_backup-260101.zip", Bytes::from_static(b"PK\x03\x04data"))
            .await
            .unwrap();

        assert_eq!(remote.content_length("dest/_backup-260101.zip").await.unwrap(), 8);
        assert!(remote.exists("dest/_backup-260101.zip").await.unwrap());
        assert!(!remote.exists("dest/missing.zip").await.unwrap());
        assert_eq!(remote.backend_type(), RemoteBackend::Memory);
    }

    #[tokio::test]
    async fn large_file_goes_up_in_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_backup-260101.zip");
        let body: Vec<u8> = (0u8..20).collect();
        std::fs::write(&path, &body).unwrap();

        let remote = ObjectStoreRemote::in_memory().with_multipart(8, 8);
        let sent = remote.upload_file("dest/_backup-260101.zip", &path).await.unwrap();
        assert_eq!(sent, 20);
        assert_eq!(remote.content_length("dest/_backup-260101.zip").await.unwrap(), 20);

        let stored = remote
            .store
            .get(&Path::from("dest/_backup-260101.zip"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.as_ref(), body.as_slice());
    }

    #[tokio::test]
    async fn small_file_goes_up_in_one_put() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.zip");
        std::fs::write(&path, b"abc").unwrap();

        let remote = ObjectStoreRemote::in_memory().with_multipart(8, 8);
        assert_eq!(remote.upload_file("dest/small.zip", &path).await.unwrap(), 3);
        assert_eq!(remote.content_length("dest/small.zip").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let remote = ObjectStoreRemote::in_memory();
        let err = remote
            .upload_file("dest/absent.zip", &dir.path().join("absent.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::IoError(_)));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let remote = ObjectStoreRemote::in_memory();
        let err = remote.content_length("dest/nothing.zip").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_key_is_rejected_before_io() {
        let remote = ObjectStoreRemote::in_memory();
        let err = remote
            .upload("../escape.zip", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn local_remote_writes_under_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let remote = ObjectStoreRemote::local(dir.path().join("cold")).unwrap();

        remote
            .upload("folder/a.zip", Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("cold/folder/a.zip")).unwrap();
        assert_eq!(written, b"abc");
        assert_eq!(remote.content_length("folder/a.zip").await.unwrap(), 3);
    }
}
