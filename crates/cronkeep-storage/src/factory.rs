use crate::{ObjectStoreRemote, RemoteBackend, RemoteStorage, StorageError, StorageResult};
use cronkeep_core::RemoteConfig;
use std::sync::Arc;

/// Create a remote storage backend based on configuration
pub fn create_remote_storage(config: &RemoteConfig) -> StorageResult<Arc<dyn RemoteStorage>> {
    match config.backend {
        RemoteBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let remote = ObjectStoreRemote::s3(bucket, region, config.s3_endpoint.clone())?;
            Ok(Arc::new(remote))
        }

        RemoteBackend::Local => {
            let base_path = config.local_path.clone().ok_or_else(|| {
                StorageError::ConfigError("REMOTE_LOCAL_PATH not configured".to_string())
            })?;

            let remote = ObjectStoreRemote::local(base_path)?;
            Ok(Arc::new(remote))
        }

        RemoteBackend::Memory => {
            tracing::warn!("Using in-memory remote storage; offloaded bundles are discarded on exit");
            Ok(Arc::new(ObjectStoreRemote::in_memory()))
        }
    }
}
