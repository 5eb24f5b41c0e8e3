//! Shared key generation for remote backends.
//!
//! Key format: `{destination}/{file_name}`, or just `{file_name}` when the
//! destination is empty.

use crate::traits::{StorageError, StorageResult};

/// Build the remote key for a file offloaded into `destination`.
pub fn remote_key(destination: &str, file_name: &str) -> StorageResult<String> {
    if file_name.is_empty() || file_name.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "file name must be a single path segment: {:?}",
            file_name
        )));
    }

    let destination = destination.trim_matches('/');
    let key = if destination.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", destination, file_name)
    };

    validate_key(&key)?;
    Ok(key)
}

/// Reject keys that could escape the destination.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
        return Err(StorageError::InvalidKey(format!(
            "key contains invalid segments: {:?}",
            key
        )));
    }
    Ok(())
}
