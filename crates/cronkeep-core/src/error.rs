//! Error types module
//!
//! All job failures are unified under `AppError`. Every variant is fatal to the
//! current run; the scheduler re-attempts on its next interval.

use std::io;
use std::path::{Path, PathBuf};

/// Result alias used across the cronkeep crates.
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bundle already exists: {0}")]
    BundleExists(String),

    #[error("Duplicate entry name in bundle: {0}")]
    DuplicateEntryName(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Machine-readable error code for structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::BundleExists(_) => "BUNDLE_EXISTS",
            AppError::DuplicateEntryName(_) => "DUPLICATE_ENTRY_NAME",
            AppError::Archive(_) => "ARCHIVE_ERROR",
        }
    }

    /// Whether the next scheduled run may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Io { .. })
    }
}
