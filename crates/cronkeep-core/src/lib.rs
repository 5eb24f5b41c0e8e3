//! Cronkeep Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by the cronkeep batch jobs (archival, storage alert, log report).

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{ArchiveConfig, Config, MailConfig, RemoteConfig};
pub use error::{AppError, AppResult};
pub use models::{
    AgeThreshold, ArchiveBundle, CollisionPolicy, FileEntry, TimestampSource, UploadTask,
    SECONDS_PER_DAY,
};
pub use storage_types::RemoteBackend;
