//! Cronkeep Infrastructure Library
//!
//! Filesystem and network building blocks used by the batch jobs:
//! - File catalog and age filter
//! - Zip archive creation
//! - Remote offload
//! - Disk usage probing
//! - Mail notifications
//! - Run lock, host identity and log discovery
//! - Telemetry initialization

pub mod age_filter;
pub mod archive;
pub mod capacity;
pub mod catalog;
pub mod host;
pub mod lock;
pub mod log_finder;
pub mod notify;
pub mod offload;
pub mod telemetry;

// Re-export commonly used types
pub use age_filter::{select_older_than, select_older_than_at};
pub use archive::{bundle_name, Archiver};
pub use capacity::{DiskProbe, DiskUsage, SysinfoDiskProbe};
pub use catalog::FileCatalog;
pub use host::{host_name, interface_addresses};
pub use lock::{LockInfo, RunLock};
pub use log_finder::{LogFinder, LogSelection};
pub use notify::{Attachment, Notification, Notifier, SmtpNotifier};
pub use offload::{OffloadReport, RemoteOffloader};
pub use telemetry::init_telemetry;
