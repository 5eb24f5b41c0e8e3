//! Cronkeep Services Layer
//!
//! Job drivers composed from the infra building blocks. Each driver is one
//! cron job: it runs a single pass and returns a summary for the binary to
//! print. Keep orchestration here; keep argument parsing in cronkeep-cli.

pub mod archival;
pub mod log_report;
pub mod storage_alert;

pub use archival::{ArchivalPolicy, PolicyRun};
pub use log_report::{LogReport, LogReportOptions, LogReportRun};
pub use storage_alert::{AlertOutcome, StorageAlert};

pub use cronkeep_infra::{
    DiskProbe, DiskUsage, Notification, Notifier, SmtpNotifier, SysinfoDiskProbe,
};
pub use cronkeep_storage::{create_remote_storage, RemoteStorage};
