//! Shared fixtures for job driver tests.
//!
//! Run from workspace root: `cargo test -p cronkeep-services`.

#![allow(dead_code)]

use async_trait::async_trait;
use cronkeep_core::{AppError, AppResult, ArchiveConfig, TimestampSource};
use cronkeep_infra::{DiskProbe, DiskUsage, Notification, Notifier};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

pub const DAY: Duration = Duration::from_secs(86_400);

/// Write `path` (creating parents) and backdate its mtime by `days`.
pub fn write_aged(path: &Path, contents: &[u8], days: u32) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    std::fs::write(path, contents).expect("Failed to write fixture");
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(SystemTime::now() - DAY * days))
        .expect("Failed to backdate fixture");
    path.to_path_buf()
}

pub fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read fixture folder")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Archive settings with file ages taken from mtime so fixtures can be
/// backdated.
pub fn test_archive_config() -> ArchiveConfig {
    ArchiveConfig {
        timestamp_source: TimestampSource::Modified,
        ..ArchiveConfig::default()
    }
}

/// Notifier that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Transport("relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Probe that always reports the same figures.
pub struct FixedProbe {
    pub usage: DiskUsage,
}

impl FixedProbe {
    pub fn new(total: u64, free: u64) -> Self {
        Self {
            usage: DiskUsage::new("/", total, free),
        }
    }
}

impl DiskProbe for FixedProbe {
    fn usage(&self, _path: &Path) -> AppResult<DiskUsage> {
        Ok(self.usage.clone())
    }
}
