//! Domain models for the batch jobs.
//!
//! Everything here is derived fresh from the filesystem on each run; nothing
//! is persisted between runs.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Age cutoff in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AgeThreshold {
    days: u32,
}

impl AgeThreshold {
    pub const fn days(days: u32) -> Self {
        Self { days }
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }

    pub fn as_seconds(&self) -> i64 {
        i64::from(self.days) * SECONDS_PER_DAY
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.as_seconds())
    }
}

impl Display for AgeThreshold {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}d", self.days)
    }
}

/// Which filesystem timestamp stands in for "creation time".
///
/// `StatusChange` is unix ctime: it moves on chmod, rename and link changes,
/// so it is not a reliable first-write time. `Birth` is only available on
/// filesystems that record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    #[default]
    StatusChange,
    Modified,
    Birth,
}

impl FromStr for TimestampSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ctime" | "status_change" => Ok(TimestampSource::StatusChange),
            "mtime" | "modified" => Ok(TimestampSource::Modified),
            "birth" | "btime" | "created" => Ok(TimestampSource::Birth),
            _ => Err(anyhow::anyhow!("Invalid timestamp source: {}", s)),
        }
    }
}

impl Display for TimestampSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TimestampSource::StatusChange => write!(f, "ctime"),
            TimestampSource::Modified => write!(f, "mtime"),
            TimestampSource::Birth => write!(f, "birth"),
        }
    }
}

/// What to do when today's bundle name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Atomically replace the existing bundle.
    #[default]
    Overwrite,
    /// Use the first free `{prefix}-{YYMMDD}-{n}.zip`.
    Suffix,
    /// Fail with `BundleExists`.
    Reject,
}

impl FromStr for CollisionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "suffix" => Ok(CollisionPolicy::Suffix),
            "reject" => Ok(CollisionPolicy::Reject),
            _ => Err(anyhow::anyhow!("Invalid collision policy: {}", s)),
        }
    }
}

impl Display for CollisionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Suffix => write!(f, "suffix"),
            CollisionPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// A file found directly inside a watched folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Path relative to the watched root.
    pub relative_path: PathBuf,
    /// Timestamp selected by the catalog's `TimestampSource`.
    pub timestamp: DateTime<Utc>,
    pub size_bytes: u64,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<PathBuf>, timestamp: DateTime<Utc>, size_bytes: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            timestamp,
            size_bytes,
        }
    }

    /// Base file name, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.relative_path.file_name().and_then(|n| n.to_str())
    }

    /// Base file name with invalid UTF-8 replaced by U+FFFD.
    pub fn file_name_lossy(&self) -> Option<String> {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn extension(&self) -> Option<&str> {
        self.relative_path.extension().and_then(|e| e.to_str())
    }

    /// Elapsed time between the entry's timestamp and `now`. Negative for
    /// timestamps in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }
}

/// A zip container produced by one archiver build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveBundle {
    /// File name of the bundle, e.g. `_backup-261016.zip`.
    pub name: String,
    pub path: PathBuf,
    /// In-container names, in write order.
    pub entries: Vec<String>,
    /// True when an existing same-day bundle was replaced.
    pub replaced_existing: bool,
    pub sources_deleted: bool,
}

/// One file scheduled for offload to a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTask {
    pub entry: FileEntry,
    pub destination: String,
}

impl UploadTask {
    pub fn new(entry: FileEntry, destination: impl Into<String>) -> Self {
        Self {
            entry,
            destination: destination.into(),
        }
    }
}
