//! Single-flight guard for a watched folder.
//!
//! Two archival runs against the same folder could pick the same stale files
//! and race on the same bundle name. The first run creates `.cronkeep.lock`
//! with create-new semantics; any other run fails until the guard is dropped.
//!
//! A run killed before it could release the lock leaves the file behind. The
//! next run takes such a lock over when it has expired, or when its holder
//! ran on this host and that process is gone.

use chrono::{DateTime, Duration, Utc};
use cronkeep_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};

use crate::catalog::RESERVED_PREFIX;
use crate::host::host_name;

/// Lock file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub host: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            pid: std::process::id(),
            host: host_name(),
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    /// Why this lock may be taken over, if it may.
    fn stale_reason(&self, host: &str, now: DateTime<Utc>) -> Option<&'static str> {
        if now >= self.expires_at {
            Some("expired")
        } else if self.host == host && !process_alive(self.pid) {
            Some("holder process is gone")
        } else {
            None
        }
    }
}

fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    System::new().refresh_process(Pid::from_u32(pid))
}

/// Held lock; released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn lock_path(root: &Path) -> PathBuf {
        root.join(format!("{}.lock", RESERVED_PREFIX))
    }

    /// Take the lock for `root`, valid for `ttl`.
    pub fn acquire(root: &Path, ttl: Duration) -> AppResult<Self> {
        let path = Self::lock_path(root);

        if let Some(file) = Self::create(root, &path)? {
            return Self::write_info(path, file, ttl);
        }

        let reason = match Self::stale_reason(&path, ttl)? {
            Some(reason) => reason,
            None => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(AppError::Config(format!(
                    "another run holds {} ({})",
                    path.display(),
                    holder.trim()
                )));
            }
        };

        tracing::warn!(path = %path.display(), reason, "Taking over stale run lock");
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::io(&path, e)),
        }

        // Another run may have taken it over first.
        match Self::create(root, &path)? {
            Some(file) => Self::write_info(path, file, ttl),
            None => Err(AppError::Config(format!(
                "another run took over {}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the lock file already exists.
    fn create(root: &Path, path: &Path) -> AppResult<Option<File>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "watched folder {}",
                root.display()
            ))),
            Err(e) => Err(AppError::io(path, e)),
        }
    }

    fn write_info(path: PathBuf, mut file: File, ttl: Duration) -> AppResult<Self> {
        let info = LockInfo::new(ttl);
        let body = serde_json::to_vec(&info)
            .map_err(|e| AppError::io(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        file.write_all(&body).map_err(|e| AppError::io(&path, e))?;

        tracing::debug!(path = %path.display(), pid = info.pid, expires_at = %info.expires_at, "Run lock acquired");
        Ok(Self { path })
    }

    /// A lock that cannot be parsed (its writer died mid-write) is judged by
    /// the file's modification time instead.
    fn stale_reason(path: &Path, ttl: Duration) -> AppResult<Option<&'static str>> {
        let now = Utc::now();
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Some("already released")),
            Err(e) => return Err(AppError::io(path, e)),
        };

        if let Ok(info) = serde_json::from_slice::<LockInfo>(&raw) {
            return Ok(info.stale_reason(&host_name(), now));
        }

        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| AppError::io(path, e))?;
        if now - DateTime::<Utc>::from(modified) >= ttl {
            Ok(Some("unreadable and expired"))
        } else {
            Ok(None)
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to release run lock");
        }
    }
}
