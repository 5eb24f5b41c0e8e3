//! Discovery of the most recent log file per run folder.
//!
//! Logs are laid out as `{logs_root}/{YYYY-MM-DD}/{run folder}/{log files}`.
//! Log file names sort chronologically, so the greatest matching name in a
//! run folder is its most recent log.

use chrono::{Duration, NaiveDate};
use cronkeep_core::{AppError, AppResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The chosen log for one run folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSelection {
    pub folder_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LogFinder {
    logs_root: PathBuf,
}

impl LogFinder {
    pub fn new(logs_root: impl Into<PathBuf>) -> Self {
        Self {
            logs_root: logs_root.into(),
        }
    }

    /// `{logs_root}/{YYYY-MM-DD of today - days_back}`
    pub fn dated_folder(&self, today: NaiveDate, days_back: u32) -> PathBuf {
        let date = today - Duration::days(i64::from(days_back));
        self.logs_root.join(date.format("%Y-%m-%d").to_string())
    }

    /// Most recent log (name containing `file_contains`) in every run folder
    /// whose name contains `dir_contains`. Run folders without a matching log
    /// are skipped.
    #[tracing::instrument(skip(self), fields(logs_root = %self.logs_root.display()))]
    pub fn find(
        &self,
        today: NaiveDate,
        days_back: u32,
        dir_contains: &str,
        file_contains: &str,
    ) -> AppResult<Vec<LogSelection>> {
        let base = self.dated_folder(today, days_back);

        let mut selections = Vec::new();
        for (folder_name, folder) in list_named(&base, |meta| meta.is_dir())? {
            if !folder_name.contains(dir_contains) {
                continue;
            }

            let latest = list_named(&folder, |meta| meta.is_file())?
                .into_iter()
                .filter(|(name, _)| name.contains(file_contains))
                .max_by(|a, b| a.0.cmp(&b.0));

            match latest {
                Some((_, path)) => selections.push(LogSelection { folder_name, path }),
                None => tracing::warn!(
                    folder = %folder.display(),
                    file_contains = %file_contains,
                    "No matching log file in run folder"
                ),
            }
        }

        tracing::debug!(base = %base.display(), found = selections.len(), "Log discovery finished");
        Ok(selections)
    }
}

/// UTF-8 named children of `dir` accepted by `keep`, sorted by name.
fn list_named<F>(dir: &Path, keep: F) -> AppResult<Vec<(String, PathBuf)>>
where
    F: Fn(&fs::Metadata) -> bool,
{
    let read_dir = fs::read_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::NotFound(format!("log folder {}", dir.display())),
        _ => AppError::io(dir, e),
    })?;

    let mut out = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|e| AppError::io(dir, e))?;
        let path = dir_entry.path();
        let Ok(name) = dir_entry.file_name().into_string() else {
            continue;
        };
        let meta = fs::metadata(&path).map_err(|e| AppError::io(&path, e))?;
        if keep(&meta) {
            out.push((name, path));
        }
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
