use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike};
use cronkeep_core::{AppError, AppResult, ArchiveBundle, CollisionPolicy, FileEntry};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::catalog::RESERVED_PREFIX;

/// Bundle file name for a prefix and run date: `{prefix}-{YYMMDD}.zip`.
pub fn bundle_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}.zip", prefix, date.format("%y%m%d"))
}

fn suffixed_bundle_name(prefix: &str, date: NaiveDate, n: u32) -> String {
    format!("{}-{}-{}.zip", prefix, date.format("%y%m%d"), n)
}

/// In-container name for an entry: its base file name only. Invalid UTF-8
/// is replaced with U+FFFD.
fn archive_entry_name(entry: &FileEntry) -> Option<String> {
    entry
        .file_name_lossy()
        .filter(|s| !s.is_empty() && s != "." && s != "..")
}

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Zip stores local date/time with 2s resolution for years 1980..=2107.
fn zip_timestamp(ts: DateTime<Local>) -> Option<zip::DateTime> {
    let year = u16::try_from(ts.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second() as u8,
    )
    .ok()
}

fn zip_error(path: &Path, err: zip::result::ZipError) -> AppError {
    match err {
        zip::result::ZipError::Io(e) => AppError::io(path, e),
        other => AppError::Archive(format!("{}: {}", path.display(), other)),
    }
}

/// Writes dated zip bundles into a watched folder.
#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
    collision_policy: CollisionPolicy,
}

impl Archiver {
    pub fn new(root: impl Into<PathBuf>, collision_policy: CollisionPolicy) -> Self {
        Self {
            root: root.into(),
            collision_policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundle `entries` into `{prefix}-{today}.zip` inside the root.
    pub fn build(
        &self,
        entries: &[FileEntry],
        prefix: &str,
        delete_source: bool,
    ) -> AppResult<ArchiveBundle> {
        self.build_on(Local::now().date_naive(), entries, prefix, delete_source)
    }

    /// Bundle `entries` as if the run happened on `date`.
    ///
    /// The archive is written to a hidden temporary file and renamed into
    /// place once finalized, so a failed build never leaves a partial bundle
    /// under the final name. Sources are only deleted after the rename.
    #[tracing::instrument(skip(self, entries), fields(root = %self.root.display(), entries = entries.len()))]
    pub fn build_on(
        &self,
        date: NaiveDate,
        entries: &[FileEntry],
        prefix: &str,
        delete_source: bool,
    ) -> AppResult<ArchiveBundle> {
        if !self.root.is_dir() {
            return Err(AppError::NotFound(format!(
                "archive root {}",
                self.root.display()
            )));
        }

        let names = Self::entry_names(entries)?;
        let (name, target, replaced_existing) = self.resolve_target(prefix, date)?;

        let temp_prefix = format!("{}-", RESERVED_PREFIX);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&temp_prefix).suffix(".partial");
        // Bundles get the same mode as any file the job user creates.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut temp = builder
            .tempfile_in(&self.root)
            .map_err(|e| AppError::io(&self.root, e))?;
        let temp_path = temp.path().to_path_buf();

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644);

            for (entry, entry_name) in entries.iter().zip(&names) {
                let source = entry.path_in(&self.root);
                let mut file = File::open(&source).map_err(|e| AppError::io(&source, e))?;
                let meta = file.metadata().map_err(|e| AppError::io(&source, e))?;

                // Entry time is the source mtime in local time.
                let modified = meta.modified().map_err(|e| AppError::io(&source, e))?;
                let options = match zip_timestamp(DateTime::<Local>::from(modified)) {
                    Some(ts) => options.last_modified_time(ts),
                    None => options,
                };
                let options = options.large_file(meta.len() >= ZIP64_THRESHOLD);

                zip.start_file(entry_name.as_str(), options)
                    .map_err(|e| zip_error(&temp_path, e))?;
                io::copy(&mut file, &mut zip).map_err(|e| AppError::io(&source, e))?;

                tracing::debug!(
                    source = %source.display(),
                    entry = %entry_name,
                    size_bytes = meta.len(),
                    "Added file to bundle"
                );
            }

            zip.finish().map_err(|e| zip_error(&temp_path, e))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| AppError::io(&temp_path, e))?;

        // Overwrite renames over any existing bundle; the other policies must
        // never clobber one that appeared since the name was resolved.
        let persisted = match self.collision_policy {
            CollisionPolicy::Overwrite => temp.persist(&target),
            CollisionPolicy::Suffix | CollisionPolicy::Reject => temp.persist_noclobber(&target),
        };
        persisted.map_err(|e| match e.error.kind() {
            io::ErrorKind::AlreadyExists => AppError::BundleExists(name.clone()),
            _ => AppError::io(&target, e.error),
        })?;

        tracing::info!(
            bundle = %name,
            entries = names.len(),
            replaced_existing,
            "Bundle written"
        );

        if delete_source {
            for entry in entries {
                let source = entry.path_in(&self.root);
                match fs::remove_file(&source) {
                    Ok(()) => tracing::debug!(source = %source.display(), "Deleted bundled source"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tracing::warn!(source = %source.display(), "Bundled source already gone");
                    }
                    Err(e) => return Err(AppError::io(&source, e)),
                }
            }
        }

        Ok(ArchiveBundle {
            name,
            path: target,
            entries: names,
            replaced_existing,
            sources_deleted: delete_source,
        })
    }

    /// Flattened names for every entry; two entries sharing a base name
    /// would collide inside the container and are rejected up front.
    fn entry_names(entries: &[FileEntry]) -> AppResult<Vec<String>> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut names = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = archive_entry_name(entry).ok_or_else(|| {
                AppError::Archive(format!(
                    "entry has no usable file name: {}",
                    entry.relative_path.display()
                ))
            })?;
            if !seen.insert(name.clone()) {
                return Err(AppError::DuplicateEntryName(name));
            }
            names.push(name);
        }

        Ok(names)
    }

    fn resolve_target(&self, prefix: &str, date: NaiveDate) -> AppResult<(String, PathBuf, bool)> {
        let name = bundle_name(prefix, date);
        let path = self.root.join(&name);
        let exists = path.try_exists().map_err(|e| AppError::io(&path, e))?;

        match (self.collision_policy, exists) {
            (_, false) => Ok((name, path, false)),
            (CollisionPolicy::Overwrite, true) => Ok((name, path, true)),
            (CollisionPolicy::Reject, true) => Err(AppError::BundleExists(name)),
            (CollisionPolicy::Suffix, true) => {
                for n in 1u32.. {
                    let candidate = suffixed_bundle_name(prefix, date, n);
                    let candidate_path = self.root.join(&candidate);
                    if !candidate_path
                        .try_exists()
                        .map_err(|e| AppError::io(&candidate_path, e))?
                    {
                        return Ok((candidate, candidate_path, false));
                    }
                }
                Err(AppError::BundleExists(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn bundle_name_uses_two_digit_year() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(bundle_name("_backup", date), "_backup-260105.zip");
        assert_eq!(suffixed_bundle_name("_backup", date, 2), "_backup-260105-2.zip");
    }

    #[test]
    fn entry_names_flatten_paths() {
        let ts = Utc::now();
        let entries = vec![
            FileEntry::new("../../etc/passwd", ts, 1),
            FileEntry::new("nested/bar.txt", ts, 1),
            FileEntry::new("plain.pdf", ts, 1),
        ];
        assert_eq!(
            Archiver::entry_names(&entries).unwrap(),
            vec!["passwd", "bar.txt", "plain.pdf"]
        );
    }

    #[test]
    fn entry_names_reject_duplicates_and_empty() {
        let ts = Utc::now();
        let dupes = vec![
            FileEntry::new("a/report.csv", ts, 1),
            FileEntry::new("b/report.csv", ts, 1),
        ];
        assert!(matches!(
            Archiver::entry_names(&dupes),
            Err(AppError::DuplicateEntryName(name)) if name == "report.csv"
        ));

        let dotdot = vec![FileEntry::new("..", ts, 1)];
        assert!(matches!(
            Archiver::entry_names(&dotdot),
            Err(AppError::Archive(_))
        ));
    }

    #[test]
    fn zip_timestamp_keeps_local_wall_clock() {
        let ok = Local.with_ymd_and_hms(2026, 10, 6, 8, 30, 14).unwrap();
        let ts = zip_timestamp(ok).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2026, 10, 6));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (8, 30, 14));

        let too_early = Local.with_ymd_and_hms(1975, 1, 1, 12, 0, 0).unwrap();
        assert!(zip_timestamp(too_early).is_none());
    }
}
