//! File catalog for a watched folder.
//!
//! Lists regular files directly inside the root. Subdirectories are never
//! descended into.

use chrono::{DateTime, Utc};
use cronkeep_core::{AppError, AppResult, FileEntry, TimestampSource};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Names starting with this are cronkeep's own bookkeeping files (run lock,
/// in-progress bundles) and are never catalogued.
pub const RESERVED_PREFIX: &str = ".cronkeep";

#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
    timestamp_source: TimestampSource,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>, timestamp_source: TimestampSource) -> Self {
        Self {
            root: root.into(),
            timestamp_source,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timestamp_source(&self) -> TimestampSource {
        self.timestamp_source
    }

    /// List files in the root, keeping only names that end with
    /// `extension_filter` when it is non-empty.
    ///
    /// The filter is a literal suffix on the file name: `"zip"` matches
    /// `archive.zip` and also `notazip`. No leading dot is assumed.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn list(&self, extension_filter: &str) -> AppResult<Vec<FileEntry>> {
        let dir_meta = fs::metadata(&self.root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                AppError::NotFound(format!("watched folder {}", self.root.display()))
            }
            _ => AppError::io(&self.root, e),
        })?;
        if !dir_meta.is_dir() {
            return Err(AppError::NotFound(format!(
                "watched folder {} is not a directory",
                self.root.display()
            )));
        }

        let read_dir = fs::read_dir(&self.root).map_err(|e| AppError::io(&self.root, e))?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| AppError::io(&self.root, e))?;
            // Matching works on the lossy name; the entry keeps the raw one
            // so the file can still be opened and deleted.
            let raw_name = dir_entry.file_name();
            let name = raw_name.to_string_lossy();

            if name.starts_with(RESERVED_PREFIX) {
                continue;
            }
            if !extension_filter.is_empty() && !name.ends_with(extension_filter) {
                continue;
            }

            // Follows symlinks, so a link to a regular file counts as a file.
            let path = dir_entry.path();
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "File vanished during listing");
                    continue;
                }
                Err(e) => return Err(AppError::io(&path, e)),
            };
            if !meta.is_file() {
                continue;
            }

            let timestamp =
                entry_timestamp(&meta, self.timestamp_source).map_err(|e| AppError::io(&path, e))?;
            entries.push(FileEntry::new(raw_name, timestamp, meta.len()));
        }

        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        tracing::debug!(
            count = entries.len(),
            filter = %extension_filter,
            "Catalogued watched folder"
        );
        Ok(entries)
    }
}

/// Read the timestamp used for age checks from file metadata.
pub fn entry_timestamp(meta: &Metadata, source: TimestampSource) -> io::Result<DateTime<Utc>> {
    match source {
        TimestampSource::Modified => meta.modified().map(DateTime::<Utc>::from),
        TimestampSource::Birth => meta.created().map(DateTime::<Utc>::from),
        TimestampSource::StatusChange => status_change_time(meta),
    }
}

#[cfg(unix)]
fn status_change_time(meta: &Metadata) -> io::Result<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;

    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    DateTime::from_timestamp(meta.ctime(), nanos).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("ctime out of range: {}", meta.ctime()),
        )
    })
}

#[cfg(not(unix))]
fn status_change_time(meta: &Metadata) -> io::Result<DateTime<Utc>> {
    meta.created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str, contents: &[u8]) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn lists_only_direct_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.txt", b"bb");
        touch(dir.path(), "a.txt", b"a");
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "deep.txt", b"deep");

        let catalog = FileCatalog::new(dir.path(), TimestampSource::Modified);
        let entries = catalog.list("").unwrap();

        let names: Vec<_> = entries.iter().filter_map(|e| e.file_name()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(entries[1].size_bytes, 2);
    }

    #[test]
    fn suffix_filter_is_literal() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["archive.zip", "notazip", "report.ZIP", "zip.txt", "old.zip.bak"] {
            touch(dir.path(), name, b"x");
        }

        let catalog = FileCatalog::new(dir.path(), TimestampSource::Modified);

        let names: Vec<_> = catalog
            .list("zip")
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path.display().to_string())
            .collect();
        assert_eq!(names, vec!["archive.zip", "notazip"]);

        let dotted: Vec<_> = catalog
            .list(".zip")
            .unwrap()
            .into_iter()
            .map(|e| e.relative_path.display().to_string())
            .collect();
        assert_eq!(dotted, vec!["archive.zip"]);
    }

    #[test]
    fn reserved_names_are_hidden() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".cronkeep.lock", b"{}");
        touch(dir.path(), ".cronkeep-_backup-260101.zip.partial", b"PK");
        touch(dir.path(), "keep.zip", b"PK");

        let catalog = FileCatalog::new(dir.path(), TimestampSource::Modified);
        let entries = catalog.list("").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name(), Some("keep.zip"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_listed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let raw = OsStr::from_bytes(b"caf\xe9.txt");
        if fs::write(dir.path().join(raw), b"x").is_err() {
            // Filesystem enforces UTF-8 names.
            return;
        }

        let catalog = FileCatalog::new(dir.path(), TimestampSource::Modified);
        let entries = catalog.list(".txt").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path.as_os_str(), raw);
        assert_eq!(entries[0].file_name(), None);
        assert_eq!(entries[0].file_name_lossy().as_deref(), Some("caf\u{FFFD}.txt"));
    }

    #[test]
    fn empty_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path(), TimestampSource::StatusChange);
        assert!(catalog.list("").unwrap().is_empty());
        assert!(catalog.list(".zip").unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FileCatalog::new(dir.path().join("absent"), TimestampSource::Modified);
        assert!(matches!(catalog.list(""), Err(AppError::NotFound(_))));
    }

    #[test]
    fn file_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "plain.txt", b"x");
        let catalog = FileCatalog::new(dir.path().join("plain.txt"), TimestampSource::Modified);
        assert!(matches!(catalog.list(""), Err(AppError::NotFound(_))));
    }

    #[test]
    fn modified_timestamp_tracks_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aged.log");
        touch(dir.path(), "aged.log", b"x");

        let ten_days = std::time::Duration::from_secs(10 * 86_400);
        let mtime = std::time::SystemTime::now() - ten_days;
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let catalog = FileCatalog::new(dir.path(), TimestampSource::Modified);
        let entry = catalog.list("").unwrap().remove(0);
        let drift = (entry.timestamp - DateTime::<Utc>::from(mtime)).num_milliseconds().abs();
        assert!(drift < 1_000, "timestamp drifted by {}ms", drift);
    }
}
