use cronkeep_core::{AppError, AppResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Space figures for one mounted filesystem, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl DiskUsage {
    pub fn new(mount_point: impl Into<PathBuf>, total: u64, free: u64) -> Self {
        Self {
            mount_point: mount_point.into(),
            total,
            used: total.saturating_sub(free),
            free,
        }
    }

    /// Free space as a fraction of total; 0.0 for a zero-sized filesystem.
    pub fn free_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.free as f64 / self.total as f64
    }

    pub fn free_percent(&self) -> f64 {
        self.free_ratio() * 100.0
    }
}

/// Reports disk usage for the filesystem holding a path.
pub trait DiskProbe: Send + Sync {
    fn usage(&self, path: &Path) -> AppResult<DiskUsage>;
}

/// `DiskProbe` backed by the mounted disk list from sysinfo.
#[derive(Debug, Clone, Default)]
pub struct SysinfoDiskProbe;

impl SysinfoDiskProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DiskProbe for SysinfoDiskProbe {
    fn usage(&self, path: &Path) -> AppResult<DiskUsage> {
        let canonical = path.canonicalize().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("probe path {}", path.display()))
            }
            _ => AppError::io(path, e),
        })?;

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<DiskUsage> = disks
            .iter()
            .map(|disk| DiskUsage::new(disk.mount_point(), disk.total_space(), disk.available_space()))
            .collect();

        let usage = pick_mount(&canonical, mounts).ok_or_else(|| {
            AppError::NotFound(format!(
                "could not determine disk space for path: {}",
                path.display()
            ))
        })?;

        tracing::debug!(
            path = %path.display(),
            mount_point = %usage.mount_point.display(),
            total_bytes = usage.total,
            free_bytes = usage.free,
            "Probed disk usage"
        );
        Ok(usage)
    }
}

/// The mount whose mount point is the longest prefix of `path`.
fn pick_mount(path: &Path, mounts: Vec<DiskUsage>) -> Option<DiskUsage> {
    mounts
        .into_iter()
        .filter(|m| path.starts_with(&m.mount_point))
        .max_by_key(|m| m.mount_point.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_and_used() {
        let usage = DiskUsage::new("/", 1_000, 250);
        assert_eq!(usage.used, 750);
        assert!((usage.free_ratio() - 0.25).abs() < f64::EPSILON);
        assert!((usage.free_percent() - 25.0).abs() < 1e-9);
        assert_eq!(DiskUsage::new("/", 0, 0).free_ratio(), 0.0);
    }

    #[test]
    fn longest_mount_prefix_wins() {
        let mounts = vec![
            DiskUsage::new("/", 100, 50),
            DiskUsage::new("/var", 100, 10),
            DiskUsage::new("/var/lib/docker", 100, 90),
            DiskUsage::new("/variant", 100, 1),
        ];

        let picked = pick_mount(Path::new("/var/log/syslog"), mounts.clone()).unwrap();
        assert_eq!(picked.mount_point, PathBuf::from("/var"));

        let root = pick_mount(Path::new("/home/ops"), mounts.clone()).unwrap();
        assert_eq!(root.mount_point, PathBuf::from("/"));

        let docker = pick_mount(Path::new("/var/lib/docker/overlay2"), mounts).unwrap();
        assert_eq!(docker.free, 90);
    }

    #[test]
    fn no_matching_mount() {
        let mounts = vec![DiskUsage::new("/mnt/data", 100, 50)];
        assert!(pick_mount(Path::new("/home"), mounts).is_none());
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SysinfoDiskProbe::new()
            .usage(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
