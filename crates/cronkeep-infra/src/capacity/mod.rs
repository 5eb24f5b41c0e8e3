//! Disk capacity probing
//!
//! This module reports total, used and free bytes for the filesystem that
//! holds a given path.

pub use probe::{DiskProbe, DiskUsage, SysinfoDiskProbe};

mod probe;
