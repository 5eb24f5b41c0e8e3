//! Archive creation service
//!
//! This module bundles aged files into dated zip containers.

pub use service::{bundle_name, Archiver};

mod service;
