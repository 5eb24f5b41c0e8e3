//! Cronkeep Storage Library
//!
//! Remote storage abstraction used to offload aged bundles. The
//! `RemoteStorage` trait is implemented over `object_store`, so S3 (and
//! S3-compatible providers), a local/mounted directory and an in-memory store
//! share one code path.
//!
//! # Key format
//!
//! Objects are written to `{destination}/{file_name}` where `destination` is
//! the opaque folder identifier given on the command line. Keys must not
//! contain `..` or a leading `/`. Key generation lives in the `keys` module.

pub mod factory;
pub mod keys;
pub mod object;
pub mod traits;

// Re-export commonly used types
pub use cronkeep_core::RemoteBackend;
pub use factory::create_remote_storage;
pub use object::ObjectStoreRemote;
pub use traits::{RemoteStorage, StorageError, StorageResult};
