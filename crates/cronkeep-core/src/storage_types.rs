use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Remote storage backend types
///
/// Selects where aged bundles are offloaded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    S3,
    Local,
    Memory,
}

impl FromStr for RemoteBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(RemoteBackend::S3),
            "local" => Ok(RemoteBackend::Local),
            "memory" => Ok(RemoteBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid remote backend: {}", s)),
        }
    }
}

impl Display for RemoteBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RemoteBackend::S3 => write!(f, "s3"),
            RemoteBackend::Local => write!(f, "local"),
            RemoteBackend::Memory => write!(f, "memory"),
        }
    }
}
