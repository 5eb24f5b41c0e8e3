//! Configuration module
//!
//! Job settings come from the process environment (optionally seeded from a
//! `.env` file). Credentials are never hard-coded.

use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::{AgeThreshold, CollisionPolicy, TimestampSource};
use crate::storage_types::RemoteBackend;

const STALE_DAYS: u32 = 7;
const OFFLOAD_DAYS: u32 = 90;
const BUNDLE_PREFIX: &str = "_backup";
const SMTP_HOST: &str = "smtp.gmail.com";
const SMTP_PORT: u16 = 587;
const LOCK_TTL_HOURS: u32 = 24;

/// Archival policy settings
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    pub stale_after: AgeThreshold,
    pub offload_after: AgeThreshold,
    pub prefix: String,
    /// Delete source files once they are inside a persisted bundle.
    pub delete_sources: bool,
    /// Delete local bundles after a confirmed upload.
    pub delete_after_upload: bool,
    pub collision_policy: CollisionPolicy,
    pub timestamp_source: TimestampSource,
    pub lock_enabled: bool,
    /// A lock older than this is treated as left behind by a dead run.
    pub lock_ttl_hours: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            stale_after: AgeThreshold::days(STALE_DAYS),
            offload_after: AgeThreshold::days(OFFLOAD_DAYS),
            prefix: BUNDLE_PREFIX.to_string(),
            delete_sources: false,
            delete_after_upload: false,
            collision_policy: CollisionPolicy::default(),
            timestamp_source: TimestampSource::default(),
            lock_enabled: true,
            lock_ttl_hours: LOCK_TTL_HOURS,
        }
    }
}

/// Remote storage settings used by the offloader
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub backend: RemoteBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_path: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::S3,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_path: None,
        }
    }
}

/// SMTP relay settings
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: SMTP_HOST.to_string(),
            smtp_port: SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
        }
    }
}

/// Application configuration shared by all job binaries.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub remote: RemoteConfig,
    pub mail: MailConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let archive = ArchiveConfig {
            stale_after: AgeThreshold::days(parse_or(&get, "ARCHIVE_STALE_DAYS", STALE_DAYS)?),
            offload_after: AgeThreshold::days(parse_or(
                &get,
                "ARCHIVE_OFFLOAD_DAYS",
                OFFLOAD_DAYS,
            )?),
            prefix: get("ARCHIVE_PREFIX").unwrap_or_else(|| BUNDLE_PREFIX.to_string()),
            delete_sources: parse_bool_or(&get, "ARCHIVE_DELETE_SOURCES", false)?,
            delete_after_upload: parse_bool_or(&get, "ARCHIVE_DELETE_AFTER_UPLOAD", false)?,
            collision_policy: parse_or(
                &get,
                "ARCHIVE_COLLISION_POLICY",
                CollisionPolicy::default(),
            )?,
            timestamp_source: parse_or(
                &get,
                "ARCHIVE_TIMESTAMP_SOURCE",
                TimestampSource::default(),
            )?,
            lock_enabled: parse_bool_or(&get, "ARCHIVE_LOCK", true)?,
            lock_ttl_hours: parse_or(&get, "ARCHIVE_LOCK_TTL_HOURS", LOCK_TTL_HOURS)?,
        };

        let remote = RemoteConfig {
            backend: parse_or(&get, "REMOTE_BACKEND", RemoteBackend::S3)?,
            s3_bucket: get("S3_BUCKET"),
            s3_region: get("S3_REGION"),
            s3_endpoint: get("S3_ENDPOINT"),
            aws_region: get("AWS_REGION"),
            local_path: get("REMOTE_LOCAL_PATH"),
        };

        // MAILFROM / PASSWORD are accepted for older cron entries.
        let smtp_user = get("SMTP_USER").or_else(|| get("MAILFROM"));
        let mail = MailConfig {
            smtp_host: get("SMTP_HOST").unwrap_or_else(|| SMTP_HOST.to_string()),
            smtp_port: parse_or(&get, "SMTP_PORT", SMTP_PORT)?,
            smtp_password: get("SMTP_PASSWORD").or_else(|| get("PASSWORD")),
            smtp_from: get("SMTP_FROM").or_else(|| smtp_user.clone()),
            smtp_user,
            smtp_tls: parse_bool_or(&get, "SMTP_TLS", true)?,
        };

        let config = Config {
            archive,
            remote,
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.archive.validate()
    }
}

impl ArchiveConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.prefix.contains('/') || self.prefix.contains('\\') {
            return Err(AppError::Config(format!(
                "ARCHIVE_PREFIX must not contain path separators: {}",
                self.prefix
            )));
        }
        if self.lock_ttl_hours == 0 {
            return Err(AppError::Config(
                "ARCHIVE_LOCK_TTL_HOURS must be at least 1".to_string(),
            ));
        }
        if self.prefix.starts_with(".cronkeep") {
            return Err(AppError::Config(
                "ARCHIVE_PREFIX must not use the reserved .cronkeep prefix".to_string(),
            ));
        }
        Ok(())
    }
}

impl RemoteConfig {
    /// Check that the selected backend has everything it needs.
    pub fn validate(&self) -> Result<(), AppError> {
        match self.backend {
            RemoteBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(AppError::Config("S3_BUCKET not configured".to_string()));
                }
                if self.region().is_none() {
                    return Err(AppError::Config(
                        "S3_REGION or AWS_REGION not configured".to_string(),
                    ));
                }
                Ok(())
            }
            RemoteBackend::Local if self.local_path.is_none() => Err(AppError::Config(
                "REMOTE_LOCAL_PATH not configured".to_string(),
            )),
            RemoteBackend::Local | RemoteBackend::Memory => Ok(()),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }
}

impl MailConfig {
    /// Sender and password are required by every job that sends mail.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.smtp_user.is_none() || self.smtp_password.is_none() {
            return Err(AppError::Config(
                "SMTP_USER (or MAILFROM) and SMTP_PASSWORD (or PASSWORD) must be set".to_string(),
            ));
        }
        if self.smtp_from.is_none() {
            return Err(AppError::Config("SMTP_FROM must be set".to_string()));
        }
        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{} has an invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::Config(format!(
                "{} must be true or false, got '{}'",
                key, v
            ))),
        },
        None => Ok(default),
    }
}
