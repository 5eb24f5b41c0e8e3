//! Low disk space alert.

use anyhow::Context;
use cronkeep_core::AppError;
use cronkeep_infra::{host_name, interface_addresses, DiskProbe, DiskUsage, Notification, Notifier};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const ALERT_SUBJECT: &str = "ALERT: Low server storage space";

#[derive(Debug, Clone, Serialize)]
pub struct AlertOutcome {
    pub usage: DiskUsage,
    pub threshold_percent: u8,
    pub alerted: bool,
}

/// Mails `recipient` when free space on a filesystem falls to or below a
/// percentage of its size.
pub struct StorageAlert {
    probe: Arc<dyn DiskProbe>,
    notifier: Arc<dyn Notifier>,
    host_name: String,
    /// One line per interface address, listed above the host name.
    addresses: Vec<String>,
}

impl StorageAlert {
    pub fn new(probe: Arc<dyn DiskProbe>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            probe,
            notifier,
            host_name: host_name(),
            addresses: interface_addresses(),
        }
    }

    /// Replace the detected host identity.
    pub fn with_host(mut self, host_name: impl Into<String>, addresses: Vec<String>) -> Self {
        self.host_name = host_name.into();
        self.addresses = addresses;
        self
    }

    /// Probe `path` and decide whether `threshold_percent` is breached.
    pub fn evaluate(&self, path: &Path, threshold_percent: u8) -> anyhow::Result<(DiskUsage, bool)> {
        if threshold_percent > 100 {
            return Err(AppError::Config(format!(
                "threshold must be between 0 and 100, got {}",
                threshold_percent
            ))
            .into());
        }

        let usage = self
            .probe
            .usage(path)
            .with_context(|| format!("Failed to probe disk usage for {}", path.display()))?;
        let breached = usage.free_ratio() <= f64::from(threshold_percent) / 100.0;

        tracing::info!(
            mount_point = %usage.mount_point.display(),
            free_ratio = usage.free_ratio(),
            threshold_percent,
            breached,
            "Disk usage probed"
        );
        Ok((usage, breached))
    }

    pub fn message(&self, usage: &DiskUsage) -> String {
        let mut message = format!(
            "There is less than {:.2} % of free space on server: \n",
            usage.free_percent()
        );
        for address in &self.addresses {
            message.push('\n');
            message.push_str(address);
        }
        message.push('\n');
        message.push_str(&self.host_name);
        message
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(
        &self,
        path: &Path,
        threshold_percent: u8,
        recipient: &str,
    ) -> anyhow::Result<AlertOutcome> {
        let (usage, breached) = self.evaluate(path, threshold_percent)?;

        if breached {
            let notification =
                Notification::new(recipient, ALERT_SUBJECT, self.message(&usage));
            self.notifier
                .send(&notification)
                .await
                .context("Failed to send storage alert")?;
        }

        Ok(AlertOutcome {
            usage,
            threshold_percent,
            alerted: breached,
        })
    }
}
