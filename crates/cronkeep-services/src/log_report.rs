//! Daily mail with the latest log of every matching test run.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use cronkeep_infra::{Attachment, LogFinder, Notification, Notifier};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const REPORT_SUBJECT: &str = "SELENIUM: Delivery options log files";
pub const REPORT_BODY: &str =
    "Automated report on Delivery Options log files. See attachements for more.";

/// Which logs to pick up.
#[derive(Debug, Clone)]
pub struct LogReportOptions {
    pub days_back: u32,
    pub dir_contains: String,
    pub file_contains: String,
    /// Removed from the run folder name to form the attachment name.
    pub strip_suffix: String,
}

impl Default for LogReportOptions {
    fn default() -> Self {
        Self {
            days_back: 1,
            dir_contains: "delivery".to_string(),
            file_contains: "out".to_string(),
            strip_suffix: "_delivery_options".to_string(),
        }
    }
}

impl LogReportOptions {
    /// `checkout_delivery_options` -> `checkout.txt`
    pub fn attachment_name(&self, folder_name: &str) -> String {
        let stem = if self.strip_suffix.is_empty() {
            folder_name.to_string()
        } else {
            folder_name.replace(&self.strip_suffix, "")
        };
        format!("{}.txt", stem)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogReportRun {
    /// Attachment name to source log.
    pub attachments: BTreeMap<String, PathBuf>,
    pub sent: bool,
}

pub struct LogReport {
    finder: LogFinder,
    notifier: Arc<dyn Notifier>,
    options: LogReportOptions,
}

impl LogReport {
    pub fn new(
        logs_root: impl Into<PathBuf>,
        notifier: Arc<dyn Notifier>,
        options: LogReportOptions,
    ) -> Self {
        Self {
            finder: LogFinder::new(logs_root),
            notifier,
            options,
        }
    }

    pub async fn run(&self, recipient: &str) -> anyhow::Result<LogReportRun> {
        self.run_on(Local::now().date_naive(), recipient).await
    }

    /// Collect logs relative to `today` and mail them in one message.
    /// Nothing is sent when no log matched.
    #[tracing::instrument(skip(self))]
    pub async fn run_on(&self, today: NaiveDate, recipient: &str) -> anyhow::Result<LogReportRun> {
        let selections = self
            .finder
            .find(
                today,
                self.options.days_back,
                &self.options.dir_contains,
                &self.options.file_contains,
            )
            .context("Failed to collect log files")?;

        // Folders that map to the same attachment name keep the last one.
        let mut run = LogReportRun::default();
        for selection in selections {
            let name = self.options.attachment_name(&selection.folder_name);
            run.attachments.insert(name, selection.path);
        }

        if run.attachments.is_empty() {
            tracing::info!("No log files found, nothing to send");
            return Ok(run);
        }

        let mut notification =
            Notification::new(recipient, REPORT_SUBJECT, REPORT_BODY).high_priority();
        for (name, path) in &run.attachments {
            let content = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read log file {}", path.display()))?;
            notification = notification.with_attachment(Attachment::new(name.clone(), content));
        }

        self.notifier
            .send(&notification)
            .await
            .context("Failed to send log report")?;
        run.sent = true;

        tracing::info!(attachments = run.attachments.len(), "Log report sent");
        Ok(run)
    }
}
