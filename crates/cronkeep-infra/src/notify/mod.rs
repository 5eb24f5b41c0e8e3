//! Mail notifications
//!
//! `Notifier` is the seam the jobs send through; `SmtpNotifier` is the
//! production implementation over an authenticated relay.

use async_trait::async_trait;
use cronkeep_core::AppResult;

pub use smtp::SmtpNotifier;

mod smtp;

/// A file sent alongside a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    /// Sets `X-Priority: 1`.
    pub high_priority: bool,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
            high_priority: false,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn high_priority(mut self) -> Self {
        self.high_priority = true;
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;
}
