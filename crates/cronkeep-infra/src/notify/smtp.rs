use async_trait::async_trait;
use cronkeep_core::{AppError, AppResult, MailConfig};
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use super::{Notification, Notifier};

/// `X-Priority` header; 1 is highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XPriority(u8);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().parse()?))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.to_string())
    }
}

/// Sends notifications through an authenticated SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport from mail settings. Fails with a config error when
    /// credentials or the sender address are missing.
    pub fn from_config(config: &MailConfig) -> AppResult<Self> {
        config.validate()?;

        let (user, password, from) = match (
            config.smtp_user.as_deref(),
            config.smtp_password.as_deref(),
            config.smtp_from.as_deref(),
        ) {
            (Some(u), Some(p), Some(f)) => (u, p, f),
            _ => return Err(AppError::Config("SMTP credentials incomplete".to_string())),
        };

        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid SMTP_FROM: {}", e)))?;
        let credentials = Credentials::new(user.to_string(), password.to_string());
        let host = config.smtp_host.as_str();
        let port = config.smtp_port;

        let mailer = if config.smtp_tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Config(format!("Invalid SMTP relay {}: {}", host, e)))?;
            tracing::info!(host = %host, port = port, "Mail transport initialized (SMTP with STARTTLS)");
            b.port(port).credentials(credentials).build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host);
            tracing::info!(host = %host, port = port, "Mail transport initialized (SMTP)");
            b.port(port).credentials(credentials).build()
        };

        Ok(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    /// Render a notification into a MIME message.
    pub fn build_message(&self, notification: &Notification) -> AppResult<Message> {
        let to: Mailbox = notification.recipient.parse().map_err(|e| {
            AppError::Config(format!(
                "Invalid recipient address {}: {}",
                notification.recipient, e
            ))
        })?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.clone());
        if notification.high_priority {
            builder = builder.header(XPriority(1));
        }

        let message = if notification.attachments.is_empty() {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(notification.body.clone())
        } else {
            let octet_stream = ContentType::parse("application/octet-stream")
                .map_err(|e| AppError::Config(e.to_string()))?;

            let mut multipart =
                MultiPart::mixed().singlepart(SinglePart::plain(notification.body.clone()));
            for attachment in &notification.attachments {
                multipart = multipart.singlepart(
                    MailAttachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), octet_stream.clone()),
                );
            }
            builder.multipart(multipart)
        };

        message.map_err(|e| AppError::Config(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[tracing::instrument(skip(self, notification), fields(recipient = %notification.recipient, attachments = notification.attachments.len()))]
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        let message = self.build_message(notification)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::Transport(format!("SMTP delivery failed: {}", e)))?;

        tracing::info!(subject = %notification.subject, "Notification sent");
        Ok(())
    }
}
