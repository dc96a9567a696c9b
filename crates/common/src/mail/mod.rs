//! Outbound email
//!
//! Provides a unified interface for mail backends:
//! - SMTP (lettre)
//! - Console (writes the message to the log)
//! - In-memory (keeps sent messages, for tests)

use crate::config::MailConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, Mutex};

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Trait for mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;

    /// Get the backend name
    fn backend_name(&self) -> &str;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let host = config.smtp_host.as_deref().ok_or_else(|| AppError::Configuration {
            message: "mail.smtp_host is required for the smtp backend".to_string(),
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Configuration {
                message: format!("Invalid SMTP relay {}: {}", host, e),
            })?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&config.from_address)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject)
            .body(message.body)
            .map_err(|e| AppError::Internal {
                message: format!("Failed to build email: {}", e),
            })?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("SMTP delivery failed: {}", e),
            })?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "smtp"
    }
}

/// Logs messages instead of delivering them
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email (console backend)"
        );
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "console"
    }
}

/// Keeps every message it is asked to send
#[derive(Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<MailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|e| AppError::InvalidFormat {
        message: format!("Invalid email address {}: {}", address, e),
    })
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.backend.as_str() {
        "smtp" => Ok(Arc::new(SmtpMailer::new(config)?)),
        "console" => Ok(Arc::new(ConsoleMailer)),
        "memory" => Ok(Arc::new(MemoryMailer::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown mail backend: {}", other),
        }),
    }
}

/// Email a signup confirmation code. Delivery failures are logged and
/// otherwise ignored.
pub async fn send_confirmation_code(mailer: &dyn Mailer, to: &str, code: &str) {
    let message = MailMessage {
        to: to.to_string(),
        subject: "Welcome to YaMDb!".to_string(),
        body: format!("Your confirmation code: {}", code),
    };

    if let Err(e) = mailer.send(message).await {
        tracing::warn!(
            error = %e,
            backend = mailer.backend_name(),
            "Failed to send confirmation code"
        );
    }
}
