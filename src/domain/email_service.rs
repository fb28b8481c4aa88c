//! Email notification delivery.
//!
//! Delivery is best-effort everywhere in this crate: callers log a failed
//! send and move on, they never abort the operation that triggered it.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Sends a notification to a single recipient, optionally with a file
/// attachment. Implemented by the SMTP transport in production and by a
/// recording fake in tests.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
        }
    }
}

impl EmailConfig {
    /// The transport can only be built once credentials and sender exist.
    pub fn is_configured(&self) -> bool {
        !self.smtp_server.is_empty() && !self.username.is_empty() && !self.from_email.is_empty()
    }
}

pub struct SmtpNotifier {
    config: EmailConfig,
    transport: Option<SmtpTransport>,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        info!(
            "Initializing email transport for SMTP server: {}:{}",
            self.config.smtp_server, self.config.smtp_port
        );

        let tls_params = TlsParameters::new(self.config.smtp_server.clone())
            .context("Failed to create TLS parameters")?;

        let transport = SmtpTransport::relay(&self.config.smtp_server)
            .context("Failed to create SMTP relay")?
            .port(self.config.smtp_port)
            .tls(Tls::Required(tls_params))
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        self.transport = Some(transport);
        info!("Email transport initialized successfully");
        Ok(())
    }
}

impl Notifier for SmtpNotifier {
    fn send(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<()> {
        let transport = match self.transport.as_ref() {
            Some(transport) => transport,
            None => {
                info!("Email transport not configured, skipping notification to {}", to_email);
                return Ok(());
            }
        };

        let builder = Message::builder()
            .from(
                self.config
                    .from_email
                    .parse::<Mailbox>()
                    .context("Failed to parse from email")?,
            )
            .to(to_email
                .parse::<Mailbox>()
                .context("Failed to parse recipient email")?)
            .subject(subject);

        let email = match attachment {
            Some(path) => {
                let contents = std::fs::read(path)
                    .with_context(|| format!("Failed to read attachment {}", path.display()))?;
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("attachment.txt")
                    .to_string();
                builder
                    .multipart(
                        MultiPart::mixed()
                            .singlepart(SinglePart::plain(body.to_string()))
                            .singlepart(
                                Attachment::new(filename)
                                    .body(contents, ContentType::TEXT_PLAIN),
                            ),
                    )
                    .context("Failed to build email with attachment")?
            }
            None => builder
                .body(body.to_string())
                .context("Failed to build email")?,
        };

        transport.send(&email).context("Failed to send email")?;
        info!("Notification email sent to {}", to_email);
        Ok(())
    }
}
