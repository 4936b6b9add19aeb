//! SMTP delivery.

use crate::config::MailerConfig;
use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("No valid recipient addresses")]
    NoRecipients,
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers one plain-text message to a set of recipients.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, to: &[String], subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP transport over implicit TLS, authenticated as the sender.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first delivery.
    pub fn new(config: &MailerConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.sender)?;
        let credentials = Credentials::new(config.sender.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(config.timeout))
            .build();

        Ok(Self { transport, from })
    }

    /// Compose one message with every recipient on the `To` line.
    ///
    /// Addresses that fail to parse are logged and left out.
    pub fn build_message(&self, to: &[String], subject: &str, body: &str) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        let mut valid = 0usize;
        for address in to {
            match parse_mailbox(address) {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    valid += 1;
                }
                Err(e) => warn!("Skipping recipient: {}", e),
            }
        }

        if valid == 0 {
            return Err(MailError::NoRecipients);
        }

        Ok(builder.body(body.to_string())?)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, to: &[String], subject: &str, body: &str) -> Result<(), MailError> {
        let message = self.build_message(to, subject, body)?;
        let response = self.transport.send(message).await?;
        debug!(code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}
