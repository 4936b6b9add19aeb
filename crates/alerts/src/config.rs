//! SMTP configuration.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MailConfigError {
    #[error("Invalid SMTP_PORT: {0}")]
    InvalidPort(String),
}

/// Sender identity and relay for outgoing mail.
#[derive(Clone)]
pub struct MailerConfig {
    /// Sender address, also the SMTP login.
    pub sender: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Connection and command timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerConfig")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MailerConfig {
    pub const DEFAULT_HOST: &'static str = "smtp.gmail.com";
    pub const DEFAULT_PORT: u16 = 465;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(sender: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            password: password.into(),
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Create config from environment variables.
    /// Uses SMTP_EMAIL, SMTP_PASSWORD, SMTP_SERVER and SMTP_PORT.
    ///
    /// Returns `Ok(None)` when the sender credentials are not set.
    pub fn from_env() -> Result<Option<Self>, MailConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MailerConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, MailConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| MailConfigError::InvalidPort(raw))?,
            None => Self::DEFAULT_PORT,
        };

        let (Some(sender), Some(password)) = (non_empty("SMTP_EMAIL"), non_empty("SMTP_PASSWORD"))
        else {
            return Ok(None);
        };

        let mut config = Self::new(sender, password);
        config.port = port;
        if let Some(host) = non_empty("SMTP_SERVER") {
            config.host = host;
        }
        Ok(Some(config))
    }
}
