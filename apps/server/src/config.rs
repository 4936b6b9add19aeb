//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tvl_alerts::{MailConfigError, MailerConfig};
use tvl_feeds::{RetryPolicy, TvlFetcher};
use url::Url;

/// Environment variable holding the recipient list URL.
pub const RECIPIENTS_URL_VAR: &str = "APPS_SCRIPT_API_URL";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not defined in the environment variables.")]
    MissingVar(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
    #[error(transparent)]
    Mail(#[from] MailConfigError),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Recipient list endpoint.
    pub recipients_url: Url,
    /// DeFiLlama protocol slug.
    pub protocol: String,
    /// Persisted state location.
    pub state_file: PathBuf,
    /// Delay between cycles.
    pub poll_interval: Duration,
    /// Retry policy for every TVL fetch.
    pub retry: RetryPolicy,
    /// Replaces the persisted threshold when set.
    pub threshold: Option<f64>,
    /// Message log cap. `None` keeps every record.
    pub max_messages: Option<usize>,
    /// SMTP settings. `None` disables email delivery.
    pub mailer: Option<MailerConfig>,
}

impl AppConfig {
    pub const DEFAULT_STATE_FILE: &'static str = "state.json";
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(RECIPIENTS_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(RECIPIENTS_URL_VAR))?;
        let recipients_url = Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidVar {
            name: RECIPIENTS_URL_VAR,
            value: raw.clone(),
        })?;

        Ok(Self {
            recipients_url,
            protocol: TvlFetcher::DEFAULT_PROTOCOL.to_string(),
            state_file: PathBuf::from(Self::DEFAULT_STATE_FILE),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            threshold: None,
            max_messages: None,
            mailer: MailerConfig::from_lookup(&lookup)?,
        })
    }
}
