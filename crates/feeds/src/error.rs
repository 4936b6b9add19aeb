//! Error types for fetch operations.

use thiserror::Error;

/// Errors that can occur while fetching the metric.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout, non-success HTTP status or unreadable body.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response was readable but not in an accepted shape.
    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Failed to fetch TVL after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl FetchError {
    /// Returns true if this error is transient and likely to succeed on retry.
    /// Format errors are not: the same payload would fail the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(FetchError::Transport("timeout".into()).is_transient());
        assert!(!FetchError::Format("tvl missing".into()).is_transient());
        assert!(!FetchError::ExhaustedRetries { attempts: 3 }.is_transient());
    }

    #[test]
    fn test_exhausted_message() {
        let err = FetchError::ExhaustedRetries { attempts: 3 };
        assert_eq!(err.to_string(), "Failed to fetch TVL after 3 attempts");
    }
}
