//! Bounded retry with a fixed delay.

use crate::error::FetchError;
use crate::tvl::MetricSource;
use std::time::Duration;
use tracing::error;

/// How often and how patiently to retry a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after each failed transport attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Classified result of a single attempt.
#[derive(Debug)]
enum Attempt {
    Success(f64),
    Retryable(FetchError),
    Terminal(FetchError),
}

impl From<Result<f64, FetchError>> for Attempt {
    fn from(result: Result<f64, FetchError>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(e) if e.is_transient() => Attempt::Retryable(e),
            Err(e) => Attempt::Terminal(e),
        }
    }
}

/// Fetch the TVL, retrying transport failures up to `policy.attempts()` times.
///
/// Format errors are returned immediately. Exhaustion yields
/// [`FetchError::ExhaustedRetries`].
pub async fn fetch_with_retry<S>(source: &S, policy: &RetryPolicy) -> Result<f64, FetchError>
where
    S: MetricSource + ?Sized,
{
    let attempts = policy.attempts();

    for attempt in 1..=attempts {
        match Attempt::from(source.fetch_tvl().await) {
            Attempt::Success(value) => return Ok(value),
            Attempt::Terminal(e) => return Err(e),
            Attempt::Retryable(e) => {
                error!("Attempt {} failed to fetch TVL: {}", attempt, e);
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    Err(FetchError::ExhaustedRetries { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results, then fails with a transport error.
    struct Scripted {
        results: Mutex<VecDeque<Result<f64, FetchError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(results: Vec<Result<f64, FetchError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricSource for Scripted {
        async fn fetch_tvl(&self) -> Result<f64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("connection refused".into())))
        }
    }

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let source = Scripted::new(vec![Ok(10.0)]);
        assert_eq!(fetch_with_retry(&source, &instant(3)).await.unwrap(), 10.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transport_errors() {
        let source = Scripted::new(vec![
            Err(FetchError::Transport("timeout".into())),
            Err(FetchError::Transport("503".into())),
            Ok(99.5),
        ]);
        assert_eq!(fetch_with_retry(&source, &instant(3)).await.unwrap(), 99.5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let source = Scripted::new(vec![]);
        let err = fetch_with_retry(&source, &instant(4)).await.unwrap_err();
        assert!(matches!(err, FetchError::ExhaustedRetries { attempts: 4 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_format_error_returns_immediately() {
        let source = Scripted::new(vec![
            Err(FetchError::Format("'tvl' field is missing".into())),
            Ok(1.0),
        ]);
        let err = fetch_with_retry(&source, &instant(3)).await.unwrap_err();
        assert!(matches!(err, FetchError::Format(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let source: Box<dyn MetricSource> = Box::new(Scripted::new(vec![Ok(5.0)]));
        assert_eq!(fetch_with_retry(source.as_ref(), &instant(1)).await.unwrap(), 5.0);
    }
}
