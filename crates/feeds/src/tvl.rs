//! DeFiLlama TVL fetcher.
//!
//! Fetches `GET {base}/protocol/{protocol}` and reads the `tvl` field, which
//! DeFiLlama returns either as a scalar or as a per-period history.

use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A source of the current TVL. One call is one attempt; retries are the
/// caller's concern (see [`crate::fetch_with_retry`]).
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_tvl(&self) -> Result<f64, FetchError>;
}

/// DeFiLlama REST fetcher for a single protocol.
#[derive(Debug, Clone)]
pub struct TvlFetcher {
    client: reqwest::Client,
    endpoint: Url,
    protocol: String,
}

impl TvlFetcher {
    pub const BASE_URL: &'static str = "https://api.llama.fi";
    pub const DEFAULT_PROTOCOL: &'static str = "base-bridge";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Fetcher against the public DeFiLlama API.
    pub fn new(protocol: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_base_url(Self::BASE_URL, protocol)
    }

    /// Fetcher against an alternative host serving the same API.
    pub fn with_base_url(base_url: &str, protocol: impl Into<String>) -> Result<Self, FetchError> {
        Self::build(base_url, protocol.into(), Self::REQUEST_TIMEOUT)
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, ..self })
    }

    fn build(base_url: &str, protocol: String, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint = Url::parse(&format!(
            "{}/protocol/{}",
            base_url.trim_end_matches('/'),
            protocol
        ))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            protocol,
        })
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MetricSource for TvlFetcher {
    async fn fetch_tvl(&self) -> Result<f64, FetchError> {
        debug!("Fetching TVL for {} from {}", self.protocol, self.endpoint);

        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;

        let json: Value = response.json().await?;
        parse_tvl(&json)
    }
}

/// Extract the TVL from a protocol response.
///
/// Accepted shapes of `tvl`, in order:
/// - a number, used directly
/// - a non-empty array of records, the last record's `totalLiquidityUSD`
///   (a number or a numeric string)
pub fn parse_tvl(json: &Value) -> Result<f64, FetchError> {
    let tvl = json
        .get("tvl")
        .ok_or_else(|| FetchError::Format("'tvl' field is missing".to_string()))?;

    match tvl {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::Format(format!("Unexpected 'tvl' format: {}", n))),
        Value::Array(entries) if !entries.is_empty() => {
            let latest = &entries[entries.len() - 1];
            latest
                .as_object()
                .and_then(|entry| entry.get("totalLiquidityUSD"))
                .and_then(|value| match value {
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    other => other.as_f64(),
                })
                .ok_or_else(|| {
                    FetchError::Format(format!("Unexpected TVL entry format: {}", latest))
                })
        }
        other => Err(FetchError::Format(format!(
            "Unexpected 'tvl' format: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{fetch_with_retry, RetryPolicy};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROTOCOL_PATH: &str = "/protocol/base-bridge";

    fn fetcher_for(server: &MockServer) -> TvlFetcher {
        TvlFetcher::with_base_url(&server.uri(), "base-bridge").unwrap()
    }

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    async fn hits(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_tvl(&json!({"tvl": 1234.5})).unwrap(), 1234.5);
        assert_eq!(parse_tvl(&json!({"tvl": 42})).unwrap(), 42.0);
    }

    #[test]
    fn test_parse_history_uses_last_entry() {
        let body = json!({
            "tvl": [
                {"date": 1, "totalLiquidityUSD": 1000},
                {"date": 2, "totalLiquidityUSD": 2000}
            ]
        });
        assert_eq!(parse_tvl(&body).unwrap(), 2000.0);
    }

    #[test]
    fn test_parse_history_numeric_string() {
        let body = json!({"tvl": [{"totalLiquidityUSD": "1000"}]});
        assert_eq!(parse_tvl(&body).unwrap(), 1000.0);

        let body = json!({"tvl": [{"totalLiquidityUSD": " 2500.75 "}]});
        assert_eq!(parse_tvl(&body).unwrap(), 2500.75);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        let bad = [
            json!({}),
            json!({"tvl": []}),
            json!({"tvl": "x"}),
            json!({"tvl": null}),
            json!({"tvl": [{"date": 1}]}),
            json!({"tvl": [1000, 2000]}),
            json!({"tvl": [{"totalLiquidityUSD": "lots"}]}),
            json!({"tvl": [{"totalLiquidityUSD": null}]}),
            json!([1, 2, 3]),
        ];
        for body in bad {
            let err = parse_tvl(&body).unwrap_err();
            assert!(matches!(err, FetchError::Format(_)), "{} gave {:?}", body, err);
        }
    }

    #[test]
    fn test_endpoint() {
        let fetcher = TvlFetcher::with_base_url("http://localhost:8080/", "base-bridge").unwrap();
        assert_eq!(
            fetcher.endpoint().as_str(),
            "http://localhost:8080/protocol/base-bridge"
        );
        assert_eq!(
            TvlFetcher::new(TvlFetcher::DEFAULT_PROTOCOL)
                .unwrap()
                .endpoint()
                .as_str(),
            "https://api.llama.fi/protocol/base-bridge"
        );
    }

    #[tokio::test]
    async fn test_fetch_scalar_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tvl": 1234.5})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(fetcher_for(&server).fetch_tvl().await.unwrap(), 1234.5);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tvl": [{"totalLiquidityUSD": 1000}, {"totalLiquidityUSD": 2000}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tvl = fetch_with_retry(&fetcher_for(&server), &instant(3)).await.unwrap();
        assert_eq!(tvl, 2000.0);
        assert_eq!(hits(&server).await, 3);
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = fetch_with_retry(&fetcher_for(&server), &instant(3)).await.unwrap_err();
        assert!(matches!(err, FetchError::ExhaustedRetries { attempts: 3 }));
        assert_eq!(hits(&server).await, 3);
    }

    #[tokio::test]
    async fn test_timeout_is_transport_and_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"tvl": 1.0}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(4)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server)
            .with_timeout(Duration::from_millis(50))
            .unwrap();

        let err = fetcher.fetch_tvl().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "{:?}", err);

        let err = fetch_with_retry(&fetcher, &instant(3)).await.unwrap_err();
        assert!(matches!(err, FetchError::ExhaustedRetries { attempts: 3 }));
        assert_eq!(hits(&server).await, 4);
    }

    #[tokio::test]
    async fn test_format_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROTOCOL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tvl": []})))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetch_with_retry(&fetcher_for(&server), &instant(3)).await.unwrap_err();
        assert!(matches!(err, FetchError::Format(_)));
        assert_eq!(hits(&server).await, 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = TvlFetcher::with_base_url(&format!("http://{}", addr), "base-bridge").unwrap();
        let err = fetcher.fetch_tvl().await.unwrap_err();
        assert!(err.is_transient());
    }
}
