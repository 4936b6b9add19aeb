//! Notification recipient list.
//!
//! The backing source (a published spreadsheet script) returns a JSON array
//! of strings whose first element is the column header.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Source of the current recipient list. Never fails: errors are logged and
/// yield an empty list.
#[async_trait]
pub trait RecipientSource: Send + Sync {
    async fn fetch_recipients(&self) -> Vec<String>;
}

/// HTTP recipient resolver.
#[derive(Debug, Clone)]
pub struct RecipientResolver {
    client: reqwest::Client,
    url: Url,
}

impl RecipientResolver {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch_list(&self) -> Result<Vec<String>, reqwest::Error> {
        self.client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<String>>()
            .await
    }
}

#[async_trait]
impl RecipientSource for RecipientResolver {
    async fn fetch_recipients(&self) -> Vec<String> {
        match self.fetch_list().await {
            Ok(list) => {
                let recipients = drop_header(list);
                debug!("Fetched {} recipients", recipients.len());
                recipients
            }
            Err(e) => {
                error!("Error fetching email list: {}", e);
                Vec::new()
            }
        }
    }
}

/// Drop the header row. Index 0 is always discarded.
pub fn drop_header(mut list: Vec<String>) -> Vec<String> {
    if !list.is_empty() {
        list.remove(0);
    }
    list
}
