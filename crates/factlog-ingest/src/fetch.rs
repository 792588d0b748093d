//! Document retrieval.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use factlog_core::{Error, Result};

const USER_AGENT: &str = concat!("factlog/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw text of a document.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the document at `url`. Unreachable hosts and non-success
    /// statuses are [`Error::Fetch`].
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP(S) fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{}: HTTP {}", url, status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        debug!("Fetched {} ({} bytes)", url, text.len());
        Ok(text)
    }
}
