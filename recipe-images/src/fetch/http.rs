//! HTTP(S) fetcher.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Fetcher, parse_identifier};
use crate::{
    config::ImageCacheConfig,
    error::{ImageCacheError, Result},
};

/// reqwest-backed fetcher with a pooled client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Client honouring the configured timeout and user agent.
    pub fn new(config: &ImageCacheConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ImageCacheError::TransportFailed(format!(
                    "failed to build HTTP client: {e}"
                ))
            })?;

        Ok(Self { client })
    }

    /// Use a prebuilt client as is.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>> {
        let url = parse_identifier(identifier)?;
        debug!("fetching image; url={url}");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ImageCacheError::TransportFailed(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("image fetch rejected; url={url}, status={status}");
            return Err(ImageCacheError::BadStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageCacheError::TransportFailed(format!("{url}: {e}")))?;

        if bytes.is_empty() {
            return Err(ImageCacheError::InvalidData(format!(
                "empty response body from {url}"
            )));
        }

        Ok(bytes.to_vec())
    }
}
