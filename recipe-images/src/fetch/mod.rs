//! Network retrieval of encoded image bytes.
//!
//! Fetchers are transport-only: they never decode what they download.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use url::Url;

use crate::error::{ImageCacheError, Result};

/// Retrieves raw encoded bytes for a resource identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the bytes behind `identifier`.
    ///
    /// Fails with `InvalidIdentifier` when the identifier is not a
    /// locatable resource, `TransportFailed` on connection errors,
    /// `BadStatus` outside 200–299 and `InvalidData` for an empty body.
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>>;
}

/// Parse an identifier into an http(s) URL.
pub fn parse_identifier(identifier: &str) -> Result<Url> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ImageCacheError::InvalidIdentifier(identifier.to_owned()));
    }

    let url = Url::parse(trimmed).map_err(|_| {
        ImageCacheError::InvalidIdentifier(identifier.to_owned())
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ImageCacheError::InvalidIdentifier(identifier.to_owned())),
    }
}
