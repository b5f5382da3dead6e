//! Error taxonomy shared by every tier.

use thiserror::Error;

/// Every failure the image cache can surface.
///
/// Messages are carried as strings so the error stays `Clone`: all callers
/// coalesced on one key receive the same settled outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageCacheError {
    /// The identifier cannot be used as a fetch target.
    #[error("Invalid image identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Network-level failure (unreachable, timeout, reset).
    #[error("Transport failure: {0}")]
    TransportFailed(String),

    /// The remote answered outside the 2xx range.
    #[error("Unexpected HTTP status: {0}")]
    BadStatus(u16),

    /// Bytes could not be decoded into an image, or were empty.
    #[error("Invalid image data: {0}")]
    InvalidData(String),

    /// No disk entry exists for the key.
    #[error("Disk cache entry not found: {0}")]
    DiskNotFound(String),

    /// I/O fault while reading a disk entry.
    #[error("Disk cache read failed: {0}")]
    DiskReadFailed(String),

    /// I/O fault while writing a disk entry (disk full, permissions).
    #[error("Disk cache write failed: {0}")]
    DiskWriteFailed(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImageCacheError {
    /// Whether repeating the same request may succeed.
    ///
    /// The cache never retries on its own; this only informs callers that
    /// offer an explicit retry affordance.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportFailed(_) => true,
            Self::BadStatus(code) => (500..600).contains(code),
            _ => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ImageCacheError>;
