//! Cache key derivation.

use std::fmt;

use sha2::{Digest, Sha256};

/// Stable key for locating an image in either cache tier.
///
/// The key doubles as the disk file name, so it only ever contains
/// lowercase hex digits.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// The hex digest, also used as the disk file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.0).finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a resource identifier.
///
/// SHA-256 of the identifier's UTF-8 bytes, hex encoded. The digest is
/// stable across processes, so disk entries survive restarts.
pub fn derive_key(identifier: &str) -> CacheKey {
    let digest = Sha256::digest(identifier.as_bytes());
    CacheKey(hex::encode(digest))
}
