//! Cache configuration: defaults, JSON file, environment overrides.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{CACHE_DIR_NAME, DEFAULT_MEMORY_CAPACITY},
    codec::DEFAULT_JPEG_QUALITY,
    error::{ImageCacheError, Result},
};

/// Overrides [`ImageCacheConfig::cache_dir`].
pub const ENV_CACHE_DIR: &str = "RECIPE_IMAGES_CACHE_DIR";
/// Overrides [`ImageCacheConfig::memory_capacity`].
pub const ENV_MEMORY_CAPACITY: &str = "RECIPE_IMAGES_MEMORY_CAPACITY";
/// Overrides [`ImageCacheConfig::jpeg_quality`].
pub const ENV_JPEG_QUALITY: &str = "RECIPE_IMAGES_JPEG_QUALITY";
/// Overrides [`ImageCacheConfig::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "RECIPE_IMAGES_REQUEST_TIMEOUT_SECS";
/// Overrides [`ImageCacheConfig::user_agent`].
pub const ENV_USER_AGENT: &str = "RECIPE_IMAGES_USER_AGENT";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for [`ImageCache`](crate::ImageCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCacheConfig {
    /// Directory holding one file per cache key.
    pub cache_dir: PathBuf,
    /// Maximum number of decoded images kept in memory.
    pub memory_capacity: usize,
    /// JPEG quality (1-100) used when re-encoding for disk.
    pub jpeg_quality: u8,
    /// Whole-request timeout for the HTTP fetcher, in seconds.
    pub request_timeout_secs: u64,
    /// `User-Agent` sent with every fetch.
    pub user_agent: String,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: concat!("recipe-images/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "recipe-images")
        .map(|dirs| dirs.cache_dir().join(CACHE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME))
}

impl ImageCacheConfig {
    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImageCacheError::Config(format!("failed to read {path:?}: {e}"))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ImageCacheError::Config(format!("failed to parse {path:?}: {e}"))
        })
    }

    /// Apply `RECIPE_IMAGES_*` overrides resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MEMORY_CAPACITY) {
            self.memory_capacity = parse_env(ENV_MEMORY_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_JPEG_QUALITY) {
            self.jpeg_quality = parse_env(ENV_JPEG_QUALITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs =
                parse_env(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = agent;
        }
        Ok(())
    }

    /// Reject values the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity == 0 {
            return Err(ImageCacheError::Config(
                "memory_capacity must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ImageCacheError::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ImageCacheError::Config(
                "request_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// [`Self::request_timeout_secs`] as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Replace the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Replace the memory tier capacity.
    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// Replace the JPEG quality used for disk copies.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Replace the request timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ImageCacheError::Config(format!("{name} has an invalid value: {raw:?}"))
    })
}
