//! Memory + disk cache for remotely hosted images.
//!
//! ```no_run
//! use recipe_images::{ImageCache, ImageCacheConfig};
//!
//! # async fn run() -> recipe_images::Result<()> {
//! let config = ImageCacheConfig::load(None)?;
//! let cache = ImageCache::open(&config).await?;
//!
//! let image = cache
//!     .get_image("https://example.com/photos/pasta-small.jpg")
//!     .await?;
//! println!("{}x{}", image.width(), image.height());
//!
//! cache.clear_cache().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;

pub use cache::{
    CacheKey, ClearReport, DiskStore, FsDiskStore, ImageCache,
    ImageCacheStats, ImageCacheStatsSnapshot, MemoryStore, derive_key,
};
pub use codec::ImageRecord;
pub use config::ImageCacheConfig;
pub use error::{ImageCacheError, Result};
pub use fetch::{Fetcher, HttpFetcher};
