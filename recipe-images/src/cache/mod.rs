//! Two-tier image cache: decoded images in memory, re-encoded JPEGs on
//! disk, the network behind both.
//!
//! [`ImageCache::get_image`] consults memory, then disk, then the fetcher,
//! populating the earlier tiers on the way back. Concurrent requests for
//! the same key share one load.

pub mod disk;
pub mod key;
pub mod memory;
mod pending;
pub mod stats;

pub use disk::{CACHE_DIR_NAME, ClearReport, DiskStore, FsDiskStore};
pub use key::{CacheKey, derive_key};
pub use memory::{DEFAULT_MEMORY_CAPACITY, MemoryStore};
pub use stats::{ImageCacheStats, ImageCacheStatsSnapshot};

use std::{fmt, path::Path, path::PathBuf, sync::Arc};

use futures::FutureExt;
use tracing::{debug, info, warn};

use self::pending::{PendingRegistry, Role, Ticket};
use crate::{
    codec::{self, ImageRecord},
    config::ImageCacheConfig,
    error::{ImageCacheError, Result},
    fetch::{Fetcher, HttpFetcher, parse_identifier},
};

/// Handle to a shared image cache. Clones refer to the same tiers.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<Inner>,
}

struct Inner {
    memory: MemoryStore,
    disk: Arc<dyn DiskStore>,
    fetcher: Arc<dyn Fetcher>,
    pending: PendingRegistry,
    stats: ImageCacheStats,
    jpeg_quality: u8,
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("cache_dir", &self.inner.disk.root())
            .field("memory", &self.inner.memory)
            .field("pending", &self.inner.pending)
            .field("jpeg_quality", &self.inner.jpeg_quality)
            .finish()
    }
}

impl ImageCache {
    /// Filesystem disk tier at `config.cache_dir`, HTTP fetcher.
    pub async fn open(config: &ImageCacheConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)).await)
    }

    /// Filesystem disk tier at `config.cache_dir` with a caller-supplied
    /// fetcher.
    pub async fn with_fetcher(
        config: &ImageCacheConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let disk = Arc::new(FsDiskStore::new(config.cache_dir.clone()));
        Self::from_parts(config, disk, fetcher).await
    }

    /// Assemble a cache from explicit tiers.
    ///
    /// The disk directory is created here. Failure to create it is logged
    /// and the cache keeps working from memory and network.
    pub async fn from_parts(
        config: &ImageCacheConfig,
        disk: Arc<dyn DiskStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        if let Err(err) = disk.ensure_directory().await {
            warn!("image cache directory unavailable; err={err}");
        }

        Self {
            inner: Arc::new(Inner {
                memory: MemoryStore::new(config.memory_capacity),
                disk,
                fetcher,
                pending: PendingRegistry::default(),
                stats: ImageCacheStats::default(),
                jpeg_quality: config.jpeg_quality,
            }),
        }
    }

    /// Resolve `identifier` to a decoded image.
    ///
    /// Callers may drop the returned future at any point; a load already
    /// started keeps running and populates both tiers.
    pub async fn get_image(&self, identifier: &str) -> Result<ImageRecord> {
        parse_identifier(identifier)?;
        let key = derive_key(identifier);

        if let Some(record) = self.inner.memory.get(&key) {
            self.inner.stats.on_memory_hit();
            return Ok(record);
        }

        let (load, role) = self.inner.pending.join_or_start(&key, |ticket| {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            let identifier = identifier.to_owned();

            let task = tokio::spawn(async move {
                let settle = SettleOnDrop { inner, key, ticket };
                settle.inner.load(&settle.key, &identifier).await
            });

            async move {
                task.await.unwrap_or_else(|err| {
                    Err(ImageCacheError::Internal(format!(
                        "image load task: {err}"
                    )))
                })
            }
            .boxed()
        });

        if role == Role::Follower {
            debug!("joined in-flight image load; key={key}");
            self.inner.stats.on_coalesced();
        }

        load.await
    }

    /// Empty the memory tier, then delete every file in the disk tier.
    ///
    /// Loads already in flight are not cancelled and may repopulate both
    /// tiers once they finish.
    pub async fn clear_cache(&self) -> ClearReport {
        self.inner.memory.clear();
        let report = self.inner.disk.clear().await;
        self.inner.stats.on_clear();
        info!(
            "image cache cleared; removed={}, failed={}",
            report.removed, report.failed
        );
        report
    }

    /// Point-in-time copy of the counters.
    pub fn stats(&self) -> ImageCacheStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// The memory tier.
    pub fn memory(&self) -> &MemoryStore {
        &self.inner.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &dyn DiskStore {
        self.inner.disk.as_ref()
    }

    /// Directory backing the disk tier.
    pub fn cache_dir(&self) -> &Path {
        self.inner.disk.root()
    }

    /// Where the disk copy for `identifier` lives, whether or not it exists.
    pub fn cache_file_path(&self, identifier: &str) -> PathBuf {
        self.inner.disk.path_for(&derive_key(identifier))
    }

    /// Number of keys with a load currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }
}

/// Removes the registry slot when the load task ends, including by panic.
struct SettleOnDrop {
    inner: Arc<Inner>,
    key: CacheKey,
    ticket: Ticket,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.inner.pending.settle(&self.key, self.ticket);
    }
}

impl Inner {
    async fn load(&self, key: &CacheKey, identifier: &str) -> Result<ImageRecord> {
        // Another load may have finished between the caller's check and
        // this task starting.
        if let Some(record) = self.memory.get(key) {
            self.stats.on_memory_hit();
            return Ok(record);
        }

        if let Some(record) = self.load_from_disk(key).await {
            self.memory.put(key.clone(), record.clone());
            return Ok(record);
        }

        let record = match self.fetch_and_decode(identifier).await {
            Ok(record) => record,
            Err(err) => {
                self.stats.on_failed_load();
                debug!("image load failed; key={key}, err={err}");
                return Err(err);
            }
        };

        self.persist(key, &record).await;
        self.memory.put(key.clone(), record.clone());
        Ok(record)
    }

    /// Disk faults and undecodable entries fall through to the network.
    async fn load_from_disk(&self, key: &CacheKey) -> Option<ImageRecord> {
        let bytes = match self.disk.read(key).await {
            Ok(bytes) => bytes,
            Err(ImageCacheError::DiskNotFound(_)) => {
                self.stats.on_disk_miss();
                return None;
            }
            Err(err) => {
                warn!("image disk read failed; key={key}, err={err}");
                self.stats.on_disk_miss();
                return None;
            }
        };

        match codec::decode_blocking(bytes).await {
            Ok(record) => {
                self.stats.on_disk_hit();
                Some(record)
            }
            Err(err) => {
                warn!("corrupted image cache entry; key={key}, err={err}");
                self.stats.on_corrupt_disk_entry();
                None
            }
        }
    }

    async fn fetch_and_decode(&self, identifier: &str) -> Result<ImageRecord> {
        self.stats.on_fetch();
        let bytes = self.fetcher.fetch(identifier).await?;
        codec::decode_blocking(bytes).await
    }

    /// Best effort; a failed write never fails the load.
    async fn persist(&self, key: &CacheKey, record: &ImageRecord) {
        let written = match codec::encode_blocking(
            record.clone(),
            self.jpeg_quality,
        )
        .await
        {
            Ok(bytes) => self.disk.write(key, &bytes).await,
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            warn!("failed to write image to disk cache; key={key}, err={err}");
            self.stats.on_disk_write_failure();
        }
    }
}
