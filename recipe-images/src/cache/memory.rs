//! In-process tier holding decoded images.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::key::CacheKey;
use crate::codec::ImageRecord;

/// Default number of decoded images held in memory.
pub const DEFAULT_MEMORY_CAPACITY: usize = 100;

/// Bounded key → decoded image map.
///
/// Capacity counts entries, not bytes. When full, the least recently
/// accessed entry is dropped before a new key is inserted.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<LruCache<CacheKey, ImageRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryStore {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Maximum number of entries held at once.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Returns a handle to the cached image and marks it recently used.
    pub fn get(&self, key: &CacheKey) -> Option<ImageRecord> {
        self.entries.lock().get(key).cloned()
    }

    /// Presence check that does not count as an access.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains(key)
    }

    /// Insert or replace `key`, evicting the least recently used entry when
    /// a new key would exceed capacity.
    pub fn put(&self, key: CacheKey, record: ImageRecord) {
        if let Some((evicted, _)) = self.entries.lock().push(key.clone(), record)
            && evicted != key
        {
            tracing::trace!("memory cache evicted key={evicted}");
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
