//! Cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCacheStatsSnapshot {
    /// Requests answered by the memory tier.
    pub memory_hits: u64,
    /// Loads answered by the disk tier.
    pub disk_hits: u64,
    /// Disk lookups that found nothing usable (absent or unreadable).
    pub disk_misses: u64,
    /// Disk entries that failed to decode.
    pub corrupt_disk_entries: u64,
    /// Fetcher invocations.
    pub fetches: u64,
    /// Loads that ended in an error after reaching the fetcher.
    pub failed_loads: u64,
    /// Requests that joined a load already in flight.
    pub coalesced_requests: u64,
    /// Disk writes that failed and were skipped.
    pub disk_write_failures: u64,
    /// Calls to `clear_cache`.
    pub clears: u64,
}

/// Relaxed counters; observability only.
#[derive(Debug, Default)]
pub struct ImageCacheStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    disk_misses: AtomicU64,
    corrupt_disk_entries: AtomicU64,
    fetches: AtomicU64,
    failed_loads: AtomicU64,
    coalesced_requests: AtomicU64,
    disk_write_failures: AtomicU64,
    clears: AtomicU64,
}

impl ImageCacheStats {
    pub(crate) fn on_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_disk_miss(&self) {
        self.disk_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_corrupt_disk_entry(&self) {
        self.corrupt_disk_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_failed_load(&self) {
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_coalesced(&self) {
        self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_disk_write_failure(&self) {
        self.disk_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> ImageCacheStatsSnapshot {
        ImageCacheStatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            disk_misses: self.disk_misses.load(Ordering::Relaxed),
            corrupt_disk_entries: self
                .corrupt_disk_entries
                .load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
            coalesced_requests: self
                .coalesced_requests
                .load(Ordering::Relaxed),
            disk_write_failures: self
                .disk_write_failures
                .load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}
