//! On-disk tier: one re-encoded image per file, named by its cache key.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::key::CacheKey;
use crate::error::{ImageCacheError, Result};

/// Name of the cache subdirectory under the platform cache dir.
pub const CACHE_DIR_NAME: &str = "ImageCache";

/// Outcome of a best-effort clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Entries deleted.
    pub removed: usize,
    /// Entries that could not be deleted, plus listing failures.
    pub failed: usize,
}

impl ClearReport {
    /// True when nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Byte-level persistence keyed by [`CacheKey`].
///
/// One entry per key; an entry's existence is its own index. Implementations
/// other than [`FsDiskStore`] exist mostly to inject faults in tests.
#[async_trait]
pub trait DiskStore: Send + Sync {
    /// Directory holding one file per key.
    fn root(&self) -> &Path;

    /// Location of the entry for `key`, whether or not it exists.
    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root().join(key.as_str())
    }

    /// Create the directory if missing. Idempotent.
    async fn ensure_directory(&self) -> Result<()>;

    /// Whole-file read: `DiskNotFound` when absent, `DiskReadFailed` on I/O
    /// faults.
    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>>;

    /// Replace the entry for `key` wholesale.
    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()>;

    /// Whether an entry exists. I/O errors read as absent.
    async fn contains(&self, key: &CacheKey) -> bool;

    /// Delete every entry. Never fails; per-file failures are counted.
    async fn clear(&self) -> ClearReport;
}

/// Filesystem-backed store: `root/<key>`.
#[derive(Clone, Debug)]
pub struct FsDiskStore {
    root: PathBuf,
}

impl FsDiskStore {
    /// Store rooted at `root`. Nothing is created until
    /// [`DiskStore::ensure_directory`] or the first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl DiskStore for FsDiskStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_directory(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            ImageCacheError::DiskWriteFailed(format!(
                "failed to create image cache dir {:?}: {err}",
                self.root
            ))
        })
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ImageCacheError::DiskNotFound(key.to_string())
            } else {
                ImageCacheError::DiskReadFailed(format!("{path:?}: {err}"))
            }
        })
    }

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let root = self.root.clone();
        let path = self.path_for(key);
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || {
            write_replacing(&root, &path, &bytes).map_err(|err| {
                ImageCacheError::DiskWriteFailed(format!("{path:?}: {err}"))
            })
        })
        .await
        .map_err(|e| ImageCacheError::Internal(format!("disk write task: {e}")))?
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false)
    }

    async fn clear(&self) -> ClearReport {
        let report = clear_entries(&self.root, remove_entry).await;
        info!(
            "image disk cache cleared; removed={}, failed={}",
            report.removed, report.failed
        );
        report
    }
}

async fn remove_entry(path: PathBuf, is_dir: bool) -> io::Result<()> {
    if is_dir {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    }
}

/// Remove every entry under `root` with `remove`. A failed removal is
/// counted and the walk continues.
async fn clear_entries<F, Fut>(root: &Path, mut remove: F) -> ClearReport
where
    F: FnMut(PathBuf, bool) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut report = ClearReport::default();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("image cache dir missing; nothing to clear");
            return report;
        }
        Err(err) => {
            warn!(
                "failed to list image cache dir; root={}, err={err}",
                root.display()
            );
            report.failed += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!("image cache dir listing aborted; err={err}");
                report.failed += 1;
                break;
            }
        };

        let path = entry.path();
        let is_dir = entry
            .file_type()
            .await
            .map(|kind| kind.is_dir())
            .unwrap_or(false);

        match remove(path.clone(), is_dir).await {
            Ok(()) => report.removed += 1,
            Err(err) => {
                warn!(
                    "failed to remove cached image; path={}, err={err}",
                    path.display()
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// Write to a temp file in `root`, then rename over `path`.
fn write_replacing(root: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    std::fs::create_dir_all(root)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .suffix(".tmp")
        .tempfile_in(root)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
