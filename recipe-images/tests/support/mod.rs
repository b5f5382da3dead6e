#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use recipe_images::{
    CacheKey, ClearReport, DiskStore, Fetcher, FsDiskStore, ImageCache,
    ImageCacheConfig, ImageCacheError, Result,
};
use tempfile::TempDir;
use tokio::sync::watch;

/// Encoded PNG with a translucent fill.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([180, 90, 20, 200]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

/// In-memory fetcher answering from a script. Unscripted identifiers get
/// `BadStatus(404)`. A gated fetcher holds every call open until
/// [`ScriptedFetcher::open_gate`].
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Result<Vec<u8>>>>,
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_gate(true))
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self::with_gate(false))
    }

    fn with_gate(open: bool) -> Self {
        let (gate, _) = watch::channel(open);
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate,
        }
    }

    pub fn respond(&self, identifier: &str, response: Result<Vec<u8>>) {
        self.responses
            .lock()
            .insert(identifier.to_string(), response);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let opened = gate.wait_for(|open| *open).await.is_ok();
        assert!(opened, "fetch gate dropped while a fetch was waiting");

        self.responses
            .lock()
            .get(identifier)
            .cloned()
            .unwrap_or(Err(ImageCacheError::BadStatus(404)))
    }
}

/// Filesystem store with switchable read/write faults.
pub struct FaultyDisk {
    inner: FsDiskStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FaultyDisk {
    pub fn new(root: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            inner: FsDiskStore::new(root),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl DiskStore for FaultyDisk {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    async fn ensure_directory(&self) -> Result<()> {
        self.inner.ensure_directory().await
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ImageCacheError::DiskReadFailed(
                "injected read fault".to_string(),
            ));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ImageCacheError::DiskWriteFailed(
                "injected write fault: disk full".to_string(),
            ));
        }
        self.inner.write(key, bytes).await
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key).await
    }

    async fn clear(&self) -> ClearReport {
        self.inner.clear().await
    }
}

pub fn config_in(dir: &TempDir) -> ImageCacheConfig {
    ImageCacheConfig::default().with_cache_dir(dir.path().join("ImageCache"))
}

pub async fn cache_with(fetcher: &Arc<ScriptedFetcher>) -> (TempDir, ImageCache) {
    let dir = TempDir::new().unwrap();
    let cache = ImageCache::with_fetcher(&config_in(&dir), fetcher.clone()).await;
    (dir, cache)
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
