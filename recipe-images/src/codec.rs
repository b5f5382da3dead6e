//! Decoding fetched bytes into images and re-encoding them for disk.
//!
//! Both directions are CPU bound, so the async helpers push the work onto
//! tokio's blocking pool.

use std::{fmt, sync::Arc};

use image::{DynamicImage, codecs::jpeg::JpegEncoder};

use crate::error::{ImageCacheError, Result};

/// JPEG quality used when re-encoding images for the disk tier.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A decoded image held by the memory tier.
///
/// Cloning is cheap and yields an immutable handle to the same pixels.
#[derive(Clone)]
pub struct ImageRecord {
    image: Arc<DynamicImage>,
    byte_size: usize,
}

impl ImageRecord {
    /// Wrap a decoded image, recording its pixel buffer size.
    pub fn new(image: DynamicImage) -> Self {
        let byte_size = image.as_bytes().len();
        Self {
            image: Arc::new(image),
            byte_size,
        }
    }

    /// Shared, immutable handle to the pixels.
    pub fn image(&self) -> &Arc<DynamicImage> {
        &self.image
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Size of the decoded pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// True when both records share the same decoded buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRecord")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("byte_size", &self.byte_size)
            .finish()
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into a record.
pub fn decode_image(bytes: &[u8]) -> Result<ImageRecord> {
    if bytes.is_empty() {
        return Err(ImageCacheError::InvalidData(
            "empty image payload".to_string(),
        ));
    }

    image::load_from_memory(bytes)
        .map(ImageRecord::new)
        .map_err(|e| ImageCacheError::InvalidData(e.to_string()))
}

/// Re-encode a record as JPEG at the given quality.
///
/// JPEG has no alpha channel; transparent pixels are flattened to RGB.
pub fn encode_for_disk(record: &ImageRecord, quality: u8) -> Result<Vec<u8>> {
    let rgb = record.image.to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(&rgb).map_err(|e| {
        ImageCacheError::InvalidData(format!("jpeg re-encode failed: {e}"))
    })?;
    Ok(buffer)
}

pub(crate) async fn decode_blocking(bytes: Vec<u8>) -> Result<ImageRecord> {
    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| ImageCacheError::Internal(format!("decode task: {e}")))?
}

pub(crate) async fn encode_blocking(
    record: ImageRecord,
    quality: u8,
) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_for_disk(&record, quality))
        .await
        .map_err(|e| ImageCacheError::Internal(format!("encode task: {e}")))?
}
