//! Image inspection for stored uploads
//!
//! Reads pixel dimensions from uploaded files and sniffs MIME types from
//! content when a multipart part carries no usable Content-Type.

use crate::error::{FieldError, FieldResult};
use image::ImageReader;
use std::path::{Path, PathBuf};

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Image inspection utilities
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    /// Creates a new image processor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reads image dimensions from a file on disk
    ///
    /// Only the header is decoded. Runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::ImageMetadata`] if the file cannot be opened or
    /// is not a recognised image.
    pub async fn dimensions(&self, path: &Path) -> FieldResult<Dimensions> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_dimensions(&path))
            .await
            .map_err(|e| FieldError::ImageMetadata(format!("Dimension task failed: {e}")))?
    }

    fn read_dimensions(path: &Path) -> FieldResult<Dimensions> {
        let reader = ImageReader::open(path)
            .map_err(|e| FieldError::ImageMetadata(format!("Failed to open {}: {e}", path.display())))?
            .with_guessed_format()
            .map_err(|e| FieldError::ImageMetadata(format!("Failed to read image: {e}")))?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| FieldError::ImageMetadata(format!("Failed to get dimensions: {e}")))?;

        Ok(Dimensions { width, height })
    }

    /// Detects the MIME type from file content using magic numbers
    ///
    /// Returns `None` if the type cannot be determined.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cms_fields::storage::ImageProcessor;
    ///
    /// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    /// assert_eq!(ImageProcessor::detect_mime(&png), Some("image/png"));
    /// assert_eq!(ImageProcessor::detect_mime(b"plain text"), None);
    /// ```
    #[must_use]
    pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
        infer::get(data).map(|kind| kind.mime_type())
    }
}
