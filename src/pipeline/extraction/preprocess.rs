//! Grayscale normalization of rasterized pages before OCR.
//!
//! Decoding and conversion run on the blocking pool under a deadline. The
//! converted image is encoded in memory and only written to disk once the
//! conversion finished in time, so a timed-out conversion leaves no file.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, ImageOutputFormat};
use tracing::debug;

use super::types::ImagePreprocessor;
use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// A 300 DPI A4 page is well under this; larger input is corrupt or hostile.
const MAX_IMAGE_BYTES: u64 = 200 * 1024 * 1024;

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: u64 = 67;

/// Suffix inserted before the extension of the converted image.
pub const GRAYSCALE_SUFFIX: &str = "_gray";

// ═══════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════

/// Converts raster images to 8-bit grayscale with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrayscaleConverter;

#[async_trait]
impl ImagePreprocessor for GrayscaleConverter {
    fn output_path(&self, input: &Path) -> PathBuf {
        grayscale_path(input)
    }

    async fn to_grayscale(
        &self,
        input: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, ExtractionError> {
        let output = grayscale_path(input);
        let source = input.to_path_buf();
        let target = output.clone();

        let task = tokio::task::spawn_blocking(move || encode_grayscale(&source, &target));

        let bytes = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => {
                return Err(ExtractionError::Preprocess(format!(
                    "Grayscale task failed: {join}"
                )))
            }
            Err(_) => {
                return Err(ExtractionError::PreprocessTimeout {
                    path: input.to_path_buf(),
                    timeout,
                })
            }
        };

        tokio::fs::write(&output, &bytes).await.map_err(|e| {
            ExtractionError::Preprocess(format!("Failed to write {}: {e}", output.display()))
        })?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            bytes = bytes.len(),
            "Grayscale image written"
        );

        Ok(output)
    }
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions
// ═══════════════════════════════════════════════════════════

/// `dir/page-1.png` -> `dir/page-1_gray.png`. Inputs without an extension get
/// a `.png` one.
pub fn grayscale_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "png".to_string());
    input.with_file_name(format!("{stem}{GRAYSCALE_SUFFIX}.{extension}"))
}

/// Reject clearly invalid input before decoding.
fn validate_image_size(path: &Path) -> Result<(), ExtractionError> {
    let size = std::fs::metadata(path)
        .map_err(|e| ExtractionError::Preprocess(format!("Cannot read {}: {e}", path.display())))?
        .len();
    if size < MIN_IMAGE_BYTES {
        return Err(ExtractionError::Preprocess(
            "Image data too small to be valid".into(),
        ));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ExtractionError::Preprocess(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Decode `source`, convert to grayscale and encode in the format implied by
/// `target`'s extension (PNG when unknown).
fn encode_grayscale(source: &Path, target: &Path) -> Result<Vec<u8>, ExtractionError> {
    validate_image_size(source)?;

    let img = image::open(source)
        .map_err(|e| ExtractionError::Preprocess(format!("Failed to decode image: {e}")))?;
    let gray = img.grayscale();

    let format = ImageFormat::from_path(target).unwrap_or(ImageFormat::Png);
    let mut cursor = Cursor::new(Vec::new());
    gray.write_to(&mut cursor, ImageOutputFormat::from(format))
        .map_err(|e| ExtractionError::Preprocess(format!("Encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::fixtures::write_png;

    #[test]
    fn grayscale_path_inserts_suffix() {
        assert_eq!(
            grayscale_path(Path::new("/tmp/run/page-1.png")),
            PathBuf::from("/tmp/run/page-1_gray.png")
        );
        assert_eq!(
            grayscale_path(Path::new("/tmp/run/page-1.PNG")),
            PathBuf::from("/tmp/run/page-1_gray.PNG")
        );
        assert_eq!(
            grayscale_path(Path::new("/tmp/run/page")),
            PathBuf::from("/tmp/run/page_gray.png")
        );
    }

    #[tokio::test]
    async fn converts_png_to_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page-1.png");
        write_png(&input);

        let output = GrayscaleConverter
            .to_grayscale(&input, Duration::from_secs(20))
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("page-1_gray.png"));
        let decoded = image::open(&output).unwrap();
        let rgb = decoded.to_rgb8();
        let pixel = rgb.get_pixel(0, 0);
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }

    #[tokio::test]
    async fn corrupt_input_is_preprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page-1.png");
        std::fs::write(&input, vec![0u8; 512]).unwrap();

        let result = GrayscaleConverter
            .to_grayscale(&input, Duration::from_secs(20))
            .await;

        assert!(matches!(result, Err(ExtractionError::Preprocess(_))));
        assert!(!dir.path().join("page-1_gray.png").exists());
    }

    #[tokio::test]
    async fn tiny_input_is_rejected_before_decode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page-1.png");
        std::fs::write(&input, b"png").unwrap();

        let result = GrayscaleConverter
            .to_grayscale(&input, Duration::from_secs(20))
            .await;

        assert!(matches!(result, Err(ExtractionError::Preprocess(_))));
    }

    #[tokio::test]
    async fn missing_input_is_preprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GrayscaleConverter
            .to_grayscale(&dir.path().join("absent.png"), Duration::from_secs(20))
            .await;
        assert!(matches!(result, Err(ExtractionError::Preprocess(_))));
    }

    #[tokio::test]
    async fn zero_timeout_reports_timeout_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page-1.png");
        // Large enough that decoding cannot finish before the first poll.
        image::RgbImage::from_fn(2000, 2000, |x, y| image::Rgb([x as u8, y as u8, 90]))
            .save(&input)
            .unwrap();

        let result = GrayscaleConverter.to_grayscale(&input, Duration::ZERO).await;

        assert!(matches!(
            result,
            Err(ExtractionError::PreprocessTimeout { .. })
        ));
        assert!(!dir.path().join("page-1_gray.png").exists());
    }
}
