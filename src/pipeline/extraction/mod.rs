pub mod types;
pub mod pdf;
pub mod pdf_renderer;
pub mod resolve;
pub mod preprocess;
pub mod ocr;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use types::*;
pub use pdf::*;
pub use pdf_renderer::*;
pub use resolve::*;
pub use preprocess::*;
pub use ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open PDF {path}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },

    #[error("Failed to read page {page}: {reason}")]
    PageFetch { page: u32, reason: String },

    #[error("Rasterizer timed out after {timeout:?} on page {page}")]
    RasterizationTimeout { page: u32, timeout: Duration },

    #[error("Failed to spawn rasterizer {program}: {source}")]
    RasterizationSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rasterizer exited with {code:?} on page {page}: {stderr}")]
    RasterizationExit {
        page: u32,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Converted image for page {page} not found in {dir}")]
    OutputFileNotFound { page: u32, dir: PathBuf },

    #[error("Grayscale conversion of {path} timed out after {timeout:?}")]
    PreprocessTimeout { path: PathBuf, timeout: Duration },

    #[error("Image processing error: {0}")]
    Preprocess(String),

    #[error("OCR timed out after {0:?}")]
    OcrTimeout(Duration),

    #[error("OCR engine error: {0}")]
    OcrEngine(String),
}

impl ExtractionError {
    /// Errors that end the whole run rather than degrading a single page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DocumentOpen { .. })
    }
}
