use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// One page of an opened PDF, with its embedded text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page index.
    pub number: u32,
    /// Text-layer fragments in content-stream order.
    pub fragments: Vec<String>,
}

impl Page {
    pub fn new(number: u32, fragments: Vec<String>) -> Self {
        Self { number, fragments }
    }

    /// A page whose text layer could not be read.
    pub fn empty(number: u32) -> Self {
        Self {
            number,
            fragments: Vec::new(),
        }
    }

    /// Character count of all fragments concatenated without separator.
    pub fn text_len(&self) -> usize {
        self.fragments.iter().map(|f| f.chars().count()).sum()
    }

    /// Native text as rendered into the output: fragments joined by a space.
    pub fn native_text(&self) -> String {
        self.fragments.join(" ")
    }
}

/// How a page's final text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSource {
    Native,
    Ocr,
    OcrFallbackNative,
}

impl PageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ocr => "ocr",
            Self::OcrFallbackNative => "ocr-fallback-native",
        }
    }
}

/// Final content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_number: u32,
    pub text: String,
    pub source: PageSource,
}

impl PageResult {
    pub fn native(page: &Page) -> Self {
        Self {
            page_number: page.number,
            text: page.native_text(),
            source: PageSource::Native,
        }
    }

    pub fn ocr(page_number: u32, text: String) -> Self {
        Self {
            page_number,
            text,
            source: PageSource::Ocr,
        }
    }

    pub fn fallback(page: &Page) -> Self {
        Self {
            page_number: page.number,
            text: page.native_text(),
            source: PageSource::OcrFallbackNative,
        }
    }

    /// Page marker line. Only the OCR path is flagged.
    pub fn header(&self) -> String {
        match self.source {
            PageSource::Ocr => format!("--- Page {} (OCR) ---", self.page_number),
            PageSource::Native | PageSource::OcrFallbackNative => {
                format!("--- Page {} ---", self.page_number)
            }
        }
    }
}

/// Ordered per-page results of one run; renders to the linear text stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocumentText {
    pub pages: Vec<PageResult>,
}

impl ExtractedDocumentText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.source == PageSource::Ocr)
            .count()
    }

    pub fn fallback_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.source == PageSource::OcrFallbackNative)
            .count()
    }
}

impl fmt::Display for ExtractedDocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            write!(f, "{}\n{}\n\n", page.header(), page.text)?;
        }
        Ok(())
    }
}

/// Inputs for rasterizing a single page.
#[derive(Debug, Clone)]
pub struct RasterizationJob {
    pub pdf_path: PathBuf,
    pub page_number: u32,
    pub out_dir: PathBuf,
    pub prefix: String,
    pub dpi: u32,
    pub timeout: Duration,
}

impl RasterizationJob {
    /// Path prefix handed to the rasterizer (`<out_dir>/<prefix>`).
    pub fn output_root(&self) -> PathBuf {
        self.out_dir.join(&self.prefix)
    }
}

/// Captured streams of a rasterizer run that exited successfully.
#[derive(Debug, Clone, Default)]
pub struct RasterOutcome {
    pub stdout: String,
    pub stderr: String,
}

/// Opens PDF documents (allows mocking for tests)
pub trait DocumentLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, ExtractionError>;
}

/// An opened PDF.
pub trait PdfDocument: Send {
    fn page_count(&self) -> u32;

    /// Fetch a page by 1-based index.
    fn page(&self, number: u32) -> Result<Page, ExtractionError>;
}

/// Converts one PDF page into an image file inside `job.out_dir`.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, job: &RasterizationJob) -> Result<RasterOutcome, ExtractionError>;
}

/// Normalizes a raster image for OCR.
#[async_trait]
pub trait ImagePreprocessor: Send + Sync {
    /// Path the preprocessed image will be written to for `input`.
    fn output_path(&self, input: &Path) -> PathBuf;

    async fn to_grayscale(&self, input: &Path, timeout: Duration)
        -> Result<PathBuf, ExtractionError>;
}

/// OCR engine capability. One instance serves a single recognition and is
/// released afterwards.
#[async_trait]
pub trait OcrEngine: Send {
    async fn load(&mut self, languages: &[String]) -> Result<(), ExtractionError>;

    async fn recognize(&mut self, image: &Path) -> Result<String, ExtractionError>;

    async fn release(&mut self) -> Result<(), ExtractionError>;
}

/// Produces a fresh OCR engine per invocation.
pub trait OcrEngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn OcrEngine>;
}
