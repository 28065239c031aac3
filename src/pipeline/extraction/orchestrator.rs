use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use super::ocr::{OcrAdapter, TesseractCliFactory};
use super::pdf::LopdfLoader;
use super::pdf_renderer::PdftoppmRasterizer;
use super::preprocess::GrayscaleConverter;
use super::resolve::resolve_output;
use super::types::{
    DocumentLoader, ExtractedDocumentText, ImagePreprocessor, OcrEngineFactory, Page,
    PageResult, PdfDocument, RasterizationJob, Rasterizer,
};
use super::ExtractionError;
use crate::config::ExtractionConfig;

/// Drives the per-page decision between the native text layer and the
/// rasterize -> grayscale -> OCR path.
/// Uses trait objects for every collaborator, enabling dependency injection.
pub struct PageOrchestrator {
    config: ExtractionConfig,
    loader: Box<dyn DocumentLoader>,
    rasterizer: Box<dyn Rasterizer>,
    preprocessor: Box<dyn ImagePreprocessor>,
    ocr: OcrAdapter,
}

impl PageOrchestrator {
    /// Production wiring: lopdf, `pdftoppm`, the `image` crate and `tesseract`,
    /// with executable paths and languages taken from `config`.
    pub fn new(config: ExtractionConfig) -> Self {
        let ocr = OcrAdapter::new(
            Arc::new(TesseractCliFactory::new(config.tesseract_path.clone())),
            config.ocr_languages.clone(),
        );
        Self {
            loader: Box::new(LopdfLoader),
            rasterizer: Box::new(PdftoppmRasterizer::new(config.pdftoppm_path.clone())),
            preprocessor: Box::new(GrayscaleConverter),
            ocr,
            config,
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Box<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Box<dyn ImagePreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_ocr_engine(mut self, factory: Arc<dyn OcrEngineFactory>) -> Self {
        self.ocr = OcrAdapter::new(factory, self.config.ocr_languages.clone());
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the whole document. Only a failure to open the PDF is returned
    /// as an error; every page-level failure degrades that page instead.
    pub async fn extract(&self, pdf_path: &Path) -> Result<ExtractedDocumentText, ExtractionError> {
        tracing::info!(
            path = %pdf_path.display(),
            threshold = self.config.text_threshold,
            languages = %self.config.language_arg(),
            "Starting text extraction"
        );

        let document = self.loader.open(pdf_path)?;
        let page_count = document.page_count();

        // Shared by all pages of this run, created on first OCR need.
        let mut scratch: Option<TempDir> = None;
        let mut pages = Vec::with_capacity(page_count as usize);

        for number in 1..=page_count {
            let page = fetch_page(document.as_ref(), number);

            let result = if page.text_len() >= self.config.text_threshold {
                PageResult::native(&page)
            } else {
                self.ocr_page(pdf_path, &page, &mut scratch).await
            };

            pages.push(result);
        }

        if let Some(dir) = scratch {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(dir = %path.display(), error = %e, "Failed to remove scratch dir");
            }
        }

        let extracted = ExtractedDocumentText { pages };

        tracing::info!(
            path = %pdf_path.display(),
            pages = extracted.page_count(),
            ocr_pages = extracted.ocr_page_count(),
            fallback_pages = extracted.fallback_page_count(),
            "Text extraction complete"
        );

        Ok(extracted)
    }

    /// OCR a standalone image (no rasterization, no grayscale step).
    pub async fn extract_image(&self, image: &Path) -> Result<String, ExtractionError> {
        if !tokio::fs::metadata(image).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(ExtractionError::DocumentOpen {
                path: image.to_path_buf(),
                reason: "image file not found".into(),
            });
        }

        tracing::info!(path = %image.display(), "Starting image OCR");
        let text = self.ocr.recognize(image, self.config.ocr_timeout).await?;
        tracing::info!(path = %image.display(), text_length = text.len(), "Image OCR complete");
        Ok(text)
    }

    /// The page's single error boundary: every OCR-path failure is logged and
    /// turned into the native-text fallback.
    async fn ocr_page(
        &self,
        pdf_path: &Path,
        page: &Page,
        scratch: &mut Option<TempDir>,
    ) -> PageResult {
        tracing::info!(
            page = page.number,
            chars = page.text_len(),
            "Page appears to be an image, using OCR"
        );

        let mut files = PageScratch::default();
        let outcome = self.run_ocr_path(pdf_path, page.number, scratch, &mut files).await;
        drop(files);

        match outcome {
            Ok(text) => {
                tracing::info!(
                    page = page.number,
                    text_length = text.len(),
                    "OCR finished"
                );
                PageResult::ocr(page.number, text)
            }
            Err(e) => {
                tracing::warn!(
                    page = page.number,
                    error = %e,
                    "OCR failed, falling back to native text"
                );
                PageResult::fallback(page)
            }
        }
    }

    async fn run_ocr_path(
        &self,
        pdf_path: &Path,
        number: u32,
        scratch: &mut Option<TempDir>,
        files: &mut PageScratch,
    ) -> Result<String, ExtractionError> {
        let out_dir = ensure_scratch_dir(scratch, &self.config.scratch_root)?.to_path_buf();

        let job = RasterizationJob {
            pdf_path: pdf_path.to_path_buf(),
            page_number: number,
            out_dir: out_dir.clone(),
            prefix: self.config.raster_prefix.clone(),
            dpi: self.config.dpi,
            timeout: self.config.raster_timeout,
        };

        let rasterized = self.rasterizer.rasterize(&job).await;

        // A failed or killed rasterizer may still have left an image behind.
        let raster = resolve_output(&job.prefix, number, &self.config.raster_format, &out_dir);
        if let Some(path) = &raster {
            files.track(path.clone());
        }

        let outcome = rasterized?;
        if !outcome.stderr.trim().is_empty() {
            tracing::debug!(page = number, stderr = %outcome.stderr.trim(), "pdftoppm stderr");
        }

        let raster = raster.ok_or_else(|| ExtractionError::OutputFileNotFound {
            page: number,
            dir: out_dir.clone(),
        })?;

        // Tracked before conversion so a partial write is still removed.
        files.track(self.preprocessor.output_path(&raster));
        let gray = self
            .preprocessor
            .to_grayscale(&raster, self.config.grayscale_timeout)
            .await?;
        files.track(gray.clone());

        self.ocr.recognize(&gray, self.config.ocr_timeout).await
    }
}

/// Fetch a page, degrading a fetch failure to an empty text layer so the page
/// is routed to OCR.
fn fetch_page(document: &dyn PdfDocument, number: u32) -> Page {
    match document.page(number) {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(page = number, error = %e, "Cannot read text layer, treating as empty");
            Page::empty(number)
        }
    }
}

fn ensure_scratch_dir<'a>(
    slot: &'a mut Option<TempDir>,
    root: &Path,
) -> Result<&'a Path, ExtractionError> {
    let dir = match slot.take() {
        Some(dir) => dir,
        None => {
            std::fs::create_dir_all(root)?;
            let dir = tempfile::Builder::new()
                .prefix("pagelift-")
                .tempdir_in(root)?;
            tracing::debug!(dir = %dir.path().display(), "Created scratch dir");
            dir
        }
    };
    Ok(slot.insert(dir).path())
}

/// Temporary files of one page. Removed when dropped, whatever the outcome.
#[derive(Default)]
struct PageScratch {
    paths: Vec<PathBuf>,
}

impl PageScratch {
    fn track(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }
}

impl Drop for PageScratch {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp file");
                }
            }
        }
    }
}
