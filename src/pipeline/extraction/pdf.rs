use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, ObjectId};

use super::types::{DocumentLoader, Page, PdfDocument};
use super::ExtractionError;

/// Loads PDFs with lopdf and reads their embedded text layer.
/// Handles digital PDFs; scanned pages simply yield no fragments.
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, ExtractionError> {
        let document = LopdfDocument::open(path)?;
        Ok(Box::new(document))
    }
}

/// An opened PDF backed by a parsed lopdf document.
pub struct LopdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfDocument {
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        let doc = Document::load(path).map_err(|e| ExtractionError::DocumentOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_document(doc))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::DocumentOpen {
            path: "<memory>".into(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        tracing::debug!(pages = pages.len(), "Opened PDF");
        Self { doc, pages }
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Result<Page, ExtractionError> {
        if !self.pages.contains_key(&number) {
            return Err(ExtractionError::PageFetch {
                page: number,
                reason: format!("page out of range (PDF has {} pages)", self.pages.len()),
            });
        }

        let text = self
            .doc
            .extract_text(&[number])
            .map_err(|e| ExtractionError::PageFetch {
                page: number,
                reason: e.to_string(),
            })?;

        Ok(Page::new(number, split_fragments(&text)))
    }
}

/// Text-layer fragments: the non-empty lines of the page text, in order.
fn split_fragments(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
