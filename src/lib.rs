//! Hybrid PDF text extraction: trust the native text layer where a page has
//! one, rasterize and OCR the pages that do not, and hand the assembled text
//! to a language model for cleanup.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, ExtractionConfig, ReformatConfig};
pub use pipeline::extraction::{ExtractedDocumentText, ExtractionError, PageOrchestrator};
pub use pipeline::reformat::{GeminiClient, QuestionOutcome, ReformatError, Reformatter};
