use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{OcrEngine, OcrEngineFactory};
use super::ExtractionError;

/// Runs one recognition per call: acquire an engine, load languages,
/// recognize, and release the engine whatever the outcome.
pub struct OcrAdapter {
    factory: Arc<dyn OcrEngineFactory>,
    languages: Vec<String>,
}

impl OcrAdapter {
    pub fn new(factory: Arc<dyn OcrEngineFactory>, languages: Vec<String>) -> Self {
        Self { factory, languages }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub async fn recognize(&self, image: &Path, timeout: Duration) -> Result<String, ExtractionError> {
        let mut engine = self.factory.create();

        let outcome = tokio::time::timeout(timeout, async {
            engine.load(&self.languages).await?;
            engine.recognize(image).await
        })
        .await;

        if let Err(e) = engine.release().await {
            tracing::warn!(error = %e, "Failed to release OCR engine");
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::OcrTimeout(timeout)),
        }
    }
}

/// Tesseract driven through its command-line interface.
///
/// The binary loads traineddata itself on every run, so `load` only fixes the
/// language argument. A recognition in flight is killed when its future is
/// dropped.
pub struct TesseractCli {
    program: PathBuf,
    languages: Option<String>,
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            languages: None,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn load(&mut self, languages: &[String]) -> Result<(), ExtractionError> {
        if languages.is_empty() {
            return Err(ExtractionError::OcrEngine("No OCR languages configured".into()));
        }
        self.languages = Some(languages.join("+"));
        Ok(())
    }

    async fn recognize(&mut self, image: &Path) -> Result<String, ExtractionError> {
        let languages = self
            .languages
            .clone()
            .ok_or_else(|| ExtractionError::OcrEngine("Engine used before load".into()))?;

        let child = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&languages)
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExtractionError::OcrEngine(format!(
                    "Failed to spawn {}: {e}",
                    self.program.display()
                ))
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractionError::OcrEngine(format!("Tesseract I/O failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrEngine(format!(
                "Tesseract exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace('\u{0000}', "")
            .trim_end()
            .to_string())
    }

    async fn release(&mut self) -> Result<(), ExtractionError> {
        self.languages = None;
        Ok(())
    }
}

/// Creates a [`TesseractCli`] per recognition.
pub struct TesseractCliFactory {
    program: PathBuf,
}

impl TesseractCliFactory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl OcrEngineFactory for TesseractCliFactory {
    fn create(&self) -> Box<dyn OcrEngine> {
        Box::new(TesseractCli::new(self.program.clone()))
    }
}

/// Counters shared by every engine a [`MockOcrEngine`] factory hands out.
#[derive(Debug, Default)]
pub struct OcrCallCounts {
    pub loads: AtomicUsize,
    pub recognitions: AtomicUsize,
    pub releases: AtomicUsize,
}

impl OcrCallCounts {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn recognitions(&self) -> usize {
        self.recognitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Text(String),
    Fail(String),
    Hang,
}

/// Mock OCR engine for unit testing without Tesseract.
#[derive(Debug, Clone)]
pub struct MockOcrEngine {
    behavior: MockBehavior,
    counts: Arc<OcrCallCounts>,
}

impl MockOcrEngine {
    /// Always recognizes `text`.
    pub fn new(text: &str) -> Self {
        Self::with_behavior(MockBehavior::Text(text.to_string()))
    }

    /// Always fails recognition with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_behavior(MockBehavior::Fail(message.to_string()))
    }

    /// Never finishes recognition.
    pub fn hanging() -> Self {
        Self::with_behavior(MockBehavior::Hang)
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            counts: Arc::new(OcrCallCounts::default()),
        }
    }

    pub fn counts(&self) -> Arc<OcrCallCounts> {
        Arc::clone(&self.counts)
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn load(&mut self, _languages: &[String]) -> Result<(), ExtractionError> {
        self.counts.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recognize(&mut self, _image: &Path) -> Result<String, ExtractionError> {
        self.counts.recognitions.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Text(text) => Ok(text.clone()),
            MockBehavior::Fail(message) => Err(ExtractionError::OcrEngine(message.clone())),
            MockBehavior::Hang => std::future::pending().await,
        }
    }

    async fn release(&mut self) -> Result<(), ExtractionError> {
        self.counts.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl OcrEngineFactory for MockOcrEngine {
    fn create(&self) -> Box<dyn OcrEngine> {
        Box::new(self.clone())
    }
}
