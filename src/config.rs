use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "pagelift";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pages whose text layer is shorter than this are treated as scanned images.
pub const DEFAULT_TEXT_THRESHOLD: usize = 50;
pub const DEFAULT_DPI: u32 = 300;
pub const DEFAULT_RASTER_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_GRAYSCALE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_OCR_LANGUAGES: &[&str] = &["eng", "hin"];

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_FORMAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_QUESTION_MODEL: &str = "gemini-2.0-flash";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "pagelift=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Settings for one extraction run. Passed explicitly into the orchestrator.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Minimum native-text length (characters) for a page to skip OCR.
    pub text_threshold: usize,
    pub dpi: u32,
    pub raster_timeout: Duration,
    pub grayscale_timeout: Duration,
    pub ocr_timeout: Duration,
    pub pdftoppm_path: PathBuf,
    pub tesseract_path: PathBuf,
    pub ocr_languages: Vec<String>,
    /// Filename prefix handed to the rasterizer.
    pub raster_prefix: String,
    /// Image format extension the rasterizer emits.
    pub raster_format: String,
    /// Directory under which the per-run scratch directory is created.
    pub scratch_root: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            dpi: DEFAULT_DPI,
            raster_timeout: DEFAULT_RASTER_TIMEOUT,
            grayscale_timeout: DEFAULT_GRAYSCALE_TIMEOUT,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            pdftoppm_path: PathBuf::from("pdftoppm"),
            tesseract_path: PathBuf::from("tesseract"),
            ocr_languages: DEFAULT_OCR_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            raster_prefix: "page".to_string(),
            raster_format: "png".to_string(),
            scratch_root: std::env::temp_dir(),
        }
    }
}

impl ExtractionConfig {
    /// Build a config from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`, so tests
    /// need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup("PDFTOPPM_PATH")) {
            config.pdftoppm_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty(lookup("TESSERACT_PATH")) {
            config.tesseract_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(lookup("PAGELIFT_SCRATCH_DIR")) {
            config.scratch_root = PathBuf::from(dir);
        }
        if let Some(value) = lookup("PAGELIFT_TEXT_THRESHOLD") {
            config.text_threshold = parse_value("PAGELIFT_TEXT_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("PAGELIFT_DPI") {
            config.dpi = parse_value("PAGELIFT_DPI", &value)?;
        }
        if let Some(value) = lookup("PAGELIFT_RASTER_TIMEOUT_SECS") {
            config.raster_timeout = parse_secs("PAGELIFT_RASTER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("PAGELIFT_GRAYSCALE_TIMEOUT_SECS") {
            config.grayscale_timeout = parse_secs("PAGELIFT_GRAYSCALE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("PAGELIFT_OCR_TIMEOUT_SECS") {
            config.ocr_timeout = parse_secs("PAGELIFT_OCR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("PAGELIFT_OCR_LANGS") {
            config.ocr_languages = parse_languages(&value)?;
        }

        Ok(config)
    }

    /// Tesseract-style language argument, e.g. `eng+hin`.
    pub fn language_arg(&self) -> String {
        self.ocr_languages.join("+")
    }
}

/// Settings for the Gemini-backed reformatter.
#[derive(Debug, Clone)]
pub struct ReformatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub format_model: String,
    pub question_model: String,
    pub timeout: Duration,
}

impl Default for ReformatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            format_model: DEFAULT_FORMAT_MODEL.to_string(),
            question_model: DEFAULT_QUESTION_MODEL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ReformatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            api_key: non_empty(lookup("GEMINI_KEY")),
            ..Self::default()
        };
        if let Some(url) = non_empty(lookup("GEMINI_BASE_URL")) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_value(key, value)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_languages(value: &str) -> Result<Vec<String>, ConfigError> {
    let languages: Vec<String> = value
        .split(['+', ','])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if languages.is_empty() {
        return Err(ConfigError::Empty("PAGELIFT_OCR_LANGS"));
    }
    Ok(languages)
}
