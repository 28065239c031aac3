pub mod types;
pub mod prompt;
pub mod gemini;
pub mod reformatter;

pub use types::*;
pub use prompt::*;
pub use gemini::*;
pub use reformatter::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReformatError {
    #[error("GEMINI_KEY is not set")]
    MissingApiKey,

    #[error("Cannot reach Gemini at {0}")]
    Connection(String),

    #[error("Gemini returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
