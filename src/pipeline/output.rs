//! Result files written by the command-line front end.
//!
//! Terminals often cannot render Devanagari and other scripts, so the
//! reformatted text is also saved as a standalone UTF-8 HTML page.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default HTML destination for reformatted PDF text.
pub const DEFAULT_HTML_OUTPUT: &str = "output.html";

/// Default JSON destination for image question extraction.
pub const DEFAULT_JSON_OUTPUT: &str = "output.json";

/// Render `text` (HTML-escaped) into a minimal page titled `title`.
pub fn render_html(text: &str, title: &str) -> String {
    let title = html_escape::encode_text(title);
    let body = html_escape::encode_text(text);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
      body {{
        font-family: 'Noto Sans', 'Arial Unicode MS', Arial, sans-serif;
        margin: 20px;
        line-height: 1.6;
      }}
      .container {{
        max-width: 800px;
        margin: 0 auto;
        padding: 20px;
        border: 1px solid #ddd;
        border-radius: 5px;
      }}
      h1 {{
        color: #333;
      }}
      .extracted-text {{
        white-space: pre-wrap;
        background-color: #f5f5f5;
        padding: 15px;
        border-radius: 4px;
      }}
    </style>
  </head>
  <body>
    <div class="container">
      <h1>{title}</h1>
      <div class="extracted-text">{body}</div>
    </div>
  </body>
</html>
"#
    )
}

pub fn save_html(text: &str, path: &Path, title: &str) -> Result<(), OutputError> {
    let html = render_html(text, title);
    write(path, html.as_bytes())?;
    tracing::info!(path = %path.display(), size = html.len(), "HTML output written");
    Ok(())
}

/// Write any serializable value as pretty-printed JSON.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value)?;
    write(path, json.as_bytes())?;
    tracing::info!(path = %path.display(), size = json.len(), "JSON output written");
    Ok(())
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    std::fs::write(path, bytes).map_err(|source| OutputError::Write {
        path: path.display().to_string(),
        source,
    })
}
