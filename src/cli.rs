use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pagelift::pipeline::output::{DEFAULT_HTML_OUTPUT, DEFAULT_JSON_OUTPUT};

#[derive(Parser, Debug)]
#[command(
    name = "pagelift",
    version,
    about = "Extract text from mixed native/scanned PDFs and images, then reformat it with Gemini"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract a PDF page by page, OCR-ing pages without a usable text layer.
    Pdf(PdfArgs),
    /// OCR a single image and extract questions from it.
    Image(ImageArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PdfArgs {
    pub path: PathBuf,

    /// Reformatting instruction. Asked for interactively when omitted.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Stop after printing the extracted text.
    #[arg(long, default_value_t = false)]
    pub no_reformat: bool,

    #[arg(long, default_value = DEFAULT_HTML_OUTPUT)]
    pub html_out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ImageArgs {
    pub path: PathBuf,

    /// Additional extraction instructions. Asked for interactively when omitted.
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_reformat: bool,

    #[arg(long, default_value = DEFAULT_JSON_OUTPUT)]
    pub json_out: PathBuf,

    /// Number given to the first extracted question.
    #[arg(long, default_value_t = 1)]
    pub start_number: u32,
}
