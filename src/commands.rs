use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

use pagelift::pipeline::output::{save_html, save_json};
use pagelift::{ExtractionConfig, GeminiClient, PageOrchestrator, ReformatConfig, Reformatter};

use crate::cli::{ImageArgs, PdfArgs};

const HTML_TITLE: &str = "PDF Text";

pub async fn pdf(args: PdfArgs) -> Result<()> {
    let config = ExtractionConfig::from_env().context("invalid extraction configuration")?;
    let orchestrator = PageOrchestrator::new(config);

    let text = orchestrator
        .extract(&args.path)
        .await
        .with_context(|| format!("failed to extract text from {}", args.path.display()))?
        .to_string();

    println!("Extracted Text:\n{text}");

    if args.no_reformat {
        return Ok(());
    }

    let reformatter = reformatter()?;
    let instruction = instruction(args.prompt).await?;

    let output = reformatter
        .format_text(&text, &instruction)
        .await
        .context("reformatting failed")?;

    save_html(&output, &args.html_out, HTML_TITLE)?;
    println!("Output saved to {}", args.html_out.display());
    println!("\nThe output:\n{output}");
    Ok(())
}

pub async fn image(args: ImageArgs) -> Result<()> {
    let config = ExtractionConfig::from_env().context("invalid extraction configuration")?;
    let orchestrator = PageOrchestrator::new(config);

    let text = orchestrator
        .extract_image(&args.path)
        .await
        .with_context(|| format!("failed to extract text from {}", args.path.display()))?;

    println!("Extracted Text:\n{text}");

    if args.no_reformat {
        return Ok(());
    }

    let reformatter = reformatter()?;
    let instruction = instruction(args.prompt).await?;

    let outcome = reformatter
        .extract_questions(&text, &instruction, args.start_number)
        .await;

    save_json(&outcome, &args.json_out)?;
    println!("JSON output saved to {}", args.json_out.display());
    println!("\nFinal JSON:\n{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn reformatter() -> Result<Reformatter> {
    let config = ReformatConfig::from_env();
    let client = GeminiClient::from_config(&config).context("cannot create Gemini client")?;
    Ok(Reformatter::new(Box::new(client), &config))
}

async fn instruction(prompt: Option<String>) -> Result<String> {
    if let Some(prompt) = prompt {
        return Ok(prompt);
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter your query:\n").await?;
    stdout.flush().await?;

    read_instruction(BufReader::new(tokio::io::stdin())).await
}

/// One line of input, without its line ending. End of input gives an empty
/// instruction.
async fn read_instruction<R: AsyncBufRead + Unpin>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .context("failed to read query from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_first_line_only() {
        let input: &[u8] = b"Give me 5 MCQs\r\nignored\n";
        assert_eq!(read_instruction(input).await.unwrap(), "Give me 5 MCQs");
    }

    #[tokio::test]
    async fn end_of_input_is_empty_instruction() {
        let input: &[u8] = b"";
        assert_eq!(read_instruction(input).await.unwrap(), "");
    }

    #[tokio::test]
    async fn given_prompt_skips_stdin() {
        let prompt = instruction(Some("Summarize".into())).await.unwrap();
        assert_eq!(prompt, "Summarize");
    }
}
