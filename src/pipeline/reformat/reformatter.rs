use serde_json::Value;

use super::prompt::{build_format_prompt, build_question_prompt, clean_json_response};
use super::types::{LlmClient, QuestionOutcome};
use super::ReformatError;
use crate::config::ReformatConfig;

/// Hands extracted text to the language model, either for cleanup according
/// to a free-form query or for structured question extraction.
pub struct Reformatter {
    client: Box<dyn LlmClient>,
    format_model: String,
    question_model: String,
}

impl Reformatter {
    pub fn new(client: Box<dyn LlmClient>, config: &ReformatConfig) -> Self {
        Self {
            client,
            format_model: config.format_model.clone(),
            question_model: config.question_model.clone(),
        }
    }

    /// Clean and format `raw_text` following `instruction`. Returns an empty
    /// string when the model produced no text.
    pub async fn format_text(
        &self,
        raw_text: &str,
        instruction: &str,
    ) -> Result<String, ReformatError> {
        let prompt = build_format_prompt(raw_text, instruction);
        tracing::info!(
            model = %self.format_model,
            text_length = raw_text.len(),
            "Reformatting extracted text"
        );

        let text = self.client.generate(&self.format_model, &prompt).await?;

        tracing::info!(output_length = text.len(), "Reformatting complete");
        Ok(text)
    }

    /// Extract question/answer objects from `raw_text`. Never fails: transport
    /// and parse errors are reported inside the outcome.
    pub async fn extract_questions(
        &self,
        raw_text: &str,
        instruction: &str,
        start_number: u32,
    ) -> QuestionOutcome {
        let prompt = build_question_prompt(raw_text, instruction);
        tracing::info!(
            model = %self.question_model,
            text_length = raw_text.len(),
            "Extracting questions"
        );

        match self.client.generate(&self.question_model, &prompt).await {
            Ok(response) => parse_questions(&response, start_number),
            Err(e) => {
                tracing::error!(error = %e, "Question extraction request failed");
                QuestionOutcome::failed(e.to_string(), raw_text)
            }
        }
    }
}

/// Parse a model response into a [`QuestionOutcome`]. An empty response is
/// treated as `{}`; a single object is wrapped in a one-element list.
pub fn parse_questions(response: &str, start_number: u32) -> QuestionOutcome {
    let response = if response.trim().is_empty() { "{}" } else { response };
    let cleaned = clean_json_response(response);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Array(items)) => {
            tracing::info!(questions = items.len(), "Questions extracted");
            QuestionOutcome::succeeded(items, start_number)
        }
        Ok(other) => QuestionOutcome::succeeded(vec![other], start_number),
        Err(e) => {
            tracing::warn!(error = %e, "Model response is not valid JSON");
            QuestionOutcome::failed("Failed to parse JSON response", cleaned)
        }
    }
}
