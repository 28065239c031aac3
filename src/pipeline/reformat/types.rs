use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ReformatError;

/// Text generation backend used by the reformatting step.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ReformatError>;
}

/// Result of question extraction, serialized as written to `output.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl QuestionOutcome {
    pub fn succeeded(results: Vec<Value>, start_number: u32) -> Self {
        Self {
            success: true,
            results: Some(results),
            start_number: Some(start_number),
            error: None,
            raw_text: None,
        }
    }

    pub fn failed(error: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            success: false,
            results: None,
            start_number: None,
            error: Some(error.into()),
            raw_text: Some(raw_text.into()),
        }
    }

    pub fn question_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_with_camel_case_keys() {
        let outcome = QuestionOutcome::succeeded(vec![json!({"question": "Q"})], 1);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "results": [{"question": "Q"}], "startNumber": 1})
        );
    }

    #[test]
    fn failure_serializes_error_and_raw_text() {
        let outcome = QuestionOutcome::failed("Failed to parse JSON response", "not json");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Failed to parse JSON response", "rawText": "not json"})
        );
        assert_eq!(outcome.question_count(), 0);
    }
}
