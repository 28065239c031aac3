use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::ReformatError;
use crate::config::ReformatConfig;

/// Gemini `generateContent` client over the public REST API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ReformatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReformatError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout,
        })
    }

    /// Build from configuration. Fails when no API key is configured.
    pub fn from_config(config: &ReformatConfig) -> Result<Self, ReformatError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(ReformatError::MissingApiKey)?;
        Self::new(&config.base_url, api_key, config.timeout)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Text of the first candidate, parts concatenated. A response without any
/// text yields an empty string; a blocked prompt is an error.
pub fn parse_generate_response(body: &str) -> Result<String, ReformatError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ReformatError::ResponseParsing(e.to_string()))?;

    if parsed.candidates.is_empty() {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ReformatError::Blocked(reason));
        }
    }

    Ok(parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ReformatError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        tracing::debug!(model, prompt_length = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ReformatError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ReformatError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    ReformatError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReformatError::HttpClient(e.to_string()))?;

        if !status.is_success() {
            return Err(ReformatError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_generate_response(&text)
    }
}

/// Mock LLM client for testing. Returns a configurable response and records
/// the prompts it received.
pub struct MockLlmClient {
    response: Result<String, String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an HTTP client error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(model, prompt)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.prompts
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ReformatError> {
        if let Ok(mut calls) = self.prompts.lock() {
            calls.push((model.to_string(), prompt.to_string()));
        }
        self.response.clone().map_err(ReformatError::HttpClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers exactly one HTTP request with `status` and `body`, returning
    /// the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[test]
    fn parses_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Question 1:"},{"text":" What?"}],"role":"model"}},{"content":{"parts":[{"text":"ignored"}]}}]}"#;
        assert_eq!(parse_generate_response(body).unwrap(), "Question 1: What?");
    }

    #[test]
    fn missing_text_is_empty_string() {
        assert_eq!(parse_generate_response(r#"{"candidates":[]}"#).unwrap(), "");
        assert_eq!(parse_generate_response("{}").unwrap(), "");
        assert_eq!(
            parse_generate_response(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap(),
            ""
        );
    }

    #[test]
    fn blocked_prompt_is_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(
            parse_generate_response(body),
            Err(ReformatError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            parse_generate_response("<html>"),
            Err(ReformatError::ResponseParsing(_))
        ));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = ReformatConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ReformatError::MissingApiKey)
        ));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client =
            GeminiClient::new("http://localhost:9999/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn generate_posts_prompt_and_reads_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"cleaned"}]}}]}"#,
        )
        .await;
        let client = GeminiClient::new(&url, "test-key", Duration::from_secs(10)).unwrap();

        let text = client.generate("gemini-2.5-flash", "Summarize this").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(text, "cleaned");
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent "));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""text":"Summarize this""#));
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let (url, server) = serve_once("403 Forbidden", r#"{"error":{"message":"API key not valid"}}"#).await;
        let client = GeminiClient::new(&url, "bad", Duration::from_secs(10)).unwrap();

        let err = client.generate("gemini-2.0-flash", "p").await.unwrap_err();
        server.await.unwrap();

        match err {
            ReformatError::Api { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = GeminiClient::new(&url, "key", Duration::from_secs(5)).unwrap();
        let err = client.generate("gemini-2.5-flash", "p").await.unwrap_err();
        assert!(matches!(err, ReformatError::Connection(_)));
    }

    #[tokio::test]
    async fn mock_client_records_calls() {
        let client = MockLlmClient::new("answer");
        assert_eq!(client.generate("m", "p").await.unwrap(), "answer");
        assert_eq!(client.calls(), vec![("m".to_string(), "p".to_string())]);

        let failing = MockLlmClient::failing("offline");
        assert!(matches!(
            failing.generate("m", "p").await,
            Err(ReformatError::HttpClient(m)) if m == "offline"
        ));
    }
}
