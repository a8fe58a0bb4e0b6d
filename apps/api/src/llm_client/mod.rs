//! LLM Client — the single point of entry for all generative-language API
//! calls in Compass.
//!
//! ARCHITECTURAL RULE: no other module may call the Gemini API directly.
//! All LLM interactions MUST go through this module.
//!
//! No retries happen here: every failure is surfaced once and the advisor
//! layer converts it into a user-visible fallback string.

use std::pin::Pin;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response blocked by safety filters")]
    Blocked,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate. `Blocked` when the safety
    /// filter left nothing to show.
    fn text(&self) -> Result<String, LlmError> {
        if let Some(fb) = &self.prompt_feedback {
            if fb.block_reason.is_some() {
                return Err(LlmError::Blocked);
            }
        }

        let text: String = self
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(LlmError::Blocked);
        }
        Ok(text)
    }
}

/// Chunked text stream from a streaming generation call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// The single LLM client used by all services in Compass.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a single non-streaming generation call.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={key}",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed.text()?;
        debug!("LLM call succeeded: {} chars", text.len());
        Ok(text)
    }

    /// Makes a streaming generation call, yielding text fragments as the
    /// model produces them (SSE `data:` payloads).
    pub async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream, LlmError> {
        let key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;
        let url = format!(
            "{GEMINI_API_BASE}/{}:streamGenerateContent?alt=sse&key={key}",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(LlmError::Http)?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                for payload in drain_sse_data(&mut buffer) {
                    let parsed: GenerateResponse = serde_json::from_str(&payload)?;
                    match parsed.text() {
                        Ok(text) => yield text,
                        // Streamed frames without text (e.g. usage-only
                        // trailers) are skipped, not treated as blocks.
                        Err(LlmError::Blocked) => {}
                        Err(e) => {
                            Err::<(), LlmError>(e)?;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
    }
}

/// Pulls complete SSE `data:` payloads out of the buffer, leaving any
/// trailing partial line in place for the next network chunk.
fn drain_sse_data(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(newline) = buffer.find('\n') {
        let line: String = buffer.drain(..=newline).collect();
        let line = line.trim_end();
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() && data != "[DONE]" {
                payloads.push(data.to_string());
            }
        }
    }

    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_sse_data_extracts_complete_lines() {
        let mut buf = "data: {\"a\":1}\n\ndata: {\"b\":2}\ndata: {\"partial".to_string();
        let payloads = drain_sse_data(&mut buf);
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
        // The incomplete line stays buffered.
        assert_eq!(buf, "data: {\"partial");
    }

    #[test]
    fn test_drain_sse_data_ignores_comments_and_done() {
        let mut buf = ": keepalive\ndata: [DONE]\ndata:\n".to_string();
        assert!(drain_sse_data(&mut buf).is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Віт"},{"text":"аю"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().unwrap(), "Вітаю");
    }

    #[test]
    fn test_response_blocked_on_prompt_feedback() {
        let raw = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed.text(), Err(LlmError::Blocked)));
    }

    #[test]
    fn test_response_blocked_when_empty() {
        let raw = r#"{"candidates":[]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed.text(), Err(LlmError::Blocked)));
    }

    #[test]
    fn test_unconfigured_client_refuses_calls() {
        let client = LlmClient::new(None, "gemini-2.5-flash".to_string());
        assert!(!client.is_configured());

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = rt.block_on(client.generate("hello"));
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }
}
