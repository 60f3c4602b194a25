//! Ollama HTTP client for cluster narration.
//!
//! Narration is a single non-streaming `POST /api/generate` per cluster.
//! The analysis pipeline is synchronous, so the client uses reqwest's
//! blocking API with an explicit request timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the LLM collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}\nSuggestion: Check that Ollama is running and llm.endpoint is correct")]
    Request(#[from] reqwest::Error),

    #[error("LLM returned HTTP {status}: {body}\nSuggestion: Check that llm.model is pulled on the server")]
    Status { status: u16, body: String },

    #[error("LLM response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that turns a prompt into generated text.
///
/// The narrator only depends on this trait; tests substitute scripted
/// implementations for the HTTP client.
pub trait TextGenerator {
    /// Generates a completion for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Blocking client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
    http_client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:11434`).
    ///
    /// A trailing slash on the URL is ignored.
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url,
            model: model.into(),
            timeout,
            http_client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Checks that the server answers `GET /api/tags` with a 2xx status
    /// within `timeout`.
    #[must_use]
    pub fn test_connection(&self, timeout: Duration) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http_client.get(&url).timeout(timeout).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("LLM connection test failed: {e}");
                false
            }
        }
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!(
            "POST {url} (model {}, {} prompt chars, timeout {:?})",
            self.model,
            prompt.chars().count(),
            self.timeout
        );

        let response = self.http_client.post(&url).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_stripped() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama2", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "llama2");
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            model: "llama2",
            prompt: "hello",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama2", "prompt": "hello", "stream": false})
        );
    }

    #[test]
    fn test_response_without_field_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(parsed.response.is_empty());
    }

    #[test]
    fn test_invalid_endpoint_fails_without_request() {
        // No scheme, so the URL is rejected before any socket is opened.
        let client =
            OllamaClient::new("localhost-no-scheme", "llama2", Duration::from_millis(200)).unwrap();
        assert!(!client.test_connection(Duration::from_millis(200)));
        assert!(matches!(
            client.generate("prompt"),
            Err(LlmError::Request(_))
        ));
    }
}
