//! Ollama backend for local inference (`/api/chat`).
//!
//! No credential: Ollama runs on the local machine. The endpoint defaults
//! to `http://localhost:11434` and can be overridden with `OLLAMA_HOST`.

use super::{BackendError, ChatMessage, CompletionOptions, ModelBackend};
use crate::error::ProcessError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Chat adapter for a local Ollama instance.
pub struct OllamaBackend {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl OllamaBackend {
    pub fn new(endpoint: impl Into<String>, model: &str) -> Result<Self, ProcessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProcessError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Endpoint from `OLLAMA_HOST`, falling back to [`DEFAULT_ENDPOINT`].
    pub fn from_env(model: &str) -> Result<Self, ProcessError> {
        let endpoint =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint, model)
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/chat", self.endpoint);
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail: format!("model '{}' not available (ollama pull {})", self.model, self.model),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        debug!(
            backend = "ollama",
            model = self.model,
            chars = parsed.message.content.len(),
            "completion received"
        );
        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(backend.endpoint, "http://localhost:11434");
    }

    #[test]
    fn request_body_shape() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("text")];
        let body = OllamaChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
            options: OllamaOptions {
                temperature: 0.7,
                num_predict: 256,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 256);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn response_parsing_reads_message_content() {
        let raw = r#"{"model":"llama3","message":{"role":"assistant","content":"hi"},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "hi");
    }

    // Integration test against a live Ollama instance; opt-in only.
    #[tokio::test]
    #[ignore]
    async fn live_chat_roundtrip() {
        let backend = OllamaBackend::from_env("llama3").unwrap();
        let messages = [
            ChatMessage::system("Reply with the single word: pong"),
            ChatMessage::user("ping"),
        ];
        let out = backend
            .complete(&messages, &CompletionOptions::default())
            .await;
        if let Ok(text) = out {
            assert!(!text.is_empty());
        }
    }
}
