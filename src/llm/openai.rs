//! OpenAI-compatible chat-completions backend.
//!
//! Groq exposes the same `/chat/completions` surface as OpenAI, so both
//! providers share this adapter and differ only in name and base URL.

use super::{BackendError, ChatMessage, CompletionOptions, ModelBackend};
use crate::error::ProcessError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Chat-completions adapter for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiCompatBackend {
    /// Backend against api.openai.com.
    pub fn openai(api_key: String, model: &str) -> Result<Self, ProcessError> {
        Self::with_base_url("openai", OPENAI_BASE_URL, api_key, model)
    }

    /// Backend against api.groq.com (OpenAI-compatible).
    pub fn groq(api_key: String, model: &str) -> Result<Self, ProcessError> {
        Self::with_base_url("groq", GROQ_BASE_URL, api_key, model)
    }

    /// Backend against an arbitrary OpenAI-compatible base URL.
    pub fn with_base_url(
        name: &str,
        base_url: &str,
        api_key: String,
        model: &str,
    ) -> Result<Self, ProcessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProcessError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BackendError::InvalidResponse("no choices in response".into()))?;

        debug!(backend = self.name, model = self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("text")];
        let body = ChatRequest {
            model: "llama3-70b-8192",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 4096,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "text");
        assert_eq!(json["max_tokens"], 4096);
    }

    #[test]
    fn response_parsing_takes_first_choice() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "first");
    }

    #[test]
    fn groq_and_openai_differ_only_in_name_and_base() {
        let groq = OpenAiCompatBackend::groq("k".into(), "llama3-70b-8192").unwrap();
        let openai = OpenAiCompatBackend::openai("k".into(), "gpt-4o-mini").unwrap();
        assert_eq!(groq.name(), "groq");
        assert_eq!(openai.name(), "openai");
        assert!(groq.base_url.contains("groq.com"));
        assert!(openai.base_url.contains("openai.com"));
    }

    #[test]
    fn custom_base_url_is_trimmed() {
        let backend =
            OpenAiCompatBackend::with_base_url("vllm", "http://localhost:8000/v1/", "k".into(), "m")
                .unwrap();
        assert_eq!(backend.base_url, "http://localhost:8000/v1");
    }
}
