//! Google Gemini backend (`generateContent` API).

use super::{BackendError, ChatMessage, CompletionOptions, ModelBackend};
use crate::error::ProcessError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Gemini `generateContent` adapter.
///
/// The system message maps to `systemInstruction`; the remaining messages
/// become user-role `contents` entries.
pub struct GoogleBackend {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl GoogleBackend {
    pub fn new(api_key: String, model: &str) -> Result<Self, ProcessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProcessError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            base_url: GOOGLE_BASE_URL.to_string(),
            client,
        })
    }

    fn build_request(messages: &[ChatMessage], options: &CompletionOptions) -> GenerateRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .filter(|m| !m.content.is_empty())
            .map(|m| Content {
                role: None,
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            });

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        }
    }
}

#[async_trait]
impl ModelBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, BackendError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request(messages, options);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| BackendError::InvalidResponse("no candidates in response".into()))?;

        debug!(backend = "google", model = self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}
