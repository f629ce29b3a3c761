//! Model backends and the retrying client wrapped around them.
//!
//! Every remote backend implements [`ModelBackend`]: one `complete` call
//! over a short message sequence, returning the response text. The
//! bounded-retry/exponential-backoff protocol lives in exactly one place —
//! [`ModelClient`] — which wraps whichever backend the factory selected.
//! Backends stay thin HTTP adapters; they never retry on their own.
//!
//! ## Retry protocol
//!
//! Any backend error increments the attempt counter. While the counter is
//! below `max_retries` the client sleeps `2^counter` seconds (2 s for the
//! first retry, then 4 s, 8 s, …) and re-attempts the same call. When the
//! counter reaches `max_retries` it is reset to 0 and the failure surfaces
//! as [`RetryExhausted`], carrying the original backend error. Errors are
//! deliberately not classified — a 400 retries exactly like a 503 — so the
//! client's behaviour is identical across backends.

pub mod google;
pub mod mock;
pub mod ollama;
pub mod openai;

use crate::config::ProcessConfig;
use crate::error::ProcessError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::warn;

pub use google::GoogleBackend;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiCompatBackend;

/// Providers that refuse to run without an API key.
const PROVIDERS_REQUIRING_KEY: &[&str] = &["groq", "openai", "google"];

/// A single chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system" or "user".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling options forwarded to the backend on every call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// A single failed backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// The response arrived but could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Terminal failure after the retry loop is exhausted.
#[derive(Debug, Error)]
#[error("model call failed after {retries} retries: {source}")]
pub struct RetryExhausted {
    pub retries: u32,
    #[source]
    pub source: BackendError,
}

/// Uniform capability over a remote text-completion backend.
///
/// Construction is the "initialize" step: constructors validate their
/// inputs and fail immediately (never retried) if the backend cannot be
/// set up. `complete` performs one raw call with no retry of its own.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Provider identifier, for logging.
    fn name(&self) -> &str;

    /// One completion over the given messages.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, BackendError>;
}

// ── Retry client ─────────────────────────────────────────────────────────

/// Retrying wrapper around a [`ModelBackend`].
///
/// Each `complete` call is stateless relative to prior blocks: a fresh
/// two-element message sequence (system instruction, user content) is built
/// per call and no history is carried between calls.
pub struct ModelClient {
    backend: Arc<dyn ModelBackend>,
    options: CompletionOptions,
    max_retries: u32,
    retries: AtomicU32,
}

impl ModelClient {
    pub fn new(backend: Arc<dyn ModelBackend>, max_retries: u32, options: CompletionOptions) -> Self {
        Self {
            backend,
            options,
            max_retries: max_retries.max(1),
            retries: AtomicU32::new(0),
        }
    }

    /// Current value of the attempt counter. 0 outside a failing call; also
    /// 0 right after any completed call, successful or exhausted.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Provider identifier of the wrapped backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Complete the user text under the given system instruction,
    /// retrying with exponential backoff until `max_retries` attempts
    /// have been made.
    pub async fn complete(
        &self,
        system_message: &str,
        user_text: &str,
    ) -> Result<String, RetryExhausted> {
        let messages = [
            ChatMessage::system(system_message),
            ChatMessage::user(user_text),
        ];

        loop {
            match self.backend.complete(&messages, &self.options).await {
                Ok(text) => {
                    self.retries.store(0, Ordering::SeqCst);
                    return Ok(text);
                }
                Err(err) => {
                    // No classification: every error retries the same way.
                    let attempt = self.retries.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt >= self.max_retries {
                        self.retries.store(0, Ordering::SeqCst);
                        return Err(RetryExhausted {
                            retries: self.max_retries,
                            source: err,
                        });
                    }
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
                    warn!(
                        backend = self.backend.name(),
                        attempt,
                        max_retries = self.max_retries,
                        delay_secs = backoff.as_secs(),
                        error = %err,
                        "model call failed; backing off"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

// ── Factory ──────────────────────────────────────────────────────────────

/// Instantiate the backend named by `config.provider`.
///
/// Identifiers are matched case-insensitively. Credential-requiring
/// providers fail here — before any block is touched — when no API key is
/// configured; an unrecognized identifier is the fatal "unsupported
/// provider" error.
pub fn create_backend(config: &ProcessConfig) -> Result<Arc<dyn ModelBackend>, ProcessError> {
    let provider = config.provider.trim().to_ascii_lowercase();

    if PROVIDERS_REQUIRING_KEY.contains(&provider.as_str())
        && config.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
    {
        return Err(ProcessError::MissingApiKey { provider });
    }

    match provider.as_str() {
        "groq" => Ok(Arc::new(OpenAiCompatBackend::groq(
            config.api_key.clone().unwrap_or_default(),
            &config.model,
        )?)),
        "openai" => Ok(Arc::new(OpenAiCompatBackend::openai(
            config.api_key.clone().unwrap_or_default(),
            &config.model,
        )?)),
        "google" => Ok(Arc::new(GoogleBackend::new(
            config.api_key.clone().unwrap_or_default(),
            &config.model,
        )?)),
        "ollama" => Ok(Arc::new(OllamaBackend::from_env(&config.model)?)),
        _ => Err(ProcessError::UnsupportedProvider {
            provider: config.provider.clone(),
        }),
    }
}
