//! Deterministic mock backend for tests and development.
//!
//! Returns scripted responses without any network access, records every
//! call, and can be told to fail the first N calls or to fail whenever the
//! user text contains a marker string — enough to exercise the retry loop
//! and partial-failure pipeline paths deterministically.

use super::{BackendError, ChatMessage, CompletionOptions, ModelBackend};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

enum Reply {
    /// Echo the user message uppercased.
    Uppercase,
    /// Always return the same string.
    Fixed(String),
    /// Always fail.
    Failing,
}

/// Scripted [`ModelBackend`] for deterministic testing.
///
/// # Examples
///
/// ```
/// use blockshift::llm::{CompletionOptions, MockBackend, ModelBackend, ChatMessage};
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::uppercase();
/// let messages = [ChatMessage::system("sys"), ChatMessage::user("hello")];
/// let out = backend.complete(&messages, &CompletionOptions::default()).await.unwrap();
/// assert_eq!(out, "HELLO");
/// # });
/// ```
pub struct MockBackend {
    reply: Reply,
    failures_remaining: AtomicU32,
    fail_when_contains: Mutex<Option<String>>,
    calls: AtomicU32,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl MockBackend {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            failures_remaining: AtomicU32::new(0),
            fail_when_contains: Mutex::new(None),
            calls: AtomicU32::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// Backend that uppercases the user message.
    pub fn uppercase() -> Self {
        Self::with_reply(Reply::Uppercase)
    }

    /// Backend that returns `response` for every call.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fixed(response.into()))
    }

    /// Backend where every call fails.
    pub fn failing() -> Self {
        Self::with_reply(Reply::Failing)
    }

    /// Fail the first `n` calls, then answer normally.
    pub fn with_failures(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every call whose user text contains `marker`.
    pub fn failing_when_input_contains(self, marker: impl Into<String>) -> Self {
        *self.fail_when_contains.lock().unwrap() = Some(marker.into());
        self
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The message sequence of the most recent call.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    fn scripted_error() -> BackendError {
        BackendError::Api {
            status: 503,
            detail: "scripted failure".into(),
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();

        let user_text = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if let Some(marker) = self.fail_when_contains.lock().unwrap().as_deref() {
            if user_text.contains(marker) {
                return Err(Self::scripted_error());
            }
        }

        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Self::scripted_error());
        }

        match &self.reply {
            Reply::Uppercase => Ok(user_text.to_uppercase()),
            Reply::Fixed(s) => Ok(s.clone()),
            Reply::Failing => Err(Self::scripted_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uppercase_echoes_user_text() {
        let backend = MockBackend::uppercase();
        let messages = [ChatMessage::system("s"), ChatMessage::user("abc")];
        let out = backend
            .complete(&messages, &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "ABC");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn with_failures_fails_then_recovers() {
        let backend = MockBackend::fixed("ok").with_failures(2);
        let messages = [ChatMessage::user("x")];
        let opts = CompletionOptions::default();

        assert!(backend.complete(&messages, &opts).await.is_err());
        assert!(backend.complete(&messages, &opts).await.is_err());
        assert_eq!(backend.complete(&messages, &opts).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn marker_failure_is_selective() {
        let backend = MockBackend::uppercase().failing_when_input_contains("poison");
        let opts = CompletionOptions::default();

        let good = [ChatMessage::user("fine")];
        assert_eq!(backend.complete(&good, &opts).await.unwrap(), "FINE");

        let bad = [ChatMessage::user("poison pill")];
        assert!(backend.complete(&bad, &opts).await.is_err());
    }
}
