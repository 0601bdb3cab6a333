//! Test-only mock LLM provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::provider::{LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    chat_calls: Arc<AtomicUsize>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    pub fail_embed: bool,
    /// Chat requests whose last message contains any of these markers fail.
    pub failing_markers: Vec<String>,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            chat_calls: Arc::new(AtomicUsize::new(0)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            embedding: vec![0.0; 8],
            supports_embeddings: true,
            fail_chat: false,
            fail_embed: false,
            failing_markers: Vec::new(),
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.failing_markers.push(marker.into());
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Number of `chat` calls made so far, shared across clones.
    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed` calls made so far, shared across clones.
    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        if let Some(last) = messages.last()
            && self
                .failing_markers
                .iter()
                .any(|m| last.content.contains(m.as_str()))
        {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed {
            return Err(crate::LlmError::Other("mock embedding error".into()));
        }
        if self.supports_embeddings {
            Ok(self.embedding.clone())
        } else {
            Err(crate::LlmError::EmbedUnsupported {
                provider: "mock".into(),
            })
        }
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
