//! Timeout-bounded summarize and embed calls on top of an [`LlmProvider`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dossier_llm::LlmProvider;

use crate::error::{IndexError, Result};
use crate::prompt::{code_summary_prompt, commit_diff_prompt};

pub const DEFAULT_CONTENT_CHAR_CAP: usize = 10_000;

/// Per-call limits for external requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub llm: Duration,
    pub embedding: Duration,
    pub host: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            llm: Duration::from_secs(120),
            embedding: Duration::from_secs(30),
            host: Duration::from_secs(30),
        }
    }
}

/// Run `fut`, turning an elapsed deadline into `IndexError::Timeout`.
pub(crate) async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| IndexError::Timeout {
            operation,
            seconds: limit.as_secs(),
        })?
}

pub struct Summarizer<P> {
    provider: Arc<P>,
    timeouts: Timeouts,
    content_char_cap: usize,
}

impl<P> Clone for Summarizer<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            timeouts: self.timeouts,
            content_char_cap: self.content_char_cap,
        }
    }
}

impl<P: LlmProvider> Summarizer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, timeouts: Timeouts) -> Self {
        Self {
            provider,
            timeouts,
            content_char_cap: DEFAULT_CONTENT_CHAR_CAP,
        }
    }

    #[must_use]
    pub fn with_content_char_cap(mut self, cap: usize) -> Self {
        self.content_char_cap = cap;
        self
    }

    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    #[must_use]
    pub fn supports_embeddings(&self) -> bool {
        self.provider.supports_embeddings()
    }

    /// Summarize one source file. Blank content yields an empty string without a provider call.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Provider` or `IndexError::Timeout`.
    pub async fn summarize_code(&self, path: &str, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            tracing::warn!(path, "empty file content, nothing to summarize");
            return Ok(String::new());
        }
        tracing::debug!(path, "summarizing file");
        let messages = code_summary_prompt(path, content, self.content_char_cap);
        with_timeout("summarize", self.timeouts.llm, async {
            self.provider.chat(&messages).await.map_err(IndexError::from)
        })
        .await
    }

    /// Summarize a commit diff as bullet points. A blank diff yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Provider` or `IndexError::Timeout`.
    pub async fn summarize_diff(&self, diff: &str) -> Result<String> {
        if diff.trim().is_empty() {
            return Ok(String::new());
        }
        let messages = commit_diff_prompt(diff);
        with_timeout("summarize", self.timeouts.llm, async {
            self.provider.chat(&messages).await.map_err(IndexError::from)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `IndexError::Provider` or `IndexError::Timeout`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        with_timeout("embed", self.timeouts.embedding, async {
            self.provider.embed(text).await.map_err(IndexError::from)
        })
        .await
    }
}
