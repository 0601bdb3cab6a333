//! Summarize-then-embed transform over filtered documents.

use dossier_llm::LlmProvider;
use futures::StreamExt;

use crate::document::SourceDocument;
use crate::summarizer::Summarizer;

/// Summary stored when summarization fails or returns nothing.
pub const PLACEHOLDER_SUMMARY: &str = "No summary generated";

/// Documents enriched concurrently when no override is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// One document after enrichment, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub file_name: String,
    pub source_code: String,
    pub summary: String,
    pub embedding: Option<Vec<f32>>,
}

impl EnrichedRecord {
    /// Whether the record carries a fallback summary or lacks an embedding.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.summary == PLACEHOLDER_SUMMARY || self.embedding.is_none()
    }
}

pub struct EmbeddingGenerator<P> {
    summarizer: Summarizer<P>,
    max_concurrency: usize,
}

impl<P: LlmProvider> EmbeddingGenerator<P> {
    #[must_use]
    pub fn new(summarizer: Summarizer<P>, max_concurrency: usize) -> Self {
        Self {
            summarizer,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Enrich every document, at most `max_concurrency` in flight.
    ///
    /// Output is index-aligned with `docs`. Failures degrade the affected record
    /// and never abort siblings.
    pub async fn generate(&self, docs: Vec<SourceDocument>) -> Vec<EnrichedRecord> {
        let total = docs.len();
        let records: Vec<EnrichedRecord> =
            futures::stream::iter(docs.into_iter().map(|doc| self.enrich(doc)))
                .buffered(self.max_concurrency)
                .collect()
                .await;

        let degraded = records.iter().filter(|r| r.is_degraded()).count();
        tracing::info!(total, degraded, "embedding generation finished");
        records
    }

    async fn enrich(&self, doc: SourceDocument) -> EnrichedRecord {
        let summary = match self.summarizer.summarize_code(&doc.path, &doc.content).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(path = %doc.path, "empty summary, using placeholder");
                PLACEHOLDER_SUMMARY.to_owned()
            }
            Err(e) => {
                tracing::warn!(path = %doc.path, "summarization failed: {e}");
                PLACEHOLDER_SUMMARY.to_owned()
            }
        };

        let embedding = if !self.summarizer.supports_embeddings() {
            tracing::debug!(path = %doc.path, "provider has no embedding model");
            None
        } else {
            match self.summarizer.embed(&summary).await {
                Ok(vector) if !vector.is_empty() => Some(vector),
                Ok(_) => {
                    tracing::warn!(path = %doc.path, "provider returned an empty embedding");
                    None
                }
                Err(e) => {
                    tracing::warn!(path = %doc.path, "embedding failed: {e}");
                    None
                }
            }
        };

        EnrichedRecord {
            file_name: doc.path,
            source_code: doc.content,
            summary,
            embedding,
        }
    }
}
