//! Indexing orchestrator: fetch → filter → generate → persist.

use std::sync::Arc;

use dossier_llm::LlmProvider;
use dossier_store::{ProjectId, SqliteStore};

use crate::document::filter_and_prioritize;
use crate::error::Result;
use crate::generator::{EmbeddingGenerator, EnrichedRecord};
use crate::host::RepositoryHost;

/// Outcome of one indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub files_fetched: usize,
    pub files_valid: usize,
    /// Persisted with a real summary and an embedding.
    pub succeeded: usize,
    /// Persisted with a placeholder summary or without an embedding.
    pub degraded: usize,
    /// File names whose rows could not be written.
    pub failed: Vec<String>,
    pub duration_ms: u64,
}

pub struct RepoIndexer<H, P> {
    host: Arc<H>,
    generator: EmbeddingGenerator<P>,
    store: SqliteStore,
}

impl<H: RepositoryHost, P: LlmProvider> RepoIndexer<H, P> {
    #[must_use]
    pub fn new(host: Arc<H>, generator: EmbeddingGenerator<P>, store: SqliteStore) -> Self {
        Self {
            host,
            generator,
            store,
        }
    }

    /// Index every file of `repo_url` under `project_id`.
    ///
    /// Re-indexing replaces existing rows keyed by `(project_id, file_name)`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the repository URL is malformed or the file listing
    /// fails. Per-file failures are reported in [`IndexReport`].
    pub async fn index_repository(
        &self,
        project_id: &ProjectId,
        repo_url: &str,
        token: Option<&str>,
    ) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let mut report = IndexReport::default();

        let docs = self.host.list_files(repo_url, token).await?;
        report.files_fetched = docs.len();

        let valid = filter_and_prioritize(docs);
        report.files_valid = valid.len();
        tracing::info!(
            project = %project_id,
            fetched = report.files_fetched,
            valid = report.files_valid,
            "indexing started"
        );

        let records = self.generator.generate(valid).await;
        let total = records.len();

        for (i, record) in records.iter().enumerate() {
            match self.persist(project_id, record).await {
                Ok(()) => {
                    if record.is_degraded() {
                        report.degraded += 1;
                    } else {
                        report.succeeded += 1;
                    }
                    tracing::debug!(
                        file = %record.file_name,
                        progress = format_args!("{}/{total}", i + 1),
                        "persisted"
                    );
                }
                Err(e) => {
                    tracing::error!(file = %record.file_name, "failed to persist: {e}");
                    report.failed.push(record.file_name.clone());
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            project = %project_id,
            succeeded = report.succeeded,
            degraded = report.degraded,
            failed = report.failed.len(),
            duration_ms = report.duration_ms,
            "indexing finished"
        );
        Ok(report)
    }

    async fn persist(&self, project_id: &ProjectId, record: &EnrichedRecord) -> Result<()> {
        let id = self
            .store
            .upsert_source_file(
                project_id,
                &record.file_name,
                &record.source_code,
                &record.summary,
            )
            .await?;
        if let Some(embedding) = &record.embedding {
            self.store.set_summary_embedding(id, embedding).await?;
        }
        Ok(())
    }
}
