//! Commit poller: list upstream commits, summarize the ones not yet stored.

use std::sync::Arc;

use dossier_llm::LlmProvider;
use dossier_store::{CommitRecord, ProjectId, SqliteStore};
use futures::StreamExt;

use crate::error::{IndexError, Result};
use crate::host::{CommitMeta, RepositoryHost};
use crate::summarizer::{Summarizer, with_timeout};

pub struct CommitPoller<H, P> {
    host: Arc<H>,
    summarizer: Summarizer<P>,
    store: SqliteStore,
    max_concurrency: usize,
}

impl<H: RepositoryHost, P: LlmProvider> CommitPoller<H, P> {
    #[must_use]
    pub fn new(
        host: Arc<H>,
        summarizer: Summarizer<P>,
        store: SqliteStore,
        max_concurrency: usize,
    ) -> Self {
        Self {
            host,
            summarizer,
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Summarize and store upstream commits that are not yet recorded for `project_id`.
    ///
    /// Returns the newly inserted records. Repeated calls without new upstream
    /// commits insert nothing.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::MissingRepo` if the project has no repository URL, a
    /// fetch error if the commit listing fails, or a persistence error if the
    /// batch insert fails.
    pub async fn poll_commits(&self, project_id: &ProjectId) -> Result<Vec<CommitRecord>> {
        let repo_url = self
            .store
            .project_repo_url(project_id)
            .await?
            .ok_or_else(|| IndexError::MissingRepo(project_id.to_string()))?;

        let recent = self.host.list_recent_commits(&repo_url).await?;
        let known = self.store.commit_hashes(project_id).await?;
        let pending: Vec<CommitMeta> = recent
            .into_iter()
            .filter(|c| !known.contains(&c.hash))
            .collect();

        if pending.is_empty() {
            tracing::info!(project = %project_id, "no new commits");
            return Ok(Vec::new());
        }
        tracing::info!(project = %project_id, pending = pending.len(), "summarizing new commits");

        let summaries: Vec<String> = futures::stream::iter(
            pending
                .iter()
                .map(|commit| self.summarize_commit(&repo_url, &commit.hash)),
        )
        .buffered(self.max_concurrency)
        .collect()
        .await;

        let records: Vec<CommitRecord> = pending
            .into_iter()
            .zip(summaries)
            .map(|(meta, summary)| CommitRecord {
                project_id: project_id.clone(),
                commit_hash: meta.hash,
                commit_message: meta.message,
                commit_author_name: meta.author_name,
                commit_author_avatar: meta.author_avatar,
                commit_date: meta.date,
                summary,
            })
            .collect();

        let inserted = self.store.insert_commits(&records).await?;
        tracing::info!(project = %project_id, inserted = inserted.len(), "commits stored");
        Ok(inserted)
    }

    /// Diff and summarize one commit. Any failure yields an empty summary.
    async fn summarize_commit(&self, repo_url: &str, hash: &str) -> String {
        let diff = match with_timeout(
            "diff fetch",
            self.summarizer.timeouts().host,
            self.host.fetch_commit_diff(repo_url, hash),
        )
        .await
        {
            Ok(diff) => diff,
            Err(e) => {
                tracing::warn!(commit = hash, "diff fetch failed: {e}");
                return String::new();
            }
        };

        match self.summarizer.summarize_diff(&diff).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(commit = hash, "commit summary failed: {e}");
                String::new()
            }
        }
    }
}
