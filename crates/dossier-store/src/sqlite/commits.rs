use std::collections::HashSet;

use super::SqliteStore;
use crate::error::StoreError;
use crate::types::{CommitRecord, ProjectId};

impl SqliteStore {
    /// Hashes of every commit already stored for a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn commit_hashes(&self, project_id: &ProjectId) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT commit_hash FROM commits WHERE project_id = ?")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }

    /// Insert a batch of commits in a single transaction.
    ///
    /// Rows whose `(project_id, commit_hash)` already exist are skipped. Returns the
    /// records that were actually inserted, in input order. An empty batch does not
    /// touch the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; no rows are written in that case.
    pub async fn insert_commits(
        &self,
        commits: &[CommitRecord],
    ) -> Result<Vec<CommitRecord>, StoreError> {
        if commits.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(commits.len());
        for commit in commits {
            let result = sqlx::query(
                "INSERT INTO commits \
                 (project_id, commit_hash, commit_message, commit_author_name, \
                  commit_author_avatar, commit_date, summary) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(project_id, commit_hash) DO NOTHING",
            )
            .bind(&commit.project_id)
            .bind(&commit.commit_hash)
            .bind(&commit.commit_message)
            .bind(&commit.commit_author_name)
            .bind(&commit.commit_author_avatar)
            .bind(&commit.commit_date)
            .bind(&commit.summary)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted.push(commit.clone());
            } else {
                tracing::debug!(hash = %commit.commit_hash, "commit already stored, skipped");
            }
        }
        tx.commit().await?;

        Ok(inserted)
    }

    /// Load all commits of a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn load_commits(&self, project_id: &ProjectId) -> Result<Vec<CommitRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CommitRecord>(
            "SELECT project_id, commit_hash, commit_message, commit_author_name, \
             commit_author_avatar, commit_date, summary \
             FROM commits WHERE project_id = ? ORDER BY commit_date DESC, id DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
