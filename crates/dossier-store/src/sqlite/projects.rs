use super::SqliteStore;
use crate::error::StoreError;
use crate::types::ProjectId;

impl SqliteStore {
    /// Register a project. Returns `false` when a project with this id already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_project(
        &self,
        id: &ProjectId,
        name: &str,
        github_url: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO projects (id, name, github_url) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(github_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Repository URL of a project, `None` when the project is unknown or has no URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn project_repo_url(&self, id: &ProjectId) -> Result<Option<String>, StoreError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT github_url FROM projects WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .and_then(|(url,)| url)
            .filter(|url| !url.trim().is_empty()))
    }
}
