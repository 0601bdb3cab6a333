use serde::{Deserialize, Serialize};

/// Strongly typed wrapper for project identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A summarized commit, unique per `(project_id, commit_hash)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommitRecord {
    pub project_id: ProjectId,
    pub commit_hash: String,
    pub commit_message: String,
    pub commit_author_name: String,
    pub commit_author_avatar: String,
    pub commit_date: String,
    pub summary: String,
}

/// A persisted source file with its summary and optional summary embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFileRow {
    pub id: i64,
    pub project_id: ProjectId,
    pub file_name: String,
    pub source_code: String,
    pub summary: String,
    pub summary_embedding: Option<Vec<f32>>,
}
