use super::SqliteStore;
use crate::error::StoreError;
use crate::types::{ProjectId, SourceFileRow};

/// Serialize an embedding as little-endian `f32` bytes for the vector column.
#[must_use]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`].
///
/// # Errors
///
/// Returns `StoreError::InvalidEmbedding` if the blob length is not a multiple of 4.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidEmbedding(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

type SourceFileTuple = (i64, ProjectId, String, String, String, Option<Vec<u8>>);

impl SqliteStore {
    /// Insert a source file row, or replace the existing row for `(project_id, file_name)`.
    ///
    /// Replacing clears the stored embedding; callers write it afterwards with
    /// [`SqliteStore::set_summary_embedding`].
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn upsert_source_file(
        &self,
        project_id: &ProjectId,
        file_name: &str,
        source_code: &str,
        summary: &str,
    ) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO source_files (project_id, file_name, source_code, summary) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(project_id, file_name) DO UPDATE SET \
             source_code = excluded.source_code, summary = excluded.summary, \
             summary_embedding = NULL \
             RETURNING id",
        )
        .bind(project_id)
        .bind(file_name)
        .bind(source_code)
        .bind(summary)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Write the summary embedding of an existing source file row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row has this id, or a database error.
    pub async fn set_summary_embedding(&self, id: i64, embedding: &[f32]) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE source_files SET summary_embedding = ? WHERE id = ?")
            .bind(encode_embedding(embedding))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("source file {id}")));
        }
        Ok(())
    }

    /// Load all source files of a project in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored embedding is malformed.
    pub async fn load_source_files(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<SourceFileRow>, StoreError> {
        let rows: Vec<SourceFileTuple> = sqlx::query_as(
            "SELECT id, project_id, file_name, source_code, summary, summary_embedding \
             FROM source_files WHERE project_id = ? ORDER BY id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(id, project_id, file_name, source_code, summary, blob)| {
                    Ok(SourceFileRow {
                        id,
                        project_id,
                        file_name,
                        source_code,
                        summary,
                        summary_embedding: blob.as_deref().map(decode_embedding).transpose()?,
                    })
                },
            )
            .collect()
    }
}
