#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid embedding blob of {0} bytes")]
    InvalidEmbedding(usize),

    #[error("{0} not found")]
    NotFound(String),
}
