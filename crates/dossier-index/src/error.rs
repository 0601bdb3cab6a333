//! Error types for dossier-index.

/// Failures talking to the repository host.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during indexing and commit polling.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Network or auth failure talking to the repository host.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Repository URL cannot be decomposed into owner and repo.
    #[error("invalid repository url: {0}")]
    InvalidRepo(String),

    /// Project has no repository URL on record.
    #[error("project {0} has no repository url")]
    MissingRepo(String),

    /// Summarization or embedding provider failure.
    #[error("provider error: {0}")]
    Provider(#[from] dossier_llm::LlmError),

    /// Store write or read failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] dossier_store::StoreError),

    /// Host adapter constructed from malformed settings.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An external call exceeded its configured timeout.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
