#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("provider unavailable")]
    Unavailable,

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Map a non-success HTTP status onto the matching error variant.
    #[must_use]
    pub fn from_status(provider: &str, status: reqwest::StatusCode) -> Self {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            reqwest::StatusCode::SERVICE_UNAVAILABLE => Self::Unavailable,
            _ => Self::Other(format!("{provider} request failed (status {status})")),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_rate_limit() {
        let err = LlmError::from_status("gemini", reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[test]
    fn from_status_maps_unavailable() {
        let err = LlmError::from_status("gemini", reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(err, LlmError::Unavailable));
    }

    #[test]
    fn from_status_other_mentions_status() {
        let err = LlmError::from_status("openai", reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "openai request failed (status 400 Bad Request)"
        );
    }
}
