mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use dossier_index::summarizer::Timeouts;
use dossier_llm::RetryPolicy;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist. Secrets are read
    /// from the environment only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration fails validation.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first out-of-range setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=16).contains(&self.github.max_concurrency) {
            bail!(
                "github.max_concurrency must be between 1 and 16, got {}",
                self.github.max_concurrency
            );
        }
        if self.github.commit_limit == 0 {
            bail!("github.commit_limit must be at least 1");
        }
        if self.github.branch.trim().is_empty() {
            bail!("github.branch must not be empty");
        }
        if !(1..=64).contains(&self.index.max_concurrency) {
            bail!(
                "index.max_concurrency must be between 1 and 64, got {}",
                self.index.max_concurrency
            );
        }
        if self.index.content_char_cap == 0 {
            bail!("index.content_char_cap must be at least 1");
        }
        let t = &self.timeouts;
        if t.llm_seconds == 0 || t.embedding_seconds == 0 || t.github_seconds == 0 {
            bail!("timeouts must be at least 1 second");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        Ok(())
    }

    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            llm: Duration::from_secs(self.timeouts.llm_seconds),
            embedding: Duration::from_secs(self.timeouts.embedding_seconds),
            host: Duration::from_secs(self.timeouts.github_seconds),
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_backoff_ms),
        )
    }
}
