//! Application bootstrap: config resolution and construction of injected clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use dossier_index::generator::EmbeddingGenerator;
use dossier_index::host::{GithubClient, GithubOptions, RepositoryHost};
use dossier_index::indexer::RepoIndexer;
use dossier_index::poller::CommitPoller;
use dossier_index::summarizer::Summarizer;
use dossier_llm::LlmProvider;
use dossier_llm::any::AnyProvider;
use dossier_llm::gemini::{self, GeminiProvider};
use dossier_llm::openai::{self, OpenAiProvider};
use dossier_store::SqliteStore;

use crate::config::{Config, ProviderKind};

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load and validate configuration from `config_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn from_path(config_path: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// # Errors
    ///
    /// Returns an error if the selected provider's API key is missing.
    pub fn build_provider(&self) -> anyhow::Result<AnyProvider> {
        create_provider(&self.config)
    }

    /// # Errors
    ///
    /// Returns an error if the GitHub settings are malformed.
    pub fn build_host(&self) -> anyhow::Result<GithubClient> {
        create_github_client(&self.config)
    }

    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn build_store(&self) -> anyhow::Result<SqliteStore> {
        let path = &self.config.store.sqlite_path;
        SqliteStore::new(path)
            .await
            .with_context(|| format!("failed to open store at {path}"))
    }

    #[must_use]
    pub fn build_summarizer<P: LlmProvider>(&self, provider: Arc<P>) -> Summarizer<P> {
        Summarizer::new(provider, self.config.timeouts())
            .with_content_char_cap(self.config.index.content_char_cap)
    }

    #[must_use]
    pub fn build_indexer<H: RepositoryHost, P: LlmProvider>(
        &self,
        host: Arc<H>,
        provider: Arc<P>,
        store: SqliteStore,
    ) -> RepoIndexer<H, P> {
        let generator = EmbeddingGenerator::new(
            self.build_summarizer(provider),
            self.config.index.max_concurrency,
        );
        RepoIndexer::new(host, generator, store)
    }

    #[must_use]
    pub fn build_poller<H: RepositoryHost, P: LlmProvider>(
        &self,
        host: Arc<H>,
        provider: Arc<P>,
        store: SqliteStore,
    ) -> CommitPoller<H, P> {
        CommitPoller::new(
            host,
            self.build_summarizer(provider),
            store,
            self.config.index.max_concurrency,
        )
    }
}

/// Priority: `--config` value > `DOSSIER_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("DOSSIER_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// # Errors
///
/// Returns an error if the API key for the selected provider is not set.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    let retry = config.retry_policy();
    match llm.provider {
        ProviderKind::Gemini => {
            let key = config
                .secrets
                .gemini_api_key
                .as_ref()
                .context("DOSSIER_GEMINI_API_KEY is required for the gemini provider")?;
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.into());
            Ok(AnyProvider::Gemini(
                GeminiProvider::new(
                    key.expose().to_owned(),
                    base_url,
                    llm.model.clone(),
                    llm.max_tokens,
                    llm.embedding_model.clone(),
                )
                .with_retry(retry),
            ))
        }
        ProviderKind::OpenAi => {
            let key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("DOSSIER_OPENAI_API_KEY is required for the openai provider")?;
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.into());
            Ok(AnyProvider::OpenAi(
                OpenAiProvider::new(
                    key.expose().to_owned(),
                    base_url,
                    llm.model.clone(),
                    llm.max_tokens,
                    llm.embedding_model.clone(),
                )
                .with_retry(retry),
            ))
        }
    }
}

/// # Errors
///
/// Returns an error if the API URL or an ignore pattern is malformed.
pub fn create_github_client(config: &Config) -> anyhow::Result<GithubClient> {
    let gh = &config.github;
    let options = GithubOptions {
        api_url: gh.api_url.clone(),
        branch: gh.branch.clone(),
        token: config
            .secrets
            .github_token
            .as_ref()
            .map(|t| t.expose().to_owned()),
        ignore: gh.ignore.clone(),
        max_concurrency: gh.max_concurrency,
        commit_limit: gh.commit_limit,
        request_timeout: config.timeouts().host,
        retry: config.retry_policy(),
    };
    GithubClient::new(options).context("invalid github configuration")
}
