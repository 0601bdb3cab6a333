use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Summarization and embedding backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_embedding_model() -> Option<String> {
    Some("text-embedding-004".into())
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Overrides the backend's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// `None` disables embeddings; records are then stored without a vector.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_github_max_concurrency() -> usize {
    5
}

fn default_commit_limit() -> usize {
    10
}

pub(crate) fn default_ignore() -> Vec<String> {
    [
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "bun.lockb",
        "*.min.js",
        "*.min.css",
        "*.svg",
        "*.png",
        "*.jpg",
        "*.jpeg",
        "*.gif",
        "*.ico",
        "*.json",
        ".gitignore",
        ".dockerignore",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Concurrent file-content requests during a listing.
    #[serde(default = "default_github_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            branch: default_branch(),
            max_concurrency: default_github_max_concurrency(),
            commit_limit: default_commit_limit(),
            ignore: default_ignore(),
        }
    }
}

fn default_index_max_concurrency() -> usize {
    dossier_index::generator::DEFAULT_MAX_CONCURRENCY
}

fn default_content_char_cap() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    /// In-flight documents or commits during summarization.
    #[serde(default = "default_index_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_content_char_cap")]
    pub content_char_cap: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_index_max_concurrency(),
            content_char_cap: default_content_char_cap(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_github_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_timeout")]
    pub llm_seconds: u64,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
    #[serde(default = "default_github_timeout")]
    pub github_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: default_llm_timeout(),
            embedding_seconds: default_embedding_timeout(),
            github_seconds: default_github_timeout(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

fn default_sqlite_path() -> String {
    "dossier.db".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// Credentials read from the environment only, never from the config file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub gemini_api_key: Option<Secret>,
    pub openai_api_key: Option<Secret>,
    pub github_token: Option<Secret>,
}
