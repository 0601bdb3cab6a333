use std::str::FromStr;

use super::Config;
use crate::secret::Secret;

/// Read and parse `key`; unparseable values are logged and ignored.
fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    if let Ok(parsed) = v.trim().parse() {
        Some(parsed)
    } else {
        tracing::warn!("ignoring invalid {key} value: {v}");
        None
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DOSSIER_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid DOSSIER_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOSSIER_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("DOSSIER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DOSSIER_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(v).filter(|m| !m.trim().is_empty());
        }
        if let Ok(v) = std::env::var("DOSSIER_GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Ok(v) = std::env::var("DOSSIER_GITHUB_BRANCH") {
            self.github.branch = v;
        }
        if let Some(n) = parse_env("DOSSIER_INDEX_MAX_CONCURRENCY") {
            self.index.max_concurrency = n;
        }
        if let Ok(v) = std::env::var("DOSSIER_SQLITE_PATH") {
            self.store.sqlite_path = v;
        }
        if let Some(secs) = parse_env("DOSSIER_TIMEOUT_LLM") {
            self.timeouts.llm_seconds = secs;
        }
        if let Some(secs) = parse_env("DOSSIER_TIMEOUT_EMBEDDING") {
            self.timeouts.embedding_seconds = secs;
        }
        if let Some(secs) = parse_env("DOSSIER_TIMEOUT_GITHUB") {
            self.timeouts.github_seconds = secs;
        }
    }

    pub(crate) fn resolve_secrets(&mut self) {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(Secret::new)
        };
        self.secrets.gemini_api_key = read("DOSSIER_GEMINI_API_KEY");
        self.secrets.openai_api_key = read("DOSSIER_OPENAI_API_KEY");
        self.secrets.github_token = read("DOSSIER_GITHUB_TOKEN");
    }
}
