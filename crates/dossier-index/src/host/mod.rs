//! Repository host capability: file listing, commit listing, diff retrieval.

pub mod github;

use std::future::Future;

use crate::document::SourceDocument;
use crate::error::{IndexError, Result};

pub use github::{GithubClient, GithubOptions};

/// Metadata of one upstream commit, before summarization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMeta {
    pub hash: String,
    pub message: String,
    pub author_name: String,
    pub author_avatar: String,
    pub date: String,
}

/// Owner and repository name decomposed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Decompose `https://github.com/{owner}/{repo}[.git][/]` into its two trailing segments.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidRepo` if fewer than two path segments remain.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let path = trimmed
            .split_once("://")
            .map_or(trimmed, |(_, rest)| rest.split_once('/').map_or("", |(_, p)| p));

        let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some(repo), Some(owner)) => Ok(Self {
                owner: owner.to_owned(),
                repo: repo.to_owned(),
            }),
            _ => Err(IndexError::InvalidRepo(url.to_owned())),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Source repository host consumed by the indexing and polling pipelines.
pub trait RepositoryHost: Send + Sync {
    /// List every non-ignored file of the configured branch with its text content.
    ///
    /// `token` overrides the host's configured credentials for this call.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Fetch` on network or auth failure, `IndexError::InvalidRepo`
    /// if the URL cannot be decomposed.
    fn list_files(
        &self,
        repo_url: &str,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SourceDocument>>> + Send;

    /// Most recent commits, newest first.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidRepo` for a malformed URL or `IndexError::Fetch`.
    fn list_recent_commits(
        &self,
        repo_url: &str,
    ) -> impl Future<Output = Result<Vec<CommitMeta>>> + Send;

    /// Unified diff text of one commit.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Fetch` on a non-2xx response.
    fn fetch_commit_diff(
        &self,
        repo_url: &str,
        hash: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_url() {
        let r = RepoRef::parse("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(r.owner, "rust-lang");
        assert_eq!(r.repo, "cargo");
    }

    #[test]
    fn parse_strips_git_suffix_and_slash() {
        let r = RepoRef::parse("https://github.com/rust-lang/cargo.git/").unwrap();
        assert_eq!(r.to_string(), "rust-lang/cargo");
        let r = RepoRef::parse("https://github.com/o/r/").unwrap();
        assert_eq!(r.to_string(), "o/r");
    }

    #[test]
    fn parse_without_scheme() {
        let r = RepoRef::parse("github.com/o/r").unwrap();
        assert_eq!(r.to_string(), "o/r");
    }

    #[test]
    fn parse_rejects_single_segment() {
        assert!(matches!(
            RepoRef::parse("https://github.com/only-owner"),
            Err(IndexError::InvalidRepo(_))
        ));
        assert!(RepoRef::parse("https://github.com/").is_err());
        assert!(RepoRef::parse("").is_err());
    }
}
