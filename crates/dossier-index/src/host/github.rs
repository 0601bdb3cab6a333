//! GitHub REST adapter for [`RepositoryHost`].

use std::fmt;
use std::time::Duration;

use chrono::DateTime;
use dossier_llm::retry::{RetryPolicy, send_with_retry};
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;

use super::{CommitMeta, RepoRef, RepositoryHost};
use crate::document::SourceDocument;
use crate::error::{FetchError, IndexError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const API_VERSION: &str = "2022-11-28";

/// Construction parameters for [`GithubClient`].
#[derive(Clone)]
pub struct GithubOptions {
    pub api_url: String,
    pub branch: String,
    pub token: Option<String>,
    pub ignore: Vec<String>,
    pub max_concurrency: usize,
    pub commit_limit: usize,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GithubOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            branch: "main".into(),
            token: None,
            ignore: Vec::new(),
            max_concurrency: 5,
            commit_limit: 10,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for GithubOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubOptions")
            .field("api_url", &self.api_url)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ignore", &self.ignore)
            .field("max_concurrency", &self.max_concurrency)
            .field("commit_limit", &self.commit_limit)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Ignore rule: bare patterns match the file name, patterns containing `/` the full path.
#[derive(Debug, Clone)]
struct IgnoreRule {
    pattern: glob::Pattern,
    full_path: bool,
}

impl IgnoreRule {
    fn matches(&self, path: &str) -> bool {
        if self.full_path {
            self.pattern.matches(path)
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            self.pattern.matches(name)
        }
    }
}

#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: Url,
    branch: String,
    token: Option<String>,
    ignore: Vec<IgnoreRule>,
    max_concurrency: usize,
    commit_limit: usize,
    retry: RetryPolicy,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_url", &self.api_url.as_str())
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ignore_rules", &self.ignore.len())
            .field("max_concurrency", &self.max_concurrency)
            .field("commit_limit", &self.commit_limit)
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    /// # Errors
    ///
    /// Returns `IndexError::Config` if the API URL or an ignore glob is malformed.
    pub fn new(options: GithubOptions) -> Result<Self> {
        let api_url = Url::parse(&options.api_url)
            .map_err(|e| IndexError::Config(format!("github api_url {}: {e}", options.api_url)))?;
        if api_url.cannot_be_a_base() {
            return Err(IndexError::Config(format!(
                "github api_url {} cannot be a base url",
                options.api_url
            )));
        }

        let ignore = options
            .ignore
            .iter()
            .map(|raw| {
                glob::Pattern::new(raw)
                    .map(|pattern| IgnoreRule {
                        pattern,
                        full_path: raw.contains('/'),
                    })
                    .map_err(|e| IndexError::Config(format!("ignore pattern {raw:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(options.request_timeout)
            .user_agent(concat!("dossier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self {
            client,
            api_url,
            branch: options.branch,
            token: options.token.filter(|t| !t.is_empty()),
            ignore,
            max_concurrency: options.max_concurrency.max(1),
            commit_limit: options.commit_limit,
            retry: options.retry,
        })
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.iter().any(|rule| rule.matches(path))
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let builder = builder.header("X-GitHub-Api-Version", API_VERSION);
        match token.filter(|t| !t.is_empty()).or(self.token.as_deref()) {
            Some(t) => builder.header(AUTHORIZATION, format!("Bearer {t}")),
            None => builder,
        }
    }

    async fn get(&self, url: Url, accept: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let response = send_with_retry("github", &self.retry, || {
            self.authorize(self.client.get(url.clone()), token)
                .header(ACCEPT, accept)
                .send()
        })
        .await
        .map_err(FetchError::Http)?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%url, %status, "github request failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            }
            .into());
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> Result<T> {
        let text = self
            .get(url, JSON_MEDIA_TYPE, token)
            .await?
            .text()
            .await
            .map_err(FetchError::Http)?;
        Ok(serde_json::from_str(&text).map_err(FetchError::Json)?)
    }

    async fn fetch_content(
        &self,
        repo: &RepoRef,
        path: String,
        token: Option<&str>,
    ) -> Result<SourceDocument> {
        let mut url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        );
        url.query_pairs_mut().append_pair("ref", &self.branch);

        let bytes = self
            .get(url, RAW_MEDIA_TYPE, token)
            .await?
            .bytes()
            .await
            .map_err(FetchError::Http)?;

        let content = match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path, "file is not valid UTF-8, including lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(SourceDocument::new(path, content))
    }
}

impl RepositoryHost for GithubClient {
    async fn list_files(&self, repo_url: &str, token: Option<&str>) -> Result<Vec<SourceDocument>> {
        let repo = RepoRef::parse(repo_url)?;
        let mut url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.repo.as_str(), "git", "trees"]
                .into_iter()
                .chain(self.branch.split('/')),
        );
        url.query_pairs_mut().append_pair("recursive", "1");

        let tree: TreeResponse = self.get_json(url, token).await?;
        if tree.truncated {
            tracing::warn!(%repo, "tree listing truncated by GitHub, some files are missing");
        }

        let blobs: Vec<String> = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| entry.path)
            .filter(|path| {
                let ignored = self.is_ignored(path);
                if ignored {
                    tracing::debug!(path = %path, "ignored");
                }
                !ignored
            })
            .collect();
        tracing::info!(%repo, files = blobs.len(), branch = %self.branch, "fetching file contents");

        let repo = &repo;
        let results: Vec<Result<SourceDocument>> =
            futures::stream::iter(blobs.into_iter().map(|path| self.fetch_content(repo, path, token)))
                .buffered(self.max_concurrency)
                .collect()
                .await;

        let mut docs = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!("skipping file: {e}"),
            }
        }
        Ok(docs)
    }

    async fn list_recent_commits(&self, repo_url: &str) -> Result<Vec<CommitMeta>> {
        let repo = RepoRef::parse(repo_url)?;
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str(), "commits"]);
        let mut items: Vec<CommitItem> = self.get_json(url, None).await?;

        items.sort_by_key(|item| {
            std::cmp::Reverse(
                item.author_date()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                    .map(|d| d.timestamp_millis()),
            )
        });

        Ok(items
            .into_iter()
            .take(self.commit_limit)
            .map(CommitItem::into_meta)
            .collect())
    }

    async fn fetch_commit_diff(&self, repo_url: &str, hash: &str) -> Result<String> {
        let repo = RepoRef::parse(repo_url)?;
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str(), "commits", hash]);
        let text = self
            .get(url, DIFF_MEDIA_TYPE, None)
            .await?
            .text()
            .await
            .map_err(FetchError::Http)?;
        Ok(text)
    }
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
    #[serde(default)]
    commit: Option<CommitDetail>,
    #[serde(default)]
    author: Option<AccountRef>,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct AccountRef {
    #[serde(default)]
    avatar_url: Option<String>,
}

impl CommitItem {
    fn author_date(&self) -> Option<&str> {
        self.commit.as_ref()?.author.as_ref()?.date.as_deref()
    }

    fn into_meta(self) -> CommitMeta {
        let (message, author) = self
            .commit
            .map(|c| (c.message, c.author))
            .unwrap_or_default();
        let (author_name, date) = author.map(|a| (a.name, a.date)).unwrap_or_default();
        CommitMeta {
            hash: self.sha,
            message: message.unwrap_or_default(),
            author_name: author_name.unwrap_or_default(),
            author_avatar: self.author.and_then(|a| a.avatar_url).unwrap_or_default(),
            date: date.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const REPO: &str = "https://github.com/acme/widgets";

    fn client_for(server: &MockServer, ignore: &[&str]) -> GithubClient {
        GithubClient::new(GithubOptions {
            api_url: server.uri(),
            ignore: ignore.iter().map(ToString::to_string).collect(),
            retry: RetryPolicy::none(),
            ..GithubOptions::default()
        })
        .unwrap()
    }

    async fn mount_tree(server: &MockServer, entries: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc",
                "tree": entries,
                "truncated": false
            })))
            .mount(server)
            .await;
    }

    async fn mount_content(server: &MockServer, file: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/widgets/contents/{file}")))
            .and(query_param("ref", "main"))
            .and(header("accept", RAW_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn ignore_rule_bare_pattern_matches_file_name() {
        let client = GithubClient::new(GithubOptions {
            ignore: vec!["*.min.js".into(), "package-lock.json".into(), "docs/*.md".into()],
            ..GithubOptions::default()
        })
        .unwrap();
        assert!(client.is_ignored("web/static/app.min.js"));
        assert!(client.is_ignored("package-lock.json"));
        assert!(client.is_ignored("sub/package-lock.json"));
        assert!(client.is_ignored("docs/guide.md"));
        assert!(!client.is_ignored("README.md"));
        assert!(!client.is_ignored("web/static/app.js"));
    }

    #[test]
    fn new_rejects_bad_glob() {
        let err = GithubClient::new(GithubOptions {
            ignore: vec!["[".into()],
            ..GithubOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let client = GithubClient::new(GithubOptions {
            token: Some("ghp_secret".into()),
            ..GithubOptions::default()
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn list_files_skips_ignored_and_trees() {
        let server = MockServer::start().await;
        mount_tree(
            &server,
            serde_json::json!([
                {"path": "src", "type": "tree"},
                {"path": "src/main.py", "type": "blob"},
                {"path": "package.json", "type": "blob"},
                {"path": "logo.png", "type": "blob"}
            ]),
        )
        .await;
        mount_content(&server, "src/main.py", "print('hi')").await;

        let docs = client_for(&server, &["*.json", "*.png"])
            .list_files(REPO, None)
            .await
            .unwrap();
        assert_eq!(docs, vec![SourceDocument::new("src/main.py", "print('hi')")]);
    }

    #[tokio::test]
    async fn list_files_preserves_tree_order() {
        let server = MockServer::start().await;
        mount_tree(
            &server,
            serde_json::json!([
                {"path": "a.rs", "type": "blob"},
                {"path": "b.rs", "type": "blob"},
                {"path": "c.rs", "type": "blob"}
            ]),
        )
        .await;
        for name in ["a.rs", "b.rs", "c.rs"] {
            mount_content(&server, name, name).await;
        }

        let docs = client_for(&server, &[]).list_files(REPO, None).await.unwrap();
        let paths: Vec<_> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs", "c.rs"]);
    }

    #[tokio::test]
    async fn list_files_sends_per_call_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/trees/main"))
            .and(header("authorization", "Bearer per-call"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new(GithubOptions {
            api_url: server.uri(),
            token: Some("configured".into()),
            retry: RetryPolicy::none(),
            ..GithubOptions::default()
        })
        .unwrap();
        let docs = client.list_files(REPO, Some("per-call")).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn list_files_unauthorized_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server, &[]).list_files(REPO, None).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::Fetch(FetchError::Status { status, .. }) if status == 401
        ));
    }

    #[tokio::test]
    async fn list_files_rate_limited_returns_promptly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "86400"))
            .expect(3)
            .mount(&server)
            .await;

        let client = GithubClient::new(GithubOptions {
            api_url: server.uri(),
            request_timeout: Duration::from_secs(1),
            retry: RetryPolicy::new(2, Duration::from_millis(10)),
            ..GithubOptions::default()
        })
        .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(3), client.list_files(REPO, None))
            .await
            .expect("listing must not wait out a day-long retry-after")
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Fetch(FetchError::Status { status, .. }) if status == 429
        ));
    }

    #[tokio::test]
    async fn list_files_skips_failed_content_fetch() {
        let server = MockServer::start().await;
        mount_tree(
            &server,
            serde_json::json!([
                {"path": "ok.rs", "type": "blob"},
                {"path": "gone.rs", "type": "blob"}
            ]),
        )
        .await;
        mount_content(&server, "ok.rs", "fn ok() {}").await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/gone.rs"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let docs = client_for(&server, &[]).list_files(REPO, None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, "ok.rs");
    }

    #[tokio::test]
    async fn list_files_includes_non_utf8_lossily() {
        let server = MockServer::start().await;
        mount_tree(&server, serde_json::json!([{"path": "latin1.txt", "type": "blob"}])).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/latin1.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'c', b'a', 0xE9]))
            .mount(&server)
            .await;

        let docs = client_for(&server, &[]).list_files(REPO, None).await.unwrap();
        assert_eq!(docs[0].content, "ca\u{FFFD}");
    }

    #[tokio::test]
    async fn list_files_invalid_repo_url() {
        let server = MockServer::start().await;
        let err = client_for(&server, &[])
            .list_files("https://github.com/lonely", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidRepo(_)));
    }

    fn commit_json(sha: &str, date: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "commit": {
                "message": format!("msg {sha}"),
                "author": {"name": "Ada", "date": date}
            },
            "author": {"avatar_url": format!("https://avatars.example/{sha}")}
        })
    }

    #[tokio::test]
    async fn list_recent_commits_sorts_and_truncates() {
        let server = MockServer::start().await;
        let mut body: Vec<_> = (0..12)
            .map(|i| commit_json(&format!("h{i:02}"), &format!("2024-01-{:02}T00:00:00Z", i + 1)))
            .collect();
        body.reverse();
        body.swap(0, 5);
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Array(body)))
            .mount(&server)
            .await;

        let commits = client_for(&server, &[]).list_recent_commits(REPO).await.unwrap();
        assert_eq!(commits.len(), 10);
        assert_eq!(commits[0].hash, "h11");
        assert_eq!(commits[9].hash, "h02");
        assert_eq!(commits[0].message, "msg h11");
        assert_eq!(commits[0].author_avatar, "https://avatars.example/h11");
    }

    #[tokio::test]
    async fn list_recent_commits_missing_fields_become_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"sha": "bare", "commit": {"message": "only message"}, "author": null}
            ])))
            .mount(&server)
            .await;

        let commits = client_for(&server, &[]).list_recent_commits(REPO).await.unwrap();
        assert_eq!(
            commits,
            vec![CommitMeta {
                hash: "bare".into(),
                message: "only message".into(),
                ..CommitMeta::default()
            }]
        );
    }

    #[tokio::test]
    async fn fetch_commit_diff_uses_diff_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits/abc123"))
            .and(header("accept", DIFF_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string("diff --git a/x b/x"))
            .mount(&server)
            .await;

        let diff = client_for(&server, &[])
            .fetch_commit_diff(REPO, "abc123")
            .await
            .unwrap();
        assert_eq!(diff, "diff --git a/x b/x");
    }

    #[tokio::test]
    async fn fetch_commit_diff_non_success_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let err = client_for(&server, &[])
            .fetch_commit_diff(REPO, "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Fetch(FetchError::Status { .. })));
    }
}
