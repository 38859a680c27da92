//! remote::github
//!
//! GitHub implementation of [`ContentRemote`] over the Git Data API.
//!
//! # Design
//!
//! An atomic commit is composed from the low-level Git Data endpoints in a
//! fixed sequence:
//!
//! 1. `GET  git/ref/heads/{branch}` resolves the branch head
//! 2. `GET  git/commits/{sha}` resolves the head's tree
//! 3. `POST git/blobs` once per added/modified file
//! 4. `POST git/trees` builds one new tree on top of the head's tree
//! 5. `POST git/commits` creates one commit with the old head as parent
//! 6. `PATCH git/refs/heads/{branch}` moves the branch
//!
//! The ref update comes last, so a failure anywhere earlier leaves the
//! branch untouched. Blobs or trees created before the failure are
//! unreferenced and eventually garbage-collected by GitHub.
//!
//! # Retry
//!
//! Every request runs with a fixed timeout and a small in-client retry
//! budget covering transient failures (network errors and 5xx responses)
//! only. Auth rejections, missing objects, and validation errors fail
//! immediately with the status and response body attached. A rejected ref
//! update surfaces as [`RemoteError::Conflict`] and is left for the job
//! level, where a fresh attempt re-reads the moved head.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{ContentRemote, RemoteError, RepoInfo};
use crate::config::SyncConfig;
use crate::types::{Change, ChangeSet, CommitAuthor, RemoteTree};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "ghsync";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// In-client attempts per request (transient failures only).
const REQUEST_ATTEMPTS: u32 = 3;

/// Delay between in-client attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// File mode sent for every tree entry (plain, non-executable file).
const BLOB_MODE: &str = "100644";

/// GitHub remote over the Git Data API.
pub struct GitHubRemote {
    /// HTTP client with the fixed per-request timeout applied
    client: Client,
    /// Bearer token
    token: String,
    /// Owner-qualified repository ("owner/repo")
    repository: String,
    /// Branch whose ref is read and moved
    branch: String,
    /// Committer identity sent on every commit
    committer: CommitAuthor,
    /// API base URL (configurable for tests and GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRemote")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("committer", &self.committer)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubRemote {
    /// Create a remote against the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Network` if the HTTP client cannot be built.
    pub fn new(
        repository: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        committer: CommitAuthor,
    ) -> Result<Self, RemoteError> {
        Self::with_api_base(repository, branch, token, committer, DEFAULT_API_BASE)
    }

    /// Create a remote against a custom API base URL.
    pub fn with_api_base(
        repository: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        committer: CommitAuthor,
        api_base: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            token: token.into(),
            repository: repository.into(),
            branch: branch.into(),
            committer,
            api_base: api_base.into(),
        })
    }

    /// Create a remote from a validated configuration.
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        Self::new(
            config.repository.clone(),
            config.branch.clone(),
            config.resolved_token(),
            config.committer.to_author(),
        )
    }

    /// The configured repository ("owner/repo").
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The configured branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Resolve the SHA of the configured branch head.
    pub async fn current_commit_sha(&self) -> Result<String, RemoteError> {
        let url = self.repo_url(&format!("git/ref/heads/{}", self.branch));
        let response: RefResponse = self.execute(|h| self.client.get(&url).headers(h)).await?;
        Ok(response.object.sha)
    }

    /// Resolve the tree SHA referenced by a commit.
    pub async fn tree_sha_for_commit(&self, commit_sha: &str) -> Result<String, RemoteError> {
        let url = self.repo_url(&format!("git/commits/{}", commit_sha));
        let response: CommitResponse = self.execute(|h| self.client.get(&url).headers(h)).await?;
        Ok(response.tree.sha)
    }

    /// Fetch a tree recursively, keeping blob entries only.
    pub async fn recursive_tree(&self, tree_sha: &str) -> Result<RemoteTree, RemoteError> {
        let url = self.repo_url(&format!("git/trees/{}", tree_sha));
        let response: TreeResponse = self
            .execute(|h| self.client.get(&url).headers(h).query(&[("recursive", "1")]))
            .await?;

        Ok(RemoteTree::from_entries(
            response
                .tree
                .into_iter()
                .filter(|item| item.kind == "blob")
                .filter_map(|item| item.sha.map(|sha| (item.path, sha))),
        ))
    }

    /// Create a blob from raw bytes; content travels base64-encoded.
    pub async fn create_blob(&self, content: &[u8]) -> Result<String, RemoteError> {
        let url = self.repo_url("git/blobs");
        let body = CreateBlobBody {
            content: base64::engine::general_purpose::STANDARD.encode(content),
            encoding: "base64",
        };
        let response: ShaResponse = self
            .execute(|h| self.client.post(&url).headers(h).json(&body))
            .await?;
        Ok(response.sha)
    }

    /// Create a tree on top of `base_tree_sha`.
    ///
    /// Entries with a `None` sha delete that path relative to the base tree.
    pub async fn create_tree(
        &self,
        entries: Vec<TreeEntry>,
        base_tree_sha: &str,
    ) -> Result<String, RemoteError> {
        let url = self.repo_url("git/trees");
        let body = CreateTreeBody {
            base_tree: base_tree_sha,
            tree: entries,
        };
        let response: ShaResponse = self
            .execute(|h| self.client.post(&url).headers(h).json(&body))
            .await?;
        Ok(response.sha)
    }

    /// Create a commit object pointing at `tree_sha` with one parent.
    ///
    /// The committer identity always comes from configuration. The author
    /// block is omitted from the request entirely when absent; partial or
    /// empty author objects are never sent.
    pub async fn create_commit(
        &self,
        tree_sha: &str,
        parent_sha: &str,
        message: &str,
        author: Option<&CommitAuthor>,
    ) -> Result<String, RemoteError> {
        let url = self.repo_url("git/commits");
        let body = CreateCommitBody {
            message,
            tree: tree_sha,
            parents: vec![parent_sha],
            committer: IdentityBody {
                name: &self.committer.name,
                email: &self.committer.email,
            },
            author: author
                .filter(|a| !a.name.is_empty() && !a.email.is_empty())
                .map(|a| IdentityBody {
                    name: &a.name,
                    email: &a.email,
                }),
        };
        let response: ShaResponse = self
            .execute(|h| self.client.post(&url).headers(h).json(&body))
            .await?;
        Ok(response.sha)
    }

    /// Move the branch ref to `commit_sha`.
    ///
    /// A non-fast-forward rejection (the branch moved concurrently) maps to
    /// `RemoteError::Conflict`.
    pub async fn update_ref(&self, commit_sha: &str) -> Result<(), RemoteError> {
        let url = self.repo_url(&format!("git/refs/heads/{}", self.branch));
        let body = UpdateRefBody { sha: commit_sha };
        let result: Result<serde_json::Value, RemoteError> = self
            .execute(|h| self.client.patch(&url).headers(h).json(&body))
            .await;

        match result {
            Ok(_) => Ok(()),
            // GitHub reports non-fast-forward ref updates as 422 on this
            // endpoint; 409 covers object-level conflicts.
            Err(RemoteError::Api { status, body }) if status == 409 || status == 422 => {
                Err(RemoteError::Conflict(body))
            }
            Err(e) => Err(e),
        }
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.repository, path)
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
                RemoteError::AuthFailed("token contains invalid header characters".into())
            })?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Issue a request with the in-client retry budget applied.
    ///
    /// `build` constructs a fresh request per attempt; only transient
    /// failures consume further attempts.
    async fn execute<T, F>(&self, build: F) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        F: Fn(HeaderMap) -> RequestBuilder,
    {
        let headers = self.headers()?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send(build(headers.clone())).await {
                Err(e)
                    if matches!(e, RemoteError::Transient { .. } | RemoteError::Network(_))
                        && attempt < REQUEST_ATTEMPTS =>
                {
                    warn!(attempt, error = %e, "transient API failure, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                other => return other,
            }
        }
    }

    /// Send one request and map the response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| RemoteError::Api {
                status: status.as_u16(),
                body: format!("failed to parse response: {}", e),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_failure(status, body))
        }
    }
}

/// Map a non-success response to the error taxonomy.
fn classify_failure(status: StatusCode, body: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::AuthFailed(body),
        StatusCode::NOT_FOUND => RemoteError::NotFound(body),
        _ if status.is_server_error() => RemoteError::Transient {
            status: status.as_u16(),
            body,
        },
        _ => RemoteError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl ContentRemote for GitHubRemote {
    async fn fetch_tree(&self) -> Result<RemoteTree, RemoteError> {
        let commit_sha = self.current_commit_sha().await?;
        let tree_sha = self.tree_sha_for_commit(&commit_sha).await?;
        self.recursive_tree(&tree_sha).await
    }

    async fn commit_changes(
        &self,
        changes: &ChangeSet,
        message: &str,
        author: Option<&CommitAuthor>,
    ) -> Result<String, RemoteError> {
        let head_sha = self.current_commit_sha().await?;
        let base_tree_sha = self.tree_sha_for_commit(&head_sha).await?;

        let mut entries = Vec::with_capacity(changes.len());
        for (path, change) in changes.iter() {
            let sha = match change {
                Change::Write(content) => {
                    let sha = self.create_blob(content).await?;
                    debug!(path, blob = %sha, "created blob");
                    Some(sha)
                }
                Change::Delete => None,
            };
            entries.push(TreeEntry::new(path, sha));
        }

        let new_tree_sha = self.create_tree(entries, &base_tree_sha).await?;
        let new_commit_sha = self
            .create_commit(&new_tree_sha, &head_sha, message, author)
            .await?;
        self.update_ref(&new_commit_sha).await?;

        debug!(commit = %new_commit_sha, parent = %head_sha, "branch ref updated");
        Ok(new_commit_sha)
    }

    async fn check_connection(&self) -> Result<RepoInfo, RemoteError> {
        let url = format!("{}/repos/{}", self.api_base, self.repository);
        self.execute(|h| self.client.get(&url).headers(h)).await
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// One entry in a tree-creation request.
///
/// `sha: None` serializes as an explicit JSON `null`, which tells GitHub to
/// delete the path relative to the base tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    path: String,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: Option<String>,
}

impl TreeEntry {
    /// Build a blob entry; `sha: None` marks a deletion.
    pub fn new(path: impl Into<String>, sha: Option<String>) -> Self {
        Self {
            path: path.into(),
            mode: BLOB_MODE,
            kind: "blob",
            sha,
        }
    }
}

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntry>,
}

/// Name/email pair for committer and author blocks.
#[derive(Serialize)]
struct IdentityBody<'a> {
    name: &'a str,
    email: &'a str,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
    committer: IdentityBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<IdentityBody<'a>>,
}

/// Request body for moving the branch ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
}

/// `{sha}` response shared by blob/tree/commit creation.
#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

/// Response for the branch ref lookup.
#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

/// Response for a commit lookup (only the tree pointer is used).
#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaObject,
}

/// Response for a recursive tree listing.
#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    /// Absent for submodule (commit) entries
    sha: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committer() -> CommitAuthor {
        CommitAuthor::new("Content Sync", "sync@example.com").unwrap()
    }

    #[test]
    fn repo_url_format() {
        let remote = GitHubRemote::new("octocat/blog", "main", "token", committer()).unwrap();
        assert_eq!(
            remote.repo_url("git/blobs"),
            "https://api.github.com/repos/octocat/blog/git/blobs"
        );
        assert_eq!(
            remote.repo_url("git/ref/heads/main"),
            "https://api.github.com/repos/octocat/blog/git/ref/heads/main"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let remote =
            GitHubRemote::new("octocat/blog", "main", "ghp_secret123", committer()).unwrap();
        let output = format!("{:?}", remote);
        assert!(!output.contains("ghp_secret123"));
        assert!(output.contains("octocat/blog"));
    }

    #[test]
    fn classify_failure_taxonomy() {
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "bad".into()),
            RemoteError::AuthFailed(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "denied".into()),
            RemoteError::AuthFailed(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "missing".into()),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, "oops".into()),
            RemoteError::Transient { status: 502, .. }
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNPROCESSABLE_ENTITY, "invalid".into()),
            RemoteError::Api { status: 422, .. }
        ));
    }

    #[test]
    fn tree_entry_deletion_serializes_null_sha() {
        let entry = TreeEntry::new("content/old.md", None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sha"], serde_json::Value::Null);
        assert_eq!(json["mode"], "100644");
        assert_eq!(json["type"], "blob");
    }

    #[test]
    fn commit_body_omits_empty_author() {
        let body = CreateCommitBody {
            message: "msg",
            tree: "t1",
            parents: vec!["p1"],
            committer: IdentityBody {
                name: "CMS",
                email: "cms@example.com",
            },
            author: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("author").is_none());
        assert_eq!(json["committer"]["name"], "CMS");
        assert_eq!(json["parents"], serde_json::json!(["p1"]));
    }
}
