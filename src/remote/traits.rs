//! remote::traits
//!
//! The `ContentRemote` trait and error taxonomy for remote operations.
//!
//! # Design
//!
//! The trait is async because every operation involves network I/O. The
//! orchestrator depends only on this seam, never on a concrete client, so
//! tests can substitute [`crate::remote::mock::MockRemote`].
//!
//! # Error Handling
//!
//! `RemoteError` distinguishes failures the retry machinery treats
//! differently:
//! - `AuthFailed` / `NotFound`: fatal, never retried
//! - `Transient` / `Network`: retried within the client's per-call budget
//! - `Conflict`: not retried in-client; retryable at the job level, where a
//!   fresh attempt re-reads the branch head

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{ChangeSet, CommitAuthor, RemoteTree};

/// Errors from remote version-control operations.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Token rejected or lacking permissions (401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Repository, branch, or object missing (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Ref update rejected, e.g. the branch moved under us.
    #[error("ref update conflict: {0}")]
    Conflict(String),

    /// Server-side failure (5xx); safe to retry.
    #[error("transient API error: {status} - {body}")]
    Transient {
        /// HTTP status code
        status: u16,
        /// Response body for diagnostics
        body: String,
    },

    /// Any other non-success response.
    #[error("API error: {status} - {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body for diagnostics
        body: String,
    },

    /// Connection, DNS, or timeout failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),
}

impl RemoteError {
    /// Whether a fresh sync attempt could plausibly succeed.
    ///
    /// Conflicts count: the next attempt re-reads the moved branch head.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Transient { .. } | RemoteError::Network(_) | RemoteError::Conflict(_)
        )
    }
}

/// Repository metadata from the connectivity check.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    /// Repository name
    pub name: String,
    /// Owner-qualified name ("owner/repo")
    pub full_name: String,
    /// Permission map for the authenticated token
    #[serde(default)]
    pub permissions: serde_json::Value,
}

/// Remote content repository operations used by the orchestrator.
///
/// Implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ContentRemote: Send + Sync {
    /// Fetch the full recursive blob tree at the configured branch head.
    ///
    /// Called once per sync attempt; results must never be cached across
    /// attempts.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or branch is missing
    /// - `AuthFailed` if the token is rejected
    /// - `Transient` / `Network` on server or connection failure
    async fn fetch_tree(&self) -> Result<RemoteTree, RemoteError>;

    /// Apply a change set as one atomic commit and move the branch ref.
    ///
    /// Either every change lands in exactly one commit, or the branch ref is
    /// untouched. Returns the new commit SHA.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the ref update is rejected (branch moved concurrently)
    /// - plus the failure modes of `fetch_tree`
    async fn commit_changes(
        &self,
        changes: &ChangeSet,
        message: &str,
        author: Option<&CommitAuthor>,
    ) -> Result<String, RemoteError>;

    /// Probe repository access and permissions.
    async fn check_connection(&self) -> Result<RepoInfo, RemoteError>;
}
