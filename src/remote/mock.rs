//! remote::mock
//!
//! In-memory [`ContentRemote`] for deterministic testing.
//!
//! Stores a remote tree snapshot, records every operation for later
//! verification, and supports scripted failures (including "fail the next N
//! calls" for exercising the orchestrator's retry path).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ContentRemote, RemoteError, RepoInfo};
use crate::types::{Change, ChangeSet, CommitAuthor, RemoteTree};

/// Mock remote for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug)]
struct MockRemoteInner {
    /// Tree returned by `fetch_tree`.
    tree: RemoteTree,
    /// Recorded operations in call order.
    operations: Vec<MockOperation>,
    /// Scripted failure, consumed per matching call while `fail_times > 0`.
    fail_on: Option<FailOn>,
    fail_times: usize,
    /// Next commit SHA suffix.
    next_commit: u64,
}

/// Which operation should fail, and with what error.
#[derive(Debug, Clone)]
pub enum FailOn {
    FetchTree(RemoteError),
    CommitChanges(RemoteError),
    CheckConnection(RemoteError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone)]
pub enum MockOperation {
    FetchTree,
    CommitChanges {
        /// Paths written, in path order
        writes: Vec<String>,
        /// Paths deleted, in path order
        deletes: Vec<String>,
        message: String,
        author: Option<CommitAuthor>,
    },
    CheckConnection,
}

impl MockRemote {
    /// Create a mock with an empty remote tree.
    pub fn new() -> Self {
        Self::with_tree(RemoteTree::default())
    }

    /// Create a mock serving the given tree snapshot.
    pub fn with_tree(tree: RemoteTree) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRemoteInner {
                tree,
                operations: Vec::new(),
                fail_on: None,
                fail_times: 0,
                next_commit: 1,
            })),
        }
    }

    /// Replace the served tree snapshot.
    pub fn set_tree(&self, tree: RemoteTree) {
        self.lock().tree = tree;
    }

    /// Fail every matching call until cleared.
    pub fn fail_on(&self, fail: FailOn) {
        let mut inner = self.lock();
        inner.fail_on = Some(fail);
        inner.fail_times = usize::MAX;
    }

    /// Fail the next `times` matching calls, then succeed.
    pub fn fail_times(&self, fail: FailOn, times: usize) {
        let mut inner = self.lock();
        inner.fail_on = Some(fail);
        inner.fail_times = times;
    }

    /// All recorded operations in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Recorded commit operations only.
    pub fn commits(&self) -> Vec<MockOperation> {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::CommitChanges { .. }))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure<F>(&self, matches: F) -> Option<RemoteError>
    where
        F: Fn(&FailOn) -> Option<&RemoteError>,
    {
        let mut inner = self.lock();
        if inner.fail_times == 0 {
            return None;
        }
        let err = inner.fail_on.as_ref().and_then(|f| matches(f)).cloned();
        if err.is_some() {
            inner.fail_times -= 1;
        }
        err
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRemote for MockRemote {
    async fn fetch_tree(&self) -> Result<RemoteTree, RemoteError> {
        self.lock().operations.push(MockOperation::FetchTree);
        if let Some(err) = self.take_failure(|f| match f {
            FailOn::FetchTree(e) => Some(e),
            _ => None,
        }) {
            return Err(err);
        }
        Ok(self.lock().tree.clone())
    }

    async fn commit_changes(
        &self,
        changes: &ChangeSet,
        message: &str,
        author: Option<&CommitAuthor>,
    ) -> Result<String, RemoteError> {
        let mut writes = Vec::new();
        let mut deletes = Vec::new();
        for (path, change) in changes.iter() {
            match change {
                Change::Write(_) => writes.push(path.to_string()),
                Change::Delete => deletes.push(path.to_string()),
            }
        }
        self.lock().operations.push(MockOperation::CommitChanges {
            writes,
            deletes,
            message: message.to_string(),
            author: author.cloned(),
        });

        if let Some(err) = self.take_failure(|f| match f {
            FailOn::CommitChanges(e) => Some(e),
            _ => None,
        }) {
            return Err(err);
        }

        let mut inner = self.lock();
        let sha = format!("commit{:07}", inner.next_commit);
        inner.next_commit += 1;
        Ok(sha)
    }

    async fn check_connection(&self) -> Result<RepoInfo, RemoteError> {
        self.lock().operations.push(MockOperation::CheckConnection);
        if let Some(err) = self.take_failure(|f| match f {
            FailOn::CheckConnection(e) => Some(e),
            _ => None,
        }) {
            return Err(err);
        }
        Ok(RepoInfo {
            name: "blog".to_string(),
            full_name: "mock/blog".to_string(),
            permissions: serde_json::json!({"push": true}),
        })
    }
}
