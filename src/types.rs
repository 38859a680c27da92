//! types
//!
//! Shared domain types for the sync pipeline.
//!
//! # Overview
//!
//! - [`ChangeSet`]: the minimal set of writes and deletions that brings the
//!   remote branch in line with the local working set
//! - [`RemoteTree`]: an immutable snapshot of the remote branch's blobs at
//!   one commit (path → blob SHA)
//! - [`CommitAuthor`]: an optional name/email pair attributed to a commit
//!
//! Paths throughout are repository-root-relative and forward-slash
//! separated, regardless of the local platform.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One entry in a [`ChangeSet`]: new content for a path, or a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create or overwrite the path with these bytes.
    Write(Vec<u8>),
    /// Remove the path from the remote tree.
    Delete,
}

impl Change {
    /// The new content, if this is a write.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Change::Write(bytes) => Some(bytes),
            Change::Delete => None,
        }
    }
}

/// A set of pending writes and deletions, keyed by relative path.
///
/// Keys are unique; iteration order is deterministic (sorted by path).
/// An empty set means local and remote state agree and no commit is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<String, Change>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new or modified content for a path.
    pub fn record_write(&mut self, path: impl Into<String>, content: Vec<u8>) {
        self.entries.insert(path.into(), Change::Write(content));
    }

    /// Record a deletion tombstone for a path.
    pub fn record_delete(&mut self, path: impl Into<String>) {
        self.entries.insert(path.into(), Change::Delete);
    }

    /// Whether any changes are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of changed paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up the change recorded for a path.
    pub fn get(&self, path: &str) -> Option<&Change> {
        self.entries.get(path)
    }

    /// Iterate entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c))
    }
}

/// Snapshot of the tracked blobs at one remote commit.
///
/// Built from a recursive tree listing with tree (directory) entries already
/// filtered out. Never cached across sync attempts: each attempt re-fetches
/// so that concurrent external pushes are diffed against, not overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTree {
    blobs: HashMap<String, String>,
}

impl RemoteTree {
    /// Build a tree from `(path, blob_sha)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            blobs: entries.into_iter().collect(),
        }
    }

    /// The blob SHA recorded for a path, if tracked.
    pub fn sha_for(&self, path: &str) -> Option<&str> {
        self.blobs.get(path).map(String::as_str)
    }

    /// Whether the snapshot tracks no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Number of tracked blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Iterate all `(path, sha)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blobs.iter().map(|(p, s)| (p.as_str(), s.as_str()))
    }
}

/// Commit author attribution.
///
/// Both fields are non-empty by construction; an absent author is modeled as
/// `Option<CommitAuthor>` rather than empty strings, so a commit either
/// carries full attribution or none (committer identity only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    /// Build an author, returning `None` if either field is empty.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let email = email.into();
        if name.is_empty() || email.is_empty() {
            return None;
        }
        Some(Self { name, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_set_last_write_wins() {
        let mut changes = ChangeSet::new();
        changes.record_write("content/a.md", b"one".to_vec());
        changes.record_delete("content/a.md");

        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("content/a.md"), Some(&Change::Delete));
    }

    #[test]
    fn change_set_iterates_in_path_order() {
        let mut changes = ChangeSet::new();
        changes.record_write("b.md", vec![]);
        changes.record_write("a.md", vec![]);

        let paths: Vec<&str> = changes.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.md", "b.md"]);
    }

    #[test]
    fn remote_tree_lookup() {
        let tree = RemoteTree::from_entries([("content/post.md".to_string(), "abc123".to_string())]);

        assert_eq!(tree.sha_for("content/post.md"), Some("abc123"));
        assert_eq!(tree.sha_for("content/other.md"), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn author_rejects_empty_fields() {
        assert!(CommitAuthor::new("", "a@example.com").is_none());
        assert!(CommitAuthor::new("Alice", "").is_none());

        let author = CommitAuthor::new("Alice", "a@example.com").unwrap();
        assert_eq!(author.name, "Alice");
        assert_eq!(author.email, "a@example.com");
    }
}
