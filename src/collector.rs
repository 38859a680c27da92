//! collector
//!
//! Diffs the local working set against a remote tree snapshot.
//!
//! # Algorithm
//!
//! For each configured root directory (relative to a fixed base path):
//! enumerate every file recursively, dot files included, hash its content
//! with [`crate::hash::blob_sha`], and record it as a write when the remote
//! tree has no entry for that path or reports a different SHA. Every remote
//! path under a tracked root's `root/` prefix that was not visited locally
//! becomes a deletion. A root that does not exist locally is skipped
//! silently; a directory may legitimately be absent.
//!
//! Running the collector twice against unchanged state yields an empty
//! [`ChangeSet`] both times; applying a computed set remotely makes the
//! next diff empty.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::hash::blob_sha;
use crate::types::{ChangeSet, RemoteTree};

/// Errors from local working-set enumeration.
///
/// A missing configured root is not an error; read and traversal failures
/// on paths that do exist propagate.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Walks configured roots and computes the minimal change set.
#[derive(Debug, Clone)]
pub struct ChangeCollector {
    /// Local base path all roots and relative paths resolve against
    base: PathBuf,
    /// Tracked root directories, relative to `base`
    roots: Vec<String>,
}

impl ChangeCollector {
    /// Create a collector over `roots`, resolved against `base`.
    pub fn new(base: impl Into<PathBuf>, roots: Vec<String>) -> Self {
        Self {
            base: base.into(),
            roots,
        }
    }

    /// Compare local files against `remote` and return the differences.
    pub fn collect(&self, remote: &RemoteTree) -> Result<ChangeSet, CollectError> {
        let mut changes = ChangeSet::new();
        let mut seen: HashSet<String> = HashSet::new();

        for root in &self.roots {
            let dir = self.base.join(root);
            if !dir.is_dir() {
                debug!(root, "tracked root absent locally, skipping");
                continue;
            }
            self.visit_dir(&dir, remote, &mut changes, &mut seen)?;
        }

        // Remote paths under a tracked root that no longer exist locally.
        for (path, _) in remote.iter() {
            if seen.contains(path) {
                continue;
            }
            if self
                .roots
                .iter()
                .any(|root| path.starts_with(&format!("{}/", root)))
            {
                changes.record_delete(path);
            }
        }

        Ok(changes)
    }

    fn visit_dir(
        &self,
        dir: &Path,
        remote: &RemoteTree,
        changes: &mut ChangeSet,
        seen: &mut HashSet<String>,
    ) -> Result<(), CollectError> {
        let entries = fs::read_dir(dir).map_err(|e| CollectError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| CollectError::ReadDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();

            if path.is_dir() {
                self.visit_dir(&path, remote, changes, seen)?;
                continue;
            }

            let relative = self.relative_path(&path);
            let content = fs::read(&path).map_err(|e| CollectError::ReadFile {
                path: path.clone(),
                source: e,
            })?;

            let local_sha = blob_sha(&content);
            let unchanged = remote.sha_for(&relative) == Some(local_sha.as_str());
            if !unchanged {
                changes.record_write(relative.clone(), content);
            }
            seen.insert(relative);
        }

        Ok(())
    }

    /// Relative, forward-slash-separated path under the base.
    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
