//! remote
//!
//! Remote version-control tree client.
//!
//! # Architecture
//!
//! The [`ContentRemote`] trait defines the three operations the sync
//! pipeline needs from a hosted repository: fetch the current recursive
//! blob tree, apply a change set as one atomic commit, and probe access.
//! The orchestrator and CLI depend on the trait, never on a concrete
//! client.
//!
//! # Modules
//!
//! - `traits`: the `ContentRemote` trait, error taxonomy, and `RepoInfo`
//! - [`github`]: GitHub implementation over the Git Data API
//! - [`mock`]: in-memory implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use github::{GitHubRemote, TreeEntry};
pub use traits::{ContentRemote, RemoteError, RepoInfo};
