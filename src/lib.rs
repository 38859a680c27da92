//! ghsync - mirrors content-repository mutations to a GitHub branch
//!
//! ghsync observes content mutations fired by a host application, batches
//! them across a debounce window, diffs the local working set against the
//! remote branch's tree, and lands the difference as a single atomic commit
//! through the GitHub Git Data API.
//!
//! # Architecture
//!
//! Data flows through the modules leaves-first:
//!
//! - [`hash`] - git blob content addressing for local/remote diffing
//! - [`types`] - shared domain types ([`types::ChangeSet`], [`types::RemoteTree`])
//! - [`remote`] - retrying client over the hosted Git Data API
//! - [`collector`] - walks tracked roots and computes the minimal change set
//! - [`batch`] - durable, short-lived queue of pending mutation events
//! - [`events`] - content-mutation observer seam and recorder
//! - [`sync`] - the unique, retryable job that drains, diffs, and commits
//! - [`config`] - configuration schema and loading
//! - [`cli`] - operational commands (check, diff, manual sync)
//!
//! # Correctness Invariants
//!
//! 1. The branch ref moves last: a failed sync never leaves a partial commit
//! 2. At most one sync job runs at a time; concurrent triggers coalesce
//! 3. The remote tree is re-fetched per attempt, never cached across attempts
//! 4. Batch drain is atomic: an event is consumed at most once

pub mod batch;
pub mod cli;
pub mod collector;
pub mod config;
pub mod events;
pub mod hash;
pub mod remote;
pub mod sync;
pub mod types;
