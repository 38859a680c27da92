//! batch
//!
//! Durable short-lived queue of pending content-mutation events.
//!
//! # Design
//!
//! The batcher is a single named slot holding an ordered sequence of
//! [`PendingEvent`]. Recording appends and refreshes the slot's
//! time-to-live; draining atomically reads and clears it. The slot is the
//! only shared mutable state between the synchronous event path and the
//! asynchronous sync job, so both operations must be atomic: concurrent
//! record/drain never loses or duplicates an event.
//!
//! A slot that is never drained expires after [`PENDING_TTL`] and is
//! discarded on the next touch rather than growing without bound.
//!
//! The store is an injected dependency ([`PendingStore`]) rather than
//! ambient global state; [`open_store`] resolves the configured backend
//! name.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CommitAuthor;

/// How long an undrained batch survives before being discarded.
pub const PENDING_TTL: Duration = Duration::from_secs(60 * 60);

/// One observed content mutation awaiting sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    /// Commit-message fragment describing the mutation
    pub message: String,
    /// Attributed identity, when available and enabled
    pub author: Option<CommitAuthor>,
    /// When the mutation was observed
    pub timestamp: DateTime<Utc>,
}

impl PendingEvent {
    /// Build an event stamped with the current time.
    pub fn now(message: impl Into<String>, author: Option<CommitAuthor>) -> Self {
        Self {
            message: message.into(),
            author,
            timestamp: Utc::now(),
        }
    }
}

/// The single-slot pending-event store.
///
/// Implementations guarantee atomicity of both operations with respect to
/// each other.
pub trait PendingStore: Send + Sync {
    /// Append an event, refreshing the slot's TTL to the full window.
    fn append(&self, event: PendingEvent, ttl: Duration);

    /// Atomically read and clear the slot.
    ///
    /// Returns an empty sequence when nothing is pending or the slot has
    /// expired. Each event is returned at most once.
    fn pull(&self) -> Vec<PendingEvent>;
}

/// Errors resolving a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown pending-store backend '{0}'")]
    UnknownBackend(String),
}

/// Resolve a store backend by configured name.
///
/// `None` or `"memory"` selects the in-process [`MemoryStore`]; anything
/// else is a configuration error rather than a silent fallback.
pub fn open_store(name: Option<&str>) -> Result<std::sync::Arc<dyn PendingStore>, StoreError> {
    match name {
        None | Some("memory") => Ok(std::sync::Arc::new(MemoryStore::new())),
        Some(other) => Err(StoreError::UnknownBackend(other.to_string())),
    }
}

/// In-process single-slot store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Slot>>,
}

#[derive(Debug)]
struct Slot {
    events: Vec<PendingEvent>,
    expires_at: Instant,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingStore for MemoryStore {
    fn append(&self, event: PendingEvent, ttl: Duration) {
        let mut slot = lock(&self.slot);
        let now = Instant::now();

        match slot.as_mut() {
            Some(existing) if existing.expires_at > now => {
                existing.events.push(event);
                existing.expires_at = now + ttl;
            }
            _ => {
                // Empty or expired: start a fresh sequence.
                *slot = Some(Slot {
                    events: vec![event],
                    expires_at: now + ttl,
                });
            }
        }
    }

    fn pull(&self) -> Vec<PendingEvent> {
        let mut slot = lock(&self.slot);
        match slot.take() {
            Some(s) if s.expires_at > Instant::now() => s.events,
            _ => Vec::new(),
        }
    }
}

fn lock(slot: &Mutex<Option<Slot>>) -> std::sync::MutexGuard<'_, Option<Slot>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
