//! events
//!
//! Content-mutation observer seam and the event recorder.
//!
//! # Design
//!
//! The host application (the CMS) fires typed mutation notifications. This
//! module models them as the [`ContentEvent`] capability set (a category
//! identifier plus optional commit-message and identity accessors) so the
//! recorder dispatches through one interface instead of matching on
//! concrete host types.
//!
//! Recording is synchronous and cheap: filter, append to the pending store,
//! schedule the debounced sync job. No network calls happen on this path.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::batch::{PendingEvent, PendingStore, PENDING_TTL};
use crate::config::SyncConfig;
use crate::sync::JobScheduler;
use crate::types::CommitAuthor;

/// The identity that triggered a content mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name, when the host knows one
    pub name: Option<String>,
    /// Email address
    pub email: String,
}

/// A typed content-mutation notification from the host application.
pub trait ContentEvent {
    /// Stable category identifier, e.g. `"entry.saved"`. Used both for the
    /// ignore list and as the fallback commit message.
    fn category(&self) -> &str;

    /// A human-readable commit message for this mutation, if the event
    /// provides one.
    fn commit_message(&self) -> Option<String> {
        None
    }

    /// The authenticated identity that triggered the mutation, if any.
    fn identity(&self) -> Option<Identity> {
        None
    }
}

/// Records observed mutations into the pending store and schedules syncs.
pub struct EventRecorder {
    store: Arc<dyn PendingStore>,
    scheduler: Arc<dyn JobScheduler>,
    ignored: HashSet<String>,
    use_authenticated: bool,
}

impl EventRecorder {
    /// Register a recorder for this configuration.
    ///
    /// Returns `None` when syncing is disabled; the enabled flag is checked
    /// once here, at subscription time, not per event.
    pub fn subscribe(
        config: &SyncConfig,
        store: Arc<dyn PendingStore>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(Self {
            store,
            scheduler,
            ignored: config.ignored_events.iter().cloned().collect(),
            use_authenticated: config.use_authenticated,
        })
    }

    /// Record one observed mutation.
    ///
    /// Block-listed categories are dropped entirely: never stored, never
    /// scheduled.
    pub fn record(&self, event: &dyn ContentEvent) {
        let category = event.category();
        if self.ignored.contains(category) {
            debug!(category, "content event ignored");
            return;
        }

        let message = event
            .commit_message()
            .unwrap_or_else(|| category.to_string());
        let author = if self.use_authenticated {
            event.identity().and_then(|id| {
                let email = id.email;
                let name = id.name.unwrap_or_else(|| email.clone());
                CommitAuthor::new(name, email)
            })
        } else {
            None
        };

        debug!(category, message, "content event recorded");
        self.store
            .append(PendingEvent::now(message, author), PENDING_TTL);
        self.scheduler.schedule();
    }
}
