//! sync
//!
//! The sync job: drains the pending batch, diffs local content against the
//! remote tree, and commits the difference atomically.
//!
//! # Execution contract
//!
//! At most one job instance runs at a time; a trigger that arrives while a
//! run is active is coalesced, never executed concurrently (parallel runs
//! could race on the branch ref). The batch is drained first, so a
//! scheduled run that fires after an earlier run already consumed the batch
//! is a no-op. One run makes up to three attempts over the diff-and-commit
//! phase with escalating backoff; only retryable failures (transient
//! network/server errors and ref conflicts) consume further attempts.
//!
//! The batch is drained before the commit is confirmed: if every attempt
//! fails, the batched messages and authors are gone, while the underlying
//! file changes remain recoverable on the next diff. This at-most-once
//! metadata trade-off is deliberate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::batch::{PendingEvent, PendingStore};
use crate::collector::{ChangeCollector, CollectError};
use crate::remote::{ContentRemote, RemoteError};
use crate::types::CommitAuthor;

/// Total attempts per run.
const DEFAULT_ATTEMPTS: u32 = 3;

/// Escalating delays before attempts 2 and 3 (and any beyond).
const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(60),
    Duration::from_secs(120),
    Duration::from_secs(300),
];

/// Fallback commit-message header when the batch carries mixed messages.
const MULTI_MESSAGE_HEADER: &str = "Update content";

/// Errors from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Collect(#[from] CollectError),
}

impl SyncError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Local I/O failures are not retried; the working set is not going to
    /// repair itself between attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_retryable(),
            SyncError::Collect(_) => false,
        }
    }
}

/// What a sync run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another run was active; this trigger was absorbed.
    Coalesced,
    /// Nothing pending; the batch was already drained or never filled.
    Idle,
    /// Events were pending but produced no net file difference.
    Clean,
    /// A commit landed and the branch ref moved.
    Committed {
        /// New commit SHA
        sha: String,
        /// Number of changed paths in the commit
        files: usize,
    },
}

/// Schedules a sync run after the configured debounce delay.
///
/// Implemented by [`Debouncer`]; the recorder only sees this seam.
pub trait JobScheduler: Send + Sync {
    /// Request a (debounced) sync run.
    fn schedule(&self);
}

/// The retryable unit of work that drains the batch and commits changes.
pub struct SyncJob {
    store: Arc<dyn PendingStore>,
    remote: Arc<dyn ContentRemote>,
    collector: ChangeCollector,
    /// Uniqueness guard; `try_lock` failure means a run is already active.
    running: Mutex<()>,
    max_attempts: u32,
    backoff: Vec<Duration>,
}

impl SyncJob {
    /// Create a job with the default attempt budget and backoff schedule.
    pub fn new(
        store: Arc<dyn PendingStore>,
        remote: Arc<dyn ContentRemote>,
        collector: ChangeCollector,
    ) -> Self {
        Self {
            store,
            remote,
            collector,
            running: Mutex::new(()),
            max_attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF.to_vec(),
        }
    }

    /// Override the backoff schedule (tests use zero delays).
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Override the attempt budget.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Execute one sync run.
    ///
    /// Drains the batch once, up front; the retry loop re-runs the
    /// diff-and-commit phase against the held batch, so each attempt
    /// re-reads the remote head rather than reusing a stale tree.
    pub async fn run(&self) -> Result<SyncOutcome, SyncError> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("sync already in progress, coalescing trigger");
            return Ok(SyncOutcome::Coalesced);
        };

        let batch = self.store.pull();
        if batch.is_empty() {
            debug!("nothing pending, skipping sync");
            return Ok(SyncOutcome::Idle);
        }

        let message = build_commit_message(&batch);
        let author = resolve_author(&batch);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(&message, author.as_ref()).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(attempt, error = %e, delay_secs = delay.as_secs(), "sync attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(attempt, error = %e, "sync failed, pending batch is lost");
                    return Err(e);
                }
            }
        }
    }

    /// One diff-and-commit attempt. Re-fetches the remote tree every time.
    async fn attempt(
        &self,
        message: &str,
        author: Option<&CommitAuthor>,
    ) -> Result<SyncOutcome, SyncError> {
        let remote_tree = self.remote.fetch_tree().await?;
        let changes = self.collector.collect(&remote_tree)?;

        if changes.is_empty() {
            info!("no file changes detected, skipping commit");
            return Ok(SyncOutcome::Clean);
        }

        let files = changes.len();
        let sha = self.remote.commit_changes(&changes, message, author).await?;
        info!(commit = %sha, files, "content synced");
        Ok(SyncOutcome::Committed { sha, files })
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).saturating_sub(1);
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Synthesize the commit message for a drained batch.
///
/// A batch whose events all share one message uses it verbatim; otherwise a
/// summary header is followed by one bullet per distinct message, first-seen
/// order, deduplicated.
pub fn build_commit_message(batch: &[PendingEvent]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut messages: Vec<&str> = Vec::new();
    for event in batch {
        if seen.insert(event.message.as_str()) {
            messages.push(&event.message);
        }
    }

    match messages.as_slice() {
        [] => MULTI_MESSAGE_HEADER.to_string(),
        [single] => (*single).to_string(),
        many => {
            let bullets: Vec<String> = many.iter().map(|m| format!("- {}", m)).collect();
            format!("{}\n\n{}", MULTI_MESSAGE_HEADER, bullets.join("\n"))
        }
    }
}

/// Resolve the commit author for a drained batch.
///
/// The most recent event carrying an author wins (newest-to-oldest scan);
/// with none, the commit is authored anonymously via the committer identity.
pub fn resolve_author(batch: &[PendingEvent]) -> Option<CommitAuthor> {
    batch.iter().rev().find_map(|event| event.author.clone())
}

/// Debounced scheduler backing [`JobScheduler`].
///
/// A pending flag suppresses re-scheduling while a run is already queued;
/// duplicate triggers after the flag clears are absorbed by the job's own
/// empty-batch no-op, so no explicit cancellation is needed. Must be used
/// inside a tokio runtime.
#[derive(Clone)]
pub struct Debouncer {
    job: Arc<SyncJob>,
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl Debouncer {
    /// Create a debouncer that runs `job` after `delay`.
    pub fn new(job: Arc<SyncJob>, delay: Duration) -> Self {
        Self {
            job,
            delay,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl JobScheduler for Debouncer {
    fn schedule(&self) {
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let job = Arc::clone(&self.job);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::SeqCst);
            if let Err(e) = job.run().await {
                error!(error = %e, "scheduled sync failed");
            }
        });
    }
}
