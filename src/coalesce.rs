//! Per‑key request coalescing: at most one live job per key, latest wins.
//!
//! The [`JobTable`] owns every in‑flight job, keyed by the caller‑supplied
//! coalescing key. Each key maps to a slot holding a monotonic generation
//! counter and the single non‑terminal job, if any. Submitting under a key
//! bumps the counter and displaces the prior pending job; its caller
//! resolves with "no value" immediately rather than waiting for the newer
//! job to finish.
//!
//! Generation equality at delivery time is the single staleness test.
//! Render durations are not monotonic in completion order, so comparing
//! anything time‑based would race; a result is delivered if and only if its
//! generation still equals the slot's current one.
//!
//! Slots are never evicted. Evicting an idle slot would reset its counter
//! and let a cancelled job's late result collide with a fresh submission
//! that reused the same generation number.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    error::{Error, Result},
    job::{Generation, JobState},
};

/// What a render future ultimately resolves with: PNG bytes, "no value"
/// for superseded jobs, or a typed failure.
pub(crate) type RenderReply = Result<Option<Vec<u8>>>;

/// The single non‑terminal job under a key.
struct PendingJob {
    generation: Generation,
    state: JobState,
    reply: oneshot::Sender<RenderReply>,
}

#[derive(Default)]
struct Slot {
    /// Latest generation handed out for this key. Monotonic for the table's
    /// lifetime.
    generation: Generation,
    pending: Option<PendingJob>,
}

/// Owner of all in‑flight jobs, shared between the facade and the engine
/// worker.
#[derive(Default)]
pub(crate) struct JobTable {
    slots: DashMap<String, Slot>,
}

impl JobTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new job under `key`, displacing any prior pending job.
    ///
    /// The displaced caller resolves with `Ok(None)` at this point; it does
    /// not wait for the newer job to complete. Returns the generation
    /// assigned to the new job and the receiver its caller awaits.
    pub(crate) fn submit(&self, key: &str) -> (Generation, oneshot::Receiver<RenderReply>) {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slots.entry(key.to_owned()).or_default();
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(prior) = slot.pending.take() {
            debug_assert!(!prior.state.is_terminal());
            debug!(
                key,
                displaced = prior.generation,
                was = ?prior.state,
                state = ?JobState::Superseded,
                by = generation,
                "superseding pending job"
            );
            let _ = prior.reply.send(Ok(None));
        }
        slot.pending = Some(PendingJob {
            generation,
            state: JobState::Pending,
            reply: tx,
        });
        (generation, rx)
    }

    /// Transition a job to `Running` when the engine picks it up.
    ///
    /// Returns `false` when the job was superseded or cancelled while still
    /// queued; the engine skips the typesetting work for such jobs.
    pub(crate) fn mark_running(&self, key: &str, generation: Generation) -> bool {
        let Some(mut slot) = self.slots.get_mut(key) else {
            return false;
        };
        match slot.pending.as_mut() {
            Some(job) if job.generation == generation => {
                job.state = JobState::Running;
                true
            }
            _ => false,
        }
    }

    /// Deliver an engine result for `(key, generation)`.
    ///
    /// A generation mismatch means the caller already resolved via
    /// supersession or cancellation; the result is discarded silently, by
    /// design.
    pub(crate) fn deliver(&self, key: &str, generation: Generation, result: Result<Vec<u8>>) {
        let Some(mut slot) = self.slots.get_mut(key) else {
            debug!(key, generation, "discarding result for unknown key");
            return;
        };
        if slot
            .pending
            .as_ref()
            .is_some_and(|job| job.generation == generation)
        {
            if let Some(job) = slot.pending.take() {
                debug!(key, generation, state = ?JobState::Completed, "delivering result");
                let _ = job.reply.send(result.map(Some));
            }
        } else {
            debug!(key, generation, "discarding stale result");
        }
    }

    /// Cancel the pending job under `key`, if any.
    ///
    /// Idempotent: unknown keys and keys with no live job are a no‑op. A
    /// cancelled job's caller fails with [`Error::Cancelled`] immediately;
    /// if the engine already started the job, its eventual result is
    /// discarded by the generation check in [`JobTable::deliver`].
    pub(crate) fn cancel(&self, key: &str) {
        let Some(mut slot) = self.slots.get_mut(key) else {
            return;
        };
        if let Some(job) = slot.pending.take() {
            debug!(
                key,
                generation = job.generation,
                was = ?job.state,
                state = ?JobState::Cancelled,
                "cancelling pending job"
            );
            let _ = job.reply.send(Err(Error::Cancelled));
        }
    }

    /// Fail every pending job with [`Error::Closed`].
    ///
    /// Used on teardown so callers never hang on a queue nobody drains.
    pub(crate) fn close(&self) {
        for mut slot in self.slots.iter_mut() {
            if let Some(job) = slot.pending.take() {
                let _ = job.reply.send(Err(Error::Closed));
            }
        }
    }
}
