//! In-flight submission guard
//!
//! Tracks box identifiers whose submission has been dispatched. A second
//! dispatch for the same box while it is tracked is ignored outright.
//! Entries expire a fixed grace period after dispatch, and the deadline is
//! re-armed when the submission completes, so a lost response blocks the
//! box for at most the grace period.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct InFlightSet {
    expiry: Duration,
    /// box_id -> removal deadline
    entries: HashMap<String, Instant>,
}

impl InFlightSet {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            entries: HashMap::new(),
        }
    }

    /// Claim a box for submission
    ///
    /// Returns `false` (and changes nothing) when the box is already tracked.
    pub fn try_insert(&mut self, box_id: &str, now: Instant) -> bool {
        self.purge_expired(now);
        if self.entries.contains_key(box_id) {
            debug!(box_id = %box_id, "Submission already in flight");
            return false;
        }
        self.entries.insert(box_id.to_string(), now + self.expiry);
        true
    }

    /// Submission finished (either way): schedule removal after the grace period
    pub fn complete(&mut self, box_id: &str, now: Instant) {
        if let Some(deadline) = self.entries.get_mut(box_id) {
            *deadline = now + self.expiry;
        }
    }

    /// Number of live entries
    pub fn len(&self, now: Instant) -> usize {
        self.entries.values().filter(|deadline| now < **deadline).count()
    }

    pub fn is_empty(&self, now: Instant) -> bool {
        self.len(now) == 0
    }

    fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, deadline| now < *deadline);
    }
}
