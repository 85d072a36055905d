//! Duplicate admission guard.
//!
//! The guard is a time-bounded set membership check over idempotency keys.
//! When two inbound events carry the same key within the TTL window, exactly
//! one is admitted — the check-and-set is atomic, so concurrent submissions
//! cannot both win.
//!
//! Entries expire after a fixed TTL independent of job lifecycle. A genuinely
//! new event arriving after expiry is treated as new work even if an earlier
//! job for the same key never reached a terminal state. This trades strict
//! exactly-once semantics across long outages for availability.

use crate::event::IdempotencyKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default admission TTL (one hour).
pub const DEFAULT_TTL_SECS: u64 = 3_600;

/// Result of an admission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// First sighting of this key within the TTL window.
    Accepted,
    /// The key was already admitted within the TTL window.
    Duplicate,
}

/// Atomic, TTL-bounded duplicate suppression.
///
/// Backed by a sharded map; `admit` holds the shard lock for the key across
/// the check and the insert, which is what makes concurrent same-key
/// admissions race-free.
pub struct IdempotencyGuard {
    entries: DashMap<IdempotencyKey, Instant>,
    ttl: Duration,
}

impl IdempotencyGuard {
    /// Creates a guard with the given entry TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Attempts to admit a key.
    ///
    /// Atomic check-and-set: returns [`Admission::Accepted`] and records the
    /// admission instant if the key is unseen or its previous admission has
    /// expired, [`Admission::Duplicate`] otherwise.
    pub fn admit(&self, key: &IdempotencyKey) -> Admission {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().elapsed() >= self.ttl {
                    // Expired entry: re-admit and restart the window.
                    occupied.insert(Instant::now());
                    debug!(key = %key, "Expired admission re-admitted");
                    Admission::Accepted
                } else {
                    debug!(key = %key, "Duplicate admission rejected");
                    Admission::Duplicate
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                Admission::Accepted
            }
        }
    }

    /// Removes expired entries and returns how many were dropped.
    ///
    /// Admission correctness does not depend on this — expired entries are
    /// re-admitted lazily — but a periodic purge bounds memory.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, admitted| admitted.elapsed() < self.ttl);
        before - self.entries.len()
    }

    /// Number of live entries (including not-yet-purged expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}
