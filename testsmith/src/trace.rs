//! Correlation identifiers for end-to-end traceability.
//!
//! A [`CorrelationId`] is minted once when a trigger event is admitted and is
//! carried by the event, its job, every audit entry, and every transition
//! record produced while handling that unit of work. Querying logs for one
//! correlation id reconstructs the full lifecycle of one event.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier propagated across all records produced for one trigger event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mints a new random correlation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.0)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
