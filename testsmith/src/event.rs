//! Trigger event model.
//!
//! A [`TriggerEvent`] is the immutable record of one inbound request: an
//! issue that was created with, or labeled with, the trigger label. Events
//! are created once at the inbound boundary, normalized (body truncation,
//! key derivation) in the constructor, and never mutated afterwards.
//!
//! Authenticity validation of the inbound payload happens before this
//! boundary and is out of scope here; the event only carries the opaque
//! token it arrived with.

use crate::trace::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Maximum retained body length. Longer bodies are truncated and flagged.
pub const MAX_BODY_LEN: usize = 5_000;

/// Label that marks an issue for test case generation.
pub const TRIGGER_LABEL: &str = "generate-tests";

/// Kind of inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The issue was created already carrying the trigger label.
    Created,
    /// The trigger label was added to an existing issue.
    Tagged,
}

impl EventKind {
    /// Returns a stable string form, used in key derivation and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Tagged => "tagged",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable external identity of the triggering issue.
///
/// Two events with the same natural key refer to the same piece of external
/// work; the key is the input to duplicate detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Repository full name, `owner/repo`.
    pub repository: String,
    /// Issue number within the repository.
    pub issue_number: u64,
}

impl NaturalKey {
    pub fn new(repository: impl Into<String>, issue_number: u64) -> Self {
        Self {
            repository: repository.into(),
            issue_number,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.issue_number)
    }
}

/// Deterministic duplicate-detection key.
///
/// SHA-256 over `{repository}-{issue_number}-{kind}`, rendered as 64
/// lowercase hex characters. The event kind participates so that a `created`
/// and a later `tagged` event for the same issue are distinct admissions.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for a natural key + event kind pair.
    pub fn derive(natural_key: &NaturalKey, kind: EventKind) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{}-{}-{}",
                natural_key.repository,
                natural_key.issue_number,
                kind.as_str()
            )
            .as_bytes(),
        );
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests are noise in debug output; the prefix is enough to
        // correlate with the store.
        write!(f, "IdempotencyKey({}…)", &self.0[..12.min(self.0.len())])
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable record of one inbound trigger event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// How the trigger arrived.
    pub kind: EventKind,
    /// Stable identity of the triggering issue.
    pub natural_key: NaturalKey,
    /// Issue title.
    pub title: String,
    /// Issue body, truncated to [`MAX_BODY_LEN`].
    pub body: String,
    /// True when the original body exceeded [`MAX_BODY_LEN`].
    pub body_truncated: bool,
    /// Labels present on the issue at event time.
    pub labels: Vec<String>,
    /// Opaque authenticity token carried with the inbound request.
    pub auth_token: String,
    /// When the event was received.
    pub received_at: DateTime<Utc>,
    /// Correlation id shared with the job and all derived records.
    pub correlation_id: CorrelationId,
}

impl TriggerEvent {
    /// Creates a normalized event from raw inbound fields.
    ///
    /// Mints the event and correlation identifiers, stamps the receive time,
    /// and truncates the body on a char boundary if it exceeds
    /// [`MAX_BODY_LEN`].
    pub fn new(
        kind: EventKind,
        natural_key: NaturalKey,
        title: impl Into<String>,
        body: impl Into<String>,
        labels: Vec<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let (body, body_truncated) = if body.chars().count() > MAX_BODY_LEN {
            (body.chars().take(MAX_BODY_LEN).collect(), true)
        } else {
            (body, false)
        };

        Self {
            event_id: Uuid::new_v4(),
            kind,
            natural_key,
            title: title.into(),
            body,
            body_truncated,
            labels,
            auth_token: auth_token.into(),
            received_at: Utc::now(),
            correlation_id: CorrelationId::new(),
        }
    }

    /// Returns the duplicate-detection key for this event.
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::derive(&self.natural_key, self.kind)
    }

    /// Returns true if the issue carries the trigger label.
    pub fn has_trigger_label(&self) -> bool {
        self.labels.iter().any(|l| l == TRIGGER_LABEL)
    }
}
