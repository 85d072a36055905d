//! Error classification and retry policy.
//!
//! The policy is a pure decision function: given an error classification and
//! the number of retries already consumed, decide whether to terminate or to
//! retry after a scheduled delay. It holds no clock and no counters, so the
//! same inputs always produce the same decision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a stage failure.
///
/// Classification happens at the executor boundary — collaborators raise
/// their own typed errors, which are mapped onto these classes before any
/// retry decision is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// A collaborator call exceeded its stage timeout.
    CollaboratorTimeout,
    /// A collaborator reported itself unavailable.
    CollaboratorUnavailable,
    /// A collaborator rejected the call due to rate limiting.
    RateLimited,
    /// The generation backend failed to produce content.
    GenerationFailed,
    /// The generated artifact failed structural validation.
    InvalidArtifact,
    /// The collaborator rejected our credentials or permissions.
    PermissionDenied,
    /// The input is permanently malformed; retrying cannot help.
    MalformedInput,
    /// The job exceeded the maximum processing wall-clock bound.
    Stalled,
}

impl ErrorClass {
    /// Returns true for retryable-transient classes.
    ///
    /// A structurally invalid artifact is retryable: regeneration may produce
    /// a valid document. It only becomes terminal once the retry budget is
    /// exhausted, which is the policy's decision, not the class's.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorTimeout
                | Self::CollaboratorUnavailable
                | Self::RateLimited
                | Self::GenerationFailed
                | Self::InvalidArtifact
        )
    }

    /// Stable code persisted on job records and emitted in telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollaboratorTimeout => "collaborator_timeout",
            Self::CollaboratorUnavailable => "collaborator_unavailable",
            Self::RateLimited => "rate_limited",
            Self::GenerationFailed => "generation_failed",
            Self::InvalidArtifact => "invalid_artifact",
            Self::PermissionDenied => "permission_denied",
            Self::MalformedInput => "malformed_input",
            Self::Stalled => "stalled",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a retry decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop retrying; the job moves to a terminal state.
    Terminate,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Default maximum number of retries per job.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff schedule in seconds.
pub const DEFAULT_BACKOFF_SECS: [u64; 3] = [5, 15, 45];

/// Stateless retry policy with a fixed exponential backoff schedule.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Creates a policy with an explicit budget and schedule.
    pub fn new(max_retries: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_retries,
            delays,
        }
    }

    /// Returns the configured maximum retry count.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides what to do about a failure.
    ///
    /// `attempt` is the number of retries already consumed (the job's current
    /// retry count). Terminal classes and an exhausted budget both yield
    /// [`RetryDecision::Terminate`]; otherwise the delay for this attempt is
    /// taken from the schedule, repeating the final entry if the budget
    /// outruns it.
    pub fn decide(&self, class: ErrorClass, attempt: u32) -> RetryDecision {
        if !class.is_retryable() || attempt >= self.max_retries {
            return RetryDecision::Terminate;
        }

        let delay = self
            .delays
            .get(attempt as usize)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO);

        RetryDecision::RetryAfter(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            DEFAULT_BACKOFF_SECS
                .iter()
                .map(|&s| Duration::from_secs(s))
                .collect(),
        )
    }
}
