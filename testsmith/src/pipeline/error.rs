//! Stage failure types and boundary classification.
//!
//! Collaborators raise their own typed errors; this module is where those
//! errors are mapped onto [`ErrorClass`] values. Classification lives at the
//! executor boundary so that no collaborator can decide its own retry
//! semantics.

use crate::provider::{GeneratorError, RepositoryError, RetrieverError};
use crate::retry::ErrorClass;
use thiserror::Error;

/// A classified stage failure.
#[derive(Debug, Clone, Error)]
#[error("{class}: {detail}")]
pub struct StageFailure {
    /// Classification fed to the retry policy.
    pub class: ErrorClass,
    /// Human-readable detail persisted on the job for operators.
    pub detail: String,
}

impl StageFailure {
    pub fn new(class: ErrorClass, detail: impl Into<String>) -> Self {
        Self {
            class,
            detail: detail.into(),
        }
    }

    /// Failure for a collaborator call that exceeded its stage deadline.
    pub fn timed_out(what: &str, secs: u64) -> Self {
        Self::new(
            ErrorClass::CollaboratorTimeout,
            format!("{what} exceeded {secs}s deadline"),
        )
    }
}

/// Disqualification of an event by the RECEIVE stage.
///
/// Not an error class: disqualified jobs are SKIPPED without consulting the
/// retry policy.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct Disqualified(pub String);

impl From<RetrieverError> for StageFailure {
    fn from(err: RetrieverError) -> Self {
        match &err {
            RetrieverError::Unavailable(_) | RetrieverError::QueryFailed(_) => {
                Self::new(ErrorClass::CollaboratorUnavailable, err.to_string())
            }
        }
    }
}

impl From<GeneratorError> for StageFailure {
    fn from(err: GeneratorError) -> Self {
        let class = match &err {
            GeneratorError::Unavailable(_) => ErrorClass::CollaboratorUnavailable,
            GeneratorError::Backend(_) => ErrorClass::GenerationFailed,
        };
        Self::new(class, err.to_string())
    }
}

impl From<RepositoryError> for StageFailure {
    fn from(err: RepositoryError) -> Self {
        let class = match &err {
            RepositoryError::PermissionDenied(_) => ErrorClass::PermissionDenied,
            RepositoryError::RateLimited => ErrorClass::RateLimited,
            RepositoryError::Unavailable(_) => ErrorClass::CollaboratorUnavailable,
            // Collisions are resolved inline by the COMMIT stage; one that
            // still escapes (a persistent collision on the suffixed name) is
            // treated as a transient service anomaly.
            RepositoryError::BranchExists { .. } => ErrorClass::CollaboratorUnavailable,
        };
        Self::new(class, err.to_string())
    }
}
