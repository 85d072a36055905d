//! Transient per-stage execution results.

use super::error::StageFailure;
use crate::job::Stage;
use std::time::Duration;

/// How one stage execution ended.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage completed; move the pointer forward.
    Advanced,
    /// The input was disqualified; the job is skipped, no retry.
    Skipped(String),
    /// The stage failed with a classified error.
    Failed(StageFailure),
}

/// Result of executing one stage once.
///
/// Lives only long enough to decide the next transition and to be logged;
/// never persisted.
#[derive(Debug)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}
