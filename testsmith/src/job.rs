//! Job model and state machine.
//!
//! A [`Job`] is the mutable unit of work tracked by the orchestrator. Its
//! status moves `Pending → Processing → {Completed, Failed, Skipped}`; a
//! retryable stage failure keeps the job in `Processing` with an incremented
//! retry count. The stage pointer records the next stage to execute, so a
//! job interrupted mid-pipeline resumes where it left off instead of
//! repeating side-effecting stages.

use crate::artifact::GeneratedArtifact;
use crate::event::{IdempotencyKey, TriggerEvent};
use crate::provider::{BranchRef, CommitRef, ContextItem, PublishRef};
use crate::retry::ErrorClass;
use crate::trace::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new unique job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short prefix used as a deterministic disambiguator (e.g. for branch
    /// name collisions) and in compact log output.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job execution status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Admitted, waiting for a worker.
    #[default]
    Pending,
    /// Being driven through the pipeline (including scheduled retries).
    Processing,
    /// All stages completed; the deliverable exists.
    Completed,
    /// Terminal failure; error class and detail are recorded.
    Failed,
    /// Disqualified input; no retry was attempted.
    Skipped,
}

impl JobStatus {
    /// Returns true for terminal states (Completed, Failed, Skipped).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true while the job can still make progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Pipeline stages in fixed execution order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Validate and normalize the trigger event; disqualify weak input.
    #[default]
    Receive,
    /// Look up similar documents for prompt context.
    Retrieve,
    /// Generate the test case document.
    Generate,
    /// Create the branch and commit the document.
    Commit,
    /// Open the publish request.
    Publish,
    /// Post the completion notice (best-effort).
    Finalize,
}

impl Stage {
    /// Returns the stage that follows this one, or `None` after FINALIZE.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Receive => Some(Self::Retrieve),
            Self::Retrieve => Some(Self::Generate),
            Self::Generate => Some(Self::Commit),
            Self::Commit => Some(Self::Publish),
            Self::Publish => Some(Self::Finalize),
            Self::Finalize => None,
        }
    }

    /// Stable name used in logs and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Retrieve => "RETRIEVE",
            Self::Generate => "GENERATE",
            Self::Commit => "COMMIT",
            Self::Publish => "PUBLISH",
            Self::Finalize => "FINALIZE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable unit of work tracked by the orchestrator.
///
/// Invariants, enforced by the transition methods and checked in tests:
/// - `completed_at` is set if and only if `status` is terminal
/// - `retry_count` never exceeds the policy maximum (the executor only calls
///   [`Job::record_retry`] when the policy grants a retry)
/// - a terminal job never transitions again (the store rejects it)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// The trigger event this job was created for.
    pub event: TriggerEvent,
    /// Current status.
    pub status: JobStatus,
    /// Next stage to execute — the resumable stage pointer.
    pub current_stage: Stage,
    /// When the job was created.
    pub started_at: DateTime<Utc>,
    /// Set exactly when the job reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Classification of the terminal failure, if any.
    pub error_class: Option<ErrorClass>,
    /// Human-readable failure or skip detail, if any.
    pub error_detail: Option<String>,
    /// Number of retries consumed so far.
    pub retry_count: u32,
    /// The delays that were scheduled for each consumed retry, in order.
    pub retry_delays_consumed: Vec<Duration>,
    /// When the most recent retry was scheduled.
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Duplicate-detection key derived from the event.
    pub idempotency_key: IdempotencyKey,
    /// Correlation id shared with the event and all derived records.
    pub correlation_id: CorrelationId,

    // Stage-output slots. Populated as stages complete and persisted with
    // the job, so a resumed job never repeats a side effect that already
    // produced a recorded reference.
    /// Context documents retrieved for the prompt.
    pub context: Option<Vec<ContextItem>>,
    /// The generated document.
    pub artifact: Option<GeneratedArtifact>,
    /// Branch created by COMMIT.
    pub branch: Option<BranchRef>,
    /// Commit written by COMMIT.
    pub commit: Option<CommitRef>,
    /// Publish request opened by PUBLISH.
    pub publish: Option<PublishRef>,
}

impl Job {
    /// Creates a pending job for a trigger event.
    pub fn new(event: TriggerEvent) -> Self {
        let idempotency_key = event.idempotency_key();
        let correlation_id = event.correlation_id;
        Self {
            id: JobId::new(),
            event,
            status: JobStatus::Pending,
            current_stage: Stage::Receive,
            started_at: Utc::now(),
            completed_at: None,
            error_class: None,
            error_detail: None,
            retry_count: 0,
            retry_delays_consumed: Vec::new(),
            last_retry_at: None,
            idempotency_key,
            correlation_id,
            context: None,
            artifact: None,
            branch: None,
            commit: None,
            publish: None,
        }
    }

    /// Moves a pending job into processing.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
    }

    /// Advances the stage pointer past a completed stage.
    pub fn advance_stage(&mut self) {
        if let Some(next) = self.current_stage.next() {
            self.current_stage = next;
        }
    }

    /// Terminal transition: all stages done.
    ///
    /// Clears any error recorded by an intermediate retry — the job
    /// ultimately succeeded.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.error_class = None;
        self.error_detail = None;
    }

    /// Terminal transition: unrecoverable failure.
    pub fn fail(&mut self, class: ErrorClass, detail: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_class = Some(class);
        self.error_detail = Some(detail.into());
    }

    /// Terminal transition: disqualified input, no retry attempted.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Skipped;
        self.completed_at = Some(Utc::now());
        self.error_detail = Some(reason.into());
    }

    /// Records a granted retry: increments the count, remembers the delay
    /// and the error that caused it, and stamps the retry time. The job
    /// stays in `Processing` and the stage pointer is unchanged, so the
    /// failed stage runs again on resume.
    pub fn record_retry(&mut self, delay: Duration, class: ErrorClass, detail: impl Into<String>) {
        self.retry_count += 1;
        self.retry_delays_consumed.push(delay);
        self.last_retry_at = Some(Utc::now());
        self.error_class = Some(class);
        self.error_detail = Some(detail.into());
    }

    /// Delay scheduled by the most recent retry, if any.
    pub fn last_consumed_delay(&self) -> Option<Duration> {
        self.retry_delays_consumed.last().copied()
    }
}
