//! Job store - the single source of truth for job state.
//!
//! The store owns every job record in an arena keyed by job id. All mutation
//! goes through [`JobStore::update`], which is optimistic: the caller states
//! the (status, stage) it believes the job is in, and the mutation is
//! rejected with a conflict when the stored record disagrees. Terminal states
//! are sticky — no mutation ever moves a job out of one.
//!
//! Every mutation appends an [`AuditEntry`] and emits one
//! [`TransitionRecord`](crate::telemetry::TransitionRecord) through the
//! configured telemetry sink.

mod audit;

pub use audit::AuditEntry;

use crate::event::IdempotencyKey;
use crate::job::{Job, JobId, JobStatus, Stage};
use crate::telemetry::{TelemetrySink, TracingSink, TransitionRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No job with this id.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Optimistic update rejected: the stored record does not match the
    /// state the caller expected. The caller should re-read and decide
    /// whether its work is still relevant.
    #[error(
        "job {job_id} conflict: expected {expected_status}/{expected_stage}, \
         found {found_status}/{found_stage}"
    )]
    Conflict {
        job_id: JobId,
        expected_status: JobStatus,
        expected_stage: Stage,
        found_status: JobStatus,
        found_stage: Stage,
    },

    /// A job with this id was already created.
    #[error("job {0} already exists")]
    AlreadyExists(JobId),
}

/// In-memory job arena with optimistic updates and an audit trail.
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
    audit: Mutex<Vec<AuditEntry>>,
    sink: Arc<dyn TelemetrySink>,
}

impl JobStore {
    /// Creates a store that emits transitions to the given sink.
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            audit: Mutex::new(Vec::new()),
            sink,
        }
    }

    /// Inserts a new job record.
    ///
    /// The creation itself is audited (with prev == new) so the trail covers
    /// the job's full lifetime.
    pub async fn create(&self, job: Job) -> Result<JobId, StoreError> {
        let job_id = job.id;
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job_id) {
            return Err(StoreError::AlreadyExists(job_id));
        }

        let entry = AuditEntry {
            job_id,
            correlation_id: job.correlation_id,
            prev_status: job.status,
            prev_stage: job.current_stage,
            new_status: job.status,
            new_stage: job.current_stage,
            at: Utc::now(),
        };
        jobs.insert(job_id, job);
        drop(jobs);

        self.audit.lock().await.push(entry);
        Ok(job_id)
    }

    /// Returns a snapshot of the job.
    pub async fn get(&self, job_id: JobId) -> Result<Job, StoreError> {
        self.jobs
            .lock()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound(job_id))
    }

    /// Applies a mutation if the stored record matches the expected state.
    ///
    /// Rejected with [`StoreError::Conflict`] when the stored (status, stage)
    /// differs from `(expected_status, expected_stage)` or the stored status
    /// is already terminal. On success the audit trail gains an entry, the
    /// telemetry sink receives one transition record, and the updated
    /// snapshot is returned.
    pub async fn update<F>(
        &self,
        job_id: JobId,
        expected_status: JobStatus,
        expected_stage: Stage,
        mutate: F,
    ) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let (entry, record, updated) = {
            let mut jobs = self.jobs.lock().await;
            let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;

            if job.status.is_terminal()
                || job.status != expected_status
                || job.current_stage != expected_stage
            {
                return Err(StoreError::Conflict {
                    job_id,
                    expected_status,
                    expected_stage,
                    found_status: job.status,
                    found_stage: job.current_stage,
                });
            }

            let prev_status = job.status;
            let prev_stage = job.current_stage;
            mutate(job);

            let at = Utc::now();
            let elapsed = (at - job.started_at).to_std().unwrap_or_default();
            let entry = AuditEntry {
                job_id,
                correlation_id: job.correlation_id,
                prev_status,
                prev_stage,
                new_status: job.status,
                new_stage: job.current_stage,
                at,
            };
            let record = TransitionRecord {
                correlation_id: job.correlation_id,
                job_id,
                prev_status,
                prev_stage,
                new_status: job.status,
                new_stage: job.current_stage,
                elapsed,
                error_class: job.error_class,
                at,
            };
            (entry, record, job.clone())
        };

        self.audit.lock().await.push(entry);
        self.sink.emit(record);
        Ok(updated)
    }

    /// All jobs that have not reached a terminal state, for crash-recovery
    /// resumption.
    pub async fn list_unterminated(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .await
            .values()
            .filter(|j| !j.status.is_terminal())
            .cloned()
            .collect()
    }

    /// All jobs currently in the given status.
    pub async fn list_by_status(&self, status: JobStatus) -> Vec<Job> {
        self.jobs
            .lock()
            .await
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect()
    }

    /// Looks a job up by its idempotency key.
    pub async fn find_by_idempotency_key(&self, key: &IdempotencyKey) -> Option<Job> {
        self.jobs
            .lock()
            .await
            .values()
            .find(|j| &j.idempotency_key == key)
            .cloned()
    }

    /// Audit entries recorded for one job, in order.
    pub async fn audit_trail(&self, job_id: JobId) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .await
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Total number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}
