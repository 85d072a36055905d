//! Audit trail entries for job mutations.

use crate::job::{JobId, JobStatus, Stage};
use crate::trace::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry per persisted job mutation.
///
/// Together with the correlation id this makes every job's lifecycle
/// reconstructable after the fact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub job_id: JobId,
    pub correlation_id: CorrelationId,
    pub prev_status: JobStatus,
    pub prev_stage: Stage,
    pub new_status: JobStatus,
    pub new_stage: Stage,
    pub at: DateTime<Utc>,
}
