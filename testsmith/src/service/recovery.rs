//! Crash-recovery resumption.
//!
//! Any job found in a non-terminal state is re-enqueued. The executor
//! re-enters at the persisted stage pointer, and the job's recorded
//! branch/commit/publish refs keep resumed COMMIT and PUBLISH stages from
//! repeating their side effects.

use crate::job::JobId;
use crate::store::JobStore;
use tokio::sync::mpsc;
use tracing::info;

/// Re-enqueues every unterminated job; returns how many were resumed.
pub(crate) async fn resume_unterminated(
    store: &JobStore,
    queue: &mpsc::UnboundedSender<JobId>,
) -> usize {
    let mut resumed = 0;

    for job in store.list_unterminated().await {
        info!(
            job_id = %job.id,
            correlation_id = %job.correlation_id,
            status = %job.status,
            stage = %job.current_stage,
            "Resuming unterminated job"
        );
        if queue.send(job.id).is_ok() {
            resumed += 1;
        }
    }

    resumed
}
