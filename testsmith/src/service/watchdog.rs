//! Stuck-job sweep.
//!
//! Per-stage timeouts bound individual collaborator calls, but a job can
//! still hold a worker hostage through pathological retry loops or clock
//! trouble. The sweep force-terminates any job that has been PROCESSING
//! beyond a wall-clock bound, through the store's optimistic contract — a
//! conflict means the job moved on by itself and is left alone.

use crate::job::JobStatus;
use crate::retry::ErrorClass;
use crate::store::{JobStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Periodic sweep that force-fails jobs stuck in PROCESSING.
pub struct StuckJobSweep {
    store: Arc<JobStore>,
    /// Wall-clock bound on a PROCESSING job.
    max_processing: Duration,
    /// Sweep interval.
    interval: Duration,
}

impl StuckJobSweep {
    pub fn new(store: Arc<JobStore>, max_processing: Duration, interval: Duration) -> Self {
        Self {
            store,
            max_processing,
            interval,
        }
    }

    /// Runs the sweep until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let failed = self.sweep().await;
                    if failed > 0 {
                        warn!(failed, "Stuck-job sweep force-failed jobs");
                    } else {
                        debug!("Stuck-job sweep found nothing");
                    }
                }
            }
        }
    }

    /// One sweep pass; returns how many jobs were force-failed.
    pub async fn sweep(&self) -> usize {
        let mut failed = 0;

        for job in self.store.list_by_status(JobStatus::Processing).await {
            let held_for = (Utc::now() - job.started_at).to_std().unwrap_or_default();
            if held_for <= self.max_processing {
                continue;
            }

            let bound_secs = self.max_processing.as_secs();
            let result = self
                .store
                .update(job.id, JobStatus::Processing, job.current_stage, |j| {
                    j.fail(
                        ErrorClass::Stalled,
                        format!("processing exceeded the {bound_secs}s wall-clock bound"),
                    )
                })
                .await;

            match result {
                Ok(_) => {
                    warn!(
                        job_id = %job.id,
                        correlation_id = %job.correlation_id,
                        stage = %job.current_stage,
                        held_secs = held_for.as_secs(),
                        "Force-failed stuck job"
                    );
                    failed += 1;
                }
                Err(StoreError::Conflict { .. }) => {
                    // The job made progress between the listing and the
                    // update. Not stuck after all.
                    debug!(job_id = %job.id, "Job moved during sweep; skipping");
                }
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "Sweep update failed");
                }
            }
        }

        failed
    }
}
