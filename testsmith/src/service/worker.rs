//! Pipeline workers.
//!
//! Each worker pulls admitted job ids from the shared queue and drives one
//! job at a time to a terminal state, sleeping out scheduled retry delays in
//! between executor invocations. Jobs queue while all workers are busy —
//! backpressure by queueing, never by rejection.

use crate::job::JobId;
use crate::pipeline::PipelineExecutor;
use crate::provider::{ContextRetriever, Generator, RepositoryClient};
use crate::store::{JobStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs one worker until shutdown or queue closure.
pub(crate) async fn run_worker<R, G, V>(
    worker_id: usize,
    executor: Arc<PipelineExecutor<R, G, V>>,
    store: Arc<JobStore>,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<JobId>>>,
    shutdown: CancellationToken,
) where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    debug!(worker_id, "Worker started");

    loop {
        // Holding the queue lock while idle serializes dispatch across
        // workers, not execution: the lock is released as soon as a job id
        // arrives.
        let job_id = {
            let mut rx = queue.lock().await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = rx.recv() => match received {
                    Some(id) => id,
                    None => break,
                },
            }
        };

        drive_job(worker_id, &executor, &store, job_id, &shutdown).await;
    }

    debug!(worker_id, "Worker stopped");
}

/// Drives one job to a terminal state, sleeping out retry delays.
async fn drive_job<R, G, V>(
    worker_id: usize,
    executor: &PipelineExecutor<R, G, V>,
    store: &JobStore,
    job_id: JobId,
    shutdown: &CancellationToken,
) where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    let mut job = match store.get(job_id).await {
        Ok(job) => job,
        Err(err) => {
            error!(worker_id, job_id = %job_id, error = %err, "Dequeued unknown job");
            return;
        }
    };

    loop {
        job = match executor.execute(job).await {
            Ok(job) => job,
            Err(StoreError::Conflict { .. }) => {
                // Someone else moved the job (e.g. the stuck-job sweep
                // force-failed it). Their transition wins.
                warn!(worker_id, job_id = %job_id, "Job state moved underneath worker; abandoning");
                return;
            }
            Err(err) => {
                error!(worker_id, job_id = %job_id, error = %err, "Executor failed to persist");
                return;
            }
        };

        if job.status.is_terminal() {
            info!(
                worker_id,
                job_id = %job_id,
                status = %job.status,
                retries = job.retry_count,
                "Job reached terminal state"
            );
            return;
        }

        // Non-terminal return means a retry was scheduled.
        let delay = job.last_consumed_delay().unwrap_or(Duration::ZERO);
        debug!(
            worker_id,
            job_id = %job_id,
            delay_ms = delay.as_millis() as u64,
            "Sleeping out retry delay"
        );
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
