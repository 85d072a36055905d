//! Orchestrator service facade.
//!
//! Wires the idempotency guard, job store, executor, worker pool, and
//! stuck-job sweep together behind two operations: [`Orchestrator::submit`]
//! for inbound events and [`Orchestrator::job`] for status lookups.
//!
//! Admission is the only cross-job critical operation: the guard's atomic
//! check-and-set decides the winner, the job is created PENDING, and its id
//! is queued for the worker pool. Everything after that is per-job
//! sequential and cross-job concurrent.

mod recovery;
mod watchdog;
mod worker;

pub use watchdog::StuckJobSweep;

use crate::config::Config;
use crate::event::TriggerEvent;
use crate::guard::{Admission, IdempotencyGuard};
use crate::job::{Job, JobId};
use crate::pipeline::{PipelineConfig, PipelineContext, PipelineExecutor};
use crate::provider::{ContextRetriever, Generator, RepositoryClient};
use crate::store::{JobStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long shutdown waits for workers to finish their current await before
/// aborting them. Stage timeouts normally release workers much sooner; this
/// bounds the pathological case of a collaborator call that ignores its
/// deadline.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_millis(500);

/// Result of submitting a trigger event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The event was admitted and a job was created.
    Accepted(JobId),
    /// The event duplicates an admission within the idempotency TTL.
    Duplicate,
}

/// Errors from event submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The orchestrator has been shut down.
    #[error("orchestrator is shut down")]
    Shutdown,

    /// The job store rejected the new job.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The orchestrator: admission boundary plus background machinery.
pub struct Orchestrator {
    store: Arc<JobStore>,
    guard: Arc<IdempotencyGuard>,
    queue_tx: mpsc::UnboundedSender<JobId>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Builds the orchestrator and starts its worker pool and stuck-job
    /// sweep.
    ///
    /// The job store is passed in (rather than created here) so callers can
    /// share it with other readers and pre-load persisted jobs; call
    /// [`Orchestrator::recover`] afterwards to resume any unterminated ones.
    /// Must be called within a Tokio runtime.
    pub fn new<R, G, V>(
        config: &Config,
        retriever: Arc<R>,
        generator: Arc<G>,
        repository: Arc<V>,
        store: Arc<JobStore>,
    ) -> Self
    where
        R: ContextRetriever,
        G: Generator,
        V: RepositoryClient,
    {
        let guard = Arc::new(IdempotencyGuard::new(config.idempotency.ttl));
        let ctx = PipelineContext::new(
            retriever,
            generator,
            repository,
            PipelineConfig::from_config(config),
        );
        let executor = Arc::new(PipelineExecutor::new(
            ctx,
            Arc::clone(&store),
            config.retry.policy(),
        ));

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let shutdown = CancellationToken::new();
        let mut handles = Vec::new();

        let workers = config.service.workers.max(1);
        for worker_id in 0..workers {
            handles.push(tokio::spawn(worker::run_worker(
                worker_id,
                Arc::clone(&executor),
                Arc::clone(&store),
                Arc::clone(&queue_rx),
                shutdown.clone(),
            )));
        }

        let sweep = StuckJobSweep::new(
            Arc::clone(&store),
            config.service.max_processing,
            config.service.watchdog_interval,
        );
        handles.push(tokio::spawn(sweep.run(shutdown.clone())));

        info!(workers, "Orchestrator started");

        Self {
            store,
            guard,
            queue_tx,
            shutdown,
            handles,
        }
    }

    /// Submits a trigger event.
    ///
    /// Admission is atomic: of any number of concurrent submissions sharing
    /// an idempotency key, exactly one is accepted; the rest observe
    /// [`SubmitOutcome::Duplicate`]. Accepted events become PENDING jobs and
    /// queue for the worker pool — when all workers are busy the job simply
    /// waits, it is never rejected.
    pub async fn submit(&self, event: TriggerEvent) -> Result<SubmitOutcome, SubmitError> {
        let key = event.idempotency_key();

        match self.guard.admit(&key) {
            Admission::Duplicate => {
                info!(
                    natural_key = %event.natural_key,
                    correlation_id = %event.correlation_id,
                    "Duplicate event suppressed"
                );
                Ok(SubmitOutcome::Duplicate)
            }
            Admission::Accepted => {
                let job = Job::new(event);
                let correlation_id = job.correlation_id;
                let job_id = self.store.create(job).await?;
                self.queue_tx
                    .send(job_id)
                    .map_err(|_| SubmitError::Shutdown)?;
                info!(
                    job_id = %job_id,
                    correlation_id = %correlation_id,
                    "Event admitted"
                );
                Ok(SubmitOutcome::Accepted(job_id))
            }
        }
    }

    /// Re-enqueues every unterminated job in the store; returns the count.
    pub async fn recover(&self) -> usize {
        recovery::resume_unterminated(&self.store, &self.queue_tx).await
    }

    /// Current snapshot of a job.
    pub async fn job(&self, job_id: JobId) -> Result<Job, StoreError> {
        self.store.get(job_id).await
    }

    /// The shared job store.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Number of live guard entries (diagnostics).
    pub fn guard_entries(&self) -> usize {
        self.guard.len()
    }

    /// Cancels the worker pool and sweep, then waits for them to stop.
    ///
    /// Workers that do not come back within the grace period (stuck inside a
    /// misbehaving collaborator call) are aborted.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for mut handle in self.handles {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("Worker did not stop within grace period; aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        info!("Orchestrator stopped");
    }
}
