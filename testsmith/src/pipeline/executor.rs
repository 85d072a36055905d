//! Stage pipeline executor - drives one job through the stage sequence.
//!
//! The executor owns the orchestration contract:
//!
//! - each stage is attempted at most once per invocation
//! - every transition is persisted through the job store before the next
//!   stage runs, so a crash leaves the job resumable at a known stage
//! - stage failures are classified here, then fed to the retry policy; a
//!   granted retry persists the incremented count and returns the job to the
//!   caller (which schedules the resume delay), a denied one persists a
//!   terminal state
//! - COMMIT and PUBLISH consult the job's recorded refs before calling the
//!   repository, so a resumed job never duplicates a branch, commit, or
//!   publish request

use super::context::PipelineContext;
use super::error::StageFailure;
use super::result::{StageOutcome, StageResult};
use super::stages;
use crate::job::{Job, JobStatus, Stage};
use crate::retry::{ErrorClass, RetryDecision, RetryPolicy};
use crate::store::{JobStore, StoreError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::provider::{ContextRetriever, Generator, RepositoryClient};

/// Drives jobs through the fixed stage sequence.
pub struct PipelineExecutor<R, G, V>
where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    ctx: PipelineContext<R, G, V>,
    store: Arc<JobStore>,
    policy: RetryPolicy,
}

impl<R, G, V> PipelineExecutor<R, G, V>
where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    pub fn new(ctx: PipelineContext<R, G, V>, store: Arc<JobStore>, policy: RetryPolicy) -> Self {
        Self { ctx, store, policy }
    }

    /// Executes the job from its current stage pointer until it reaches a
    /// terminal state or a retry is scheduled.
    ///
    /// Returns the persisted job snapshot. A returned job that is still
    /// `Processing` has a scheduled retry; its last consumed delay tells the
    /// caller how long to wait before re-entering.
    #[instrument(
        skip(self, job),
        fields(job_id = %job.id, correlation_id = %job.correlation_id)
    )]
    pub async fn execute(&self, job: Job) -> Result<Job, StoreError> {
        let mut job = job;

        if job.status.is_terminal() {
            warn!(status = %job.status, "Executor invoked on terminal job; nothing to do");
            return Ok(job);
        }

        if job.status == JobStatus::Pending {
            job = self
                .store
                .update(job.id, JobStatus::Pending, job.current_stage, |j| {
                    j.mark_processing()
                })
                .await?;
            info!(stage = %job.current_stage, "Job processing started");
        }

        loop {
            let stage = job.current_stage;
            let started = Instant::now();
            let outcome = self.run_stage(&mut job).await;
            let result = StageResult {
                stage,
                outcome,
                elapsed: started.elapsed(),
            };
            self.log_stage_result(&job, &result);

            match result.outcome {
                StageOutcome::Advanced => {
                    let is_last = stage.next().is_none();
                    job = self
                        .persist(&job, stage, |j| {
                            if is_last {
                                j.complete();
                            } else {
                                j.advance_stage();
                            }
                        })
                        .await?;
                    if is_last {
                        info!(
                            retries = job.retry_count,
                            "Job completed"
                        );
                        return Ok(job);
                    }
                }
                StageOutcome::Skipped(reason) => {
                    job = self.persist(&job, stage, |j| j.skip(reason)).await?;
                    return Ok(job);
                }
                StageOutcome::Failed(failure) => {
                    return self.handle_failure(job, stage, failure).await;
                }
            }
        }
    }

    /// Applies the retry policy to a classified stage failure.
    async fn handle_failure(
        &self,
        job: Job,
        stage: Stage,
        failure: StageFailure,
    ) -> Result<Job, StoreError> {
        match self.policy.decide(failure.class, job.retry_count) {
            RetryDecision::RetryAfter(delay) => {
                let updated = self
                    .persist(&job, stage, |j| {
                        j.record_retry(delay, failure.class, failure.detail.clone())
                    })
                    .await?;
                warn!(
                    stage = %stage,
                    error_class = failure.class.as_str(),
                    retry_count = updated.retry_count,
                    delay_secs = delay.as_secs(),
                    "Stage failed; retry scheduled"
                );
                Ok(updated)
            }
            RetryDecision::Terminate => {
                let detail = if failure.class.is_retryable() {
                    format!("{} (retry budget exhausted)", failure.detail)
                } else {
                    failure.detail.clone()
                };
                let updated = self
                    .persist(&job, stage, |j| j.fail(failure.class, detail))
                    .await?;
                error!(
                    stage = %stage,
                    error_class = failure.class.as_str(),
                    retry_count = updated.retry_count,
                    "Stage failed terminally"
                );
                Ok(updated)
            }
        }
    }

    /// Persists a transition: writes the locally updated job through the
    /// store's optimistic contract (expected = the state this invocation has
    /// been working from).
    async fn persist<F>(&self, job: &Job, stage: Stage, apply: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut updated = job.clone();
        apply(&mut updated);
        self.store
            .update(job.id, job.status, stage, move |j| *j = updated)
            .await
    }

    /// Runs the job's current stage once, filling stage-output slots on the
    /// local job as they are produced.
    async fn run_stage(&self, job: &mut Job) -> StageOutcome {
        let config = &self.ctx.config;

        match job.current_stage {
            Stage::Receive => match stages::receive_stage(&job.event, config) {
                Ok(()) => StageOutcome::Advanced,
                Err(disqualified) => StageOutcome::Skipped(disqualified.0),
            },

            Stage::Retrieve => {
                let items =
                    stages::retrieve_stage(self.ctx.retriever.as_ref(), &job.event, config).await;
                job.context = Some(items);
                StageOutcome::Advanced
            }

            Stage::Generate => {
                let context = job.context.clone().unwrap_or_default();
                match stages::generate_stage(
                    self.ctx.generator.as_ref(),
                    &job.event,
                    &context,
                    config,
                )
                .await
                {
                    Ok(artifact) => {
                        job.artifact = Some(artifact);
                        StageOutcome::Advanced
                    }
                    Err(failure) => StageOutcome::Failed(failure),
                }
            }

            Stage::Commit => {
                if job.branch.is_some() && job.commit.is_some() {
                    debug!("Commit already recorded; skipping on resume");
                    return StageOutcome::Advanced;
                }
                let Some(artifact) = job.artifact.clone() else {
                    return StageOutcome::Failed(StageFailure::new(
                        ErrorClass::MalformedInput,
                        "commit stage reached without a generated artifact",
                    ));
                };
                match stages::commit_stage(
                    self.ctx.repository.as_ref(),
                    job.event.natural_key.issue_number,
                    &artifact,
                    job.branch.as_ref(),
                    &job.id.short(),
                    config,
                )
                .await
                {
                    Ok((branch, commit)) => {
                        job.branch = Some(branch);
                        job.commit = Some(commit);
                        StageOutcome::Advanced
                    }
                    Err(failure) => StageOutcome::Failed(failure),
                }
            }

            Stage::Publish => {
                if job.publish.is_some() {
                    debug!("Publish already recorded; skipping on resume");
                    return StageOutcome::Advanced;
                }
                let (Some(artifact), Some(branch)) = (job.artifact.clone(), job.branch.clone())
                else {
                    return StageOutcome::Failed(StageFailure::new(
                        ErrorClass::MalformedInput,
                        "publish stage reached without a committed artifact",
                    ));
                };
                match stages::publish_stage(
                    self.ctx.repository.as_ref(),
                    &job.event,
                    &artifact,
                    &branch,
                    config,
                )
                .await
                {
                    Ok(publish) => {
                        job.publish = Some(publish);
                        StageOutcome::Advanced
                    }
                    Err(failure) => StageOutcome::Failed(failure),
                }
            }

            Stage::Finalize => {
                let Some(publish) = job.publish.clone() else {
                    return StageOutcome::Failed(StageFailure::new(
                        ErrorClass::MalformedInput,
                        "finalize stage reached without a publish reference",
                    ));
                };
                // Best-effort: the deliverable already exists, so a failed
                // notice is logged, never fatal.
                if let Err(failure) = stages::finalize_stage(
                    self.ctx.repository.as_ref(),
                    &job.event,
                    &publish,
                    config,
                )
                .await
                {
                    warn!(
                        error_class = failure.class.as_str(),
                        detail = %failure.detail,
                        "Completion notice failed; job completes anyway"
                    );
                }
                StageOutcome::Advanced
            }
        }
    }

    /// Logs a stage result at the appropriate level.
    fn log_stage_result(&self, job: &Job, result: &StageResult) {
        match &result.outcome {
            StageOutcome::Advanced => {
                debug!(
                    job_id = %job.id,
                    stage = %result.stage,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Stage completed"
                );
            }
            StageOutcome::Skipped(reason) => {
                info!(
                    job_id = %job.id,
                    stage = %result.stage,
                    reason = %reason,
                    "Job disqualified"
                );
            }
            StageOutcome::Failed(failure) => {
                warn!(
                    job_id = %job.id,
                    stage = %result.stage,
                    error_class = failure.class.as_str(),
                    detail = %failure.detail,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Stage failed"
                );
            }
        }
    }
}
