//! Integration tests for the orchestrator service.
//!
//! These tests exercise the full submission path: atomic duplicate
//! admission, the bounded worker pool with queueing backpressure, retry
//! scheduling end to end, crash recovery, and the stuck-job sweep.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use testsmith::config::Config;
use testsmith::event::{EventKind, NaturalKey, TriggerEvent, TRIGGER_LABEL};
use testsmith::job::{Job, JobId, JobStatus};
use testsmith::provider::{
    BranchRef, CommitRef, ContextItem, ContextRetriever, Generator, GeneratorError, PromptMaterial,
    PublishRef, RepositoryClient, RepositoryError, RetrieverError,
};
use testsmith::retry::ErrorClass;
use testsmith::service::{Orchestrator, SubmitOutcome};
use testsmith::store::JobStore;
use testsmith::telemetry::NullSink;

// =============================================================================
// Collaborator stubs
// =============================================================================

const VALID_DOC: &str = "# Test Cases: generated\n\n\
    ## Overview\nCovers the requested flow.\n\n\
    ## Scenario 1\nGiven a precondition, when the action runs, then the outcome holds.";

struct StubRetriever;

impl ContextRetriever for StubRetriever {
    fn query(
        &self,
        _text: &str,
        _limit: usize,
    ) -> impl Future<Output = Result<Vec<ContextItem>, RetrieverError>> + Send {
        async { Ok(vec![ContextItem::new("# Reference\ndoc", 7)]) }
    }
}

/// Generator whose per-call behavior is scripted; defaults to success.
struct StubGenerator {
    script: Mutex<VecDeque<Result<(), ()>>>,
    hang: bool,
    calls: AtomicUsize,
}

impl StubGenerator {
    fn healthy() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the first `failures` calls, then succeeds.
    fn failing_first(failures: usize) -> Self {
        Self {
            script: Mutex::new((0..failures).map(|_| Err(())).collect()),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never returns within any reasonable deadline.
    fn hanging() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            hang: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Generator for StubGenerator {
    fn generate(
        &self,
        _material: &PromptMaterial,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        let hang = self.hang;
        async move {
            if hang {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
            }
            match behavior {
                Ok(()) => Ok(VALID_DOC.to_string()),
                Err(()) => Err(GeneratorError::Backend("scripted failure".to_string())),
            }
        }
    }

    fn backend(&self) -> &str {
        "stub-backend"
    }
}

struct StubRepository {
    create_branch_calls: AtomicUsize,
}

impl StubRepository {
    fn new() -> Self {
        Self {
            create_branch_calls: AtomicUsize::new(0),
        }
    }
}

impl RepositoryClient for StubRepository {
    fn create_branch(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BranchRef, RepositoryError>> + Send {
        self.create_branch_calls.fetch_add(1, Ordering::SeqCst);
        let name = name.to_string();
        async move { Ok(BranchRef::new(name)) }
    }

    fn commit_file(
        &self,
        _branch: &BranchRef,
        _path: &str,
        _content: &str,
        _message: &str,
    ) -> impl Future<Output = Result<CommitRef, RepositoryError>> + Send {
        async { Ok(CommitRef::new("c0ffee42")) }
    }

    fn open_publish_request(
        &self,
        _branch: &BranchRef,
        _title: &str,
        _body: &str,
    ) -> impl Future<Output = Result<PublishRef, RepositoryError>> + Send {
        async { Ok(PublishRef::new(9, "https://github.com/acme/widgets/pull/9")) }
    }

    fn post_comment(
        &self,
        _target: &NaturalKey,
        _body: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async { Ok(()) }
    }
}

// =============================================================================
// Test helpers
// =============================================================================

fn event_for_issue(issue: u64) -> TriggerEvent {
    TriggerEvent::new(
        EventKind::Tagged,
        NaturalKey::new("acme/widgets", issue),
        "Add login tests",
        "When logging in with a valid account the dashboard should load within two seconds.",
        vec![TRIGGER_LABEL.to_string()],
        "sha256=abc",
    )
}

/// Config tuned for tests: fast retries, small pool, quick sweep.
fn fast_config(workers: usize) -> Config {
    let mut config = Config::default();
    config.service.workers = workers;
    config.service.watchdog_interval = Duration::from_millis(20);
    config.retry.delays = vec![Duration::from_millis(5), Duration::from_millis(10)];
    config.pipeline.retrieve_timeout = Duration::from_millis(50);
    config.pipeline.generate_timeout = Duration::from_millis(100);
    config.pipeline.repository_timeout = Duration::from_millis(50);
    config.pipeline.min_artifact_len = 40;
    config
}

fn orchestrator_with(config: Config, generator: StubGenerator) -> (Orchestrator, Arc<JobStore>) {
    let store = Arc::new(JobStore::new(Arc::new(NullSink)));
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(StubRetriever),
        Arc::new(generator),
        Arc::new(StubRepository::new()),
        Arc::clone(&store),
    );
    (orchestrator, store)
}

/// Polls the store until the job is terminal or the deadline passes.
async fn wait_terminal(store: &JobStore, job_id: JobId, deadline: Duration) -> Job {
    tokio::time::timeout(deadline, async {
        loop {
            let job = store.get(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state in time")
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_submit_runs_job_to_completion() {
    let (orchestrator, store) = orchestrator_with(fast_config(2), StubGenerator::healthy());

    let outcome = orchestrator.submit(event_for_issue(42)).await.unwrap();
    let SubmitOutcome::Accepted(job_id) = outcome else {
        panic!("expected acceptance");
    };

    let job = wait_terminal(&store, job_id, Duration::from_secs(5)).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.publish.is_some());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_second_submission_within_ttl_is_duplicate() {
    let (orchestrator, store) = orchestrator_with(fast_config(2), StubGenerator::healthy());

    let first = orchestrator.submit(event_for_issue(42)).await.unwrap();
    assert!(matches!(first, SubmitOutcome::Accepted(_)));

    let second = orchestrator.submit(event_for_issue(42)).await.unwrap();
    assert_eq!(second, SubmitOutcome::Duplicate);

    // Exactly one job exists for the natural key.
    assert_eq!(store.len().await, 1);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_same_key_submissions_admit_exactly_one() {
    let (orchestrator, store) = orchestrator_with(fast_config(2), StubGenerator::healthy());
    let orchestrator = Arc::new(orchestrator);

    let submissions = (0..10).map(|_| {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.submit(event_for_issue(42)).await.unwrap() })
    });

    let outcomes: Vec<_> = futures::future::join_all(submissions)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let accepted = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Accepted(_)))
        .count();
    assert_eq!(accepted, 1, "exactly one concurrent submission should win");
    assert_eq!(store.len().await, 1);

    if let Some(orchestrator) = Arc::into_inner(orchestrator) {
        orchestrator.shutdown().await;
    }
}

#[tokio::test]
async fn test_transient_generation_failures_retry_to_completion() {
    let (orchestrator, store) =
        orchestrator_with(fast_config(2), StubGenerator::failing_first(2));

    let SubmitOutcome::Accepted(job_id) = orchestrator.submit(event_for_issue(42)).await.unwrap()
    else {
        panic!("expected acceptance");
    };

    let job = wait_terminal(&store, job_id, Duration::from_secs(5)).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.retry_count, 2);
    assert_eq!(job.retry_delays_consumed.len(), 2);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_single_worker_drains_queued_jobs() {
    let (orchestrator, store) = orchestrator_with(fast_config(1), StubGenerator::healthy());

    let mut job_ids = Vec::new();
    for issue in 1..=5 {
        match orchestrator.submit(event_for_issue(issue)).await.unwrap() {
            SubmitOutcome::Accepted(id) => job_ids.push(id),
            SubmitOutcome::Duplicate => panic!("distinct issues must all be admitted"),
        }
    }

    // One worker, five jobs: they queue and all complete.
    for job_id in job_ids {
        let job = wait_terminal(&store, job_id, Duration::from_secs(10)).await;
        assert_eq!(job.status, JobStatus::Completed);
    }

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_recover_resumes_pending_jobs() {
    let store = Arc::new(JobStore::new(Arc::new(NullSink)));

    // A job persisted before "the crash": admitted but never driven.
    let stranded = Job::new(event_for_issue(42));
    let stranded_id = stranded.id;
    store.create(stranded).await.unwrap();

    let orchestrator = Orchestrator::new(
        &fast_config(2),
        Arc::new(StubRetriever),
        Arc::new(StubGenerator::healthy()),
        Arc::new(StubRepository::new()),
        Arc::clone(&store),
    );

    assert_eq!(orchestrator.recover().await, 1);

    let job = wait_terminal(&store, stranded_id, Duration::from_secs(5)).await;
    assert_eq!(job.status, JobStatus::Completed);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_stuck_job_is_force_failed_by_sweep() {
    let mut config = fast_config(1);
    // Generation hangs far past this bound; the sweep must reclaim the job.
    config.pipeline.generate_timeout = Duration::from_secs(3_600);
    config.service.max_processing = Duration::from_millis(50);
    config.service.watchdog_interval = Duration::from_millis(20);

    let (orchestrator, store) = orchestrator_with(config, StubGenerator::hanging());

    let SubmitOutcome::Accepted(job_id) = orchestrator.submit(event_for_issue(42)).await.unwrap()
    else {
        panic!("expected acceptance");
    };

    let job = wait_terminal(&store, job_id, Duration::from_secs(5)).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_class, Some(ErrorClass::Stalled));
    assert!(job.completed_at.is_some());

    orchestrator.shutdown().await;
}
