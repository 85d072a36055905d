//! Integration tests for the stage pipeline executor.
//!
//! These tests drive real `PipelineExecutor` instances against scripted
//! collaborators and verify:
//! - the happy path through all six stages
//! - deterministic disqualification with zero collaborator calls
//! - retry scheduling, budget exhaustion, and terminal classification
//! - inline branch-collision handling
//! - idempotent resume (no duplicated COMMIT/PUBLISH side effects)

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use testsmith::event::{EventKind, NaturalKey, TriggerEvent, TRIGGER_LABEL};
use testsmith::job::{Job, JobStatus, Stage};
use testsmith::pipeline::{PipelineConfig, PipelineContext, PipelineExecutor};
use testsmith::provider::{
    BranchRef, CommitRef, ContextItem, ContextRetriever, Generator, GeneratorError, PromptMaterial,
    PublishRef, RepositoryClient, RepositoryError, RetrieverError,
};
use testsmith::retry::{ErrorClass, RetryPolicy};
use testsmith::store::JobStore;
use testsmith::telemetry::NullSink;

// =============================================================================
// Scripted collaborators
// =============================================================================

const VALID_DOC: &str = "# Test Cases: Add login tests\n\n\
    ## Overview\nVerifies the login flow end to end.\n\n\
    ## Scenario 1\nGiven a registered user, when they log in, then the dashboard loads.";

struct MockRetriever {
    available: bool,
    calls: AtomicUsize,
}

impl MockRetriever {
    fn healthy() -> Self {
        Self {
            available: true,
            calls: AtomicUsize::new(0),
        }
    }

    fn down() -> Self {
        Self {
            available: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ContextRetriever for MockRetriever {
    fn query(
        &self,
        _text: &str,
        _limit: usize,
    ) -> impl Future<Output = Result<Vec<ContextItem>, RetrieverError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let available = self.available;
        async move {
            if available {
                Ok(vec![
                    ContextItem::new("# Test Cases: Signup\nreference doc", 7),
                    ContextItem::new("# Test Cases: Logout\nreference doc", 12),
                ])
            } else {
                Err(RetrieverError::Unavailable("connection refused".to_string()))
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Gen {
    Ok,
    Hang,
    Invalid,
    Err,
}

struct MockGenerator {
    script: Mutex<VecDeque<Gen>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    fn scripted(script: Vec<Gen>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn healthy() -> Self {
        Self::scripted(vec![])
    }
}

impl Generator for MockGenerator {
    fn generate(
        &self,
        _material: &PromptMaterial,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.script.lock().unwrap().pop_front().unwrap_or(Gen::Ok);
        async move {
            match behavior {
                Gen::Ok => Ok(VALID_DOC.to_string()),
                Gen::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Ok(VALID_DOC.to_string())
                }
                Gen::Invalid => Ok("nope".to_string()),
                Gen::Err => Err(GeneratorError::Backend("token stream error".to_string())),
            }
        }
    }

    fn backend(&self) -> &str {
        "mock-backend"
    }
}

#[derive(Clone, Copy)]
enum BranchOp {
    Ok,
    Exists,
    Denied,
}

#[derive(Clone, Copy)]
enum PublishOp {
    Ok,
    Unavailable,
}

#[derive(Clone, Copy)]
enum CommentOp {
    Ok,
    Fail,
}

struct MockRepository {
    branch_script: Mutex<VecDeque<BranchOp>>,
    publish_script: Mutex<VecDeque<PublishOp>>,
    comment_script: Mutex<VecDeque<CommentOp>>,
    created_branches: Mutex<Vec<String>>,
    create_branch_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl MockRepository {
    fn healthy() -> Self {
        Self::scripted(vec![], vec![], vec![])
    }

    fn scripted(
        branch: Vec<BranchOp>,
        publish: Vec<PublishOp>,
        comment: Vec<CommentOp>,
    ) -> Self {
        Self {
            branch_script: Mutex::new(branch.into()),
            publish_script: Mutex::new(publish.into()),
            comment_script: Mutex::new(comment.into()),
            created_branches: Mutex::new(Vec::new()),
            create_branch_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            publish_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
        }
    }
}

impl RepositoryClient for MockRepository {
    fn create_branch(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BranchRef, RepositoryError>> + Send {
        self.create_branch_calls.fetch_add(1, Ordering::SeqCst);
        self.created_branches.lock().unwrap().push(name.to_string());
        let behavior = self
            .branch_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BranchOp::Ok);
        let name = name.to_string();
        async move {
            match behavior {
                BranchOp::Ok => Ok(BranchRef::new(name)),
                BranchOp::Exists => Err(RepositoryError::BranchExists { name }),
                BranchOp::Denied => Err(RepositoryError::PermissionDenied(
                    "token lacks push permission".to_string(),
                )),
            }
        }
    }

    fn commit_file(
        &self,
        _branch: &BranchRef,
        _path: &str,
        _content: &str,
        _message: &str,
    ) -> impl Future<Output = Result<CommitRef, RepositoryError>> + Send {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(CommitRef::new("c0ffee42")) }
    }

    fn open_publish_request(
        &self,
        _branch: &BranchRef,
        _title: &str,
        _body: &str,
    ) -> impl Future<Output = Result<PublishRef, RepositoryError>> + Send {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .publish_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PublishOp::Ok);
        async move {
            match behavior {
                PublishOp::Ok => Ok(PublishRef::new(17, "https://github.com/acme/widgets/pull/17")),
                PublishOp::Unavailable => {
                    Err(RepositoryError::Unavailable("502 bad gateway".to_string()))
                }
            }
        }
    }

    fn post_comment(
        &self,
        _target: &NaturalKey,
        _body: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .comment_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CommentOp::Ok);
        async move {
            match behavior {
                CommentOp::Ok => Ok(()),
                CommentOp::Fail => Err(RepositoryError::Unavailable("503".to_string())),
            }
        }
    }
}

// =============================================================================
// Test helpers
// =============================================================================

fn good_event() -> TriggerEvent {
    TriggerEvent::new(
        EventKind::Tagged,
        NaturalKey::new("acme/widgets", 42),
        "Add login tests",
        "When logging in with a valid account the dashboard should load within two seconds.",
        vec![TRIGGER_LABEL.to_string()],
        "sha256=abc",
    )
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        retrieve_timeout: Duration::from_millis(50),
        generate_timeout: Duration::from_millis(50),
        repository_timeout: Duration::from_millis(50),
        min_artifact_len: 40,
        ..PipelineConfig::default()
    }
}

struct Harness {
    executor: PipelineExecutor<MockRetriever, MockGenerator, MockRepository>,
    store: Arc<JobStore>,
    retriever: Arc<MockRetriever>,
    generator: Arc<MockGenerator>,
    repository: Arc<MockRepository>,
}

impl Harness {
    fn new(retriever: MockRetriever, generator: MockGenerator, repository: MockRepository) -> Self {
        let retriever = Arc::new(retriever);
        let generator = Arc::new(generator);
        let repository = Arc::new(repository);
        let store = Arc::new(JobStore::new(Arc::new(NullSink)));
        let ctx = PipelineContext::new(
            Arc::clone(&retriever),
            Arc::clone(&generator),
            Arc::clone(&repository),
            fast_config(),
        );
        let executor = PipelineExecutor::new(ctx, Arc::clone(&store), RetryPolicy::default());
        Self {
            executor,
            store,
            retriever,
            generator,
            repository,
        }
    }

    /// Creates the job in the store and re-invokes the executor until the
    /// job is terminal (standing in for the worker loop, without sleeping
    /// out the retry delays).
    async fn drive(&self, event: TriggerEvent) -> Job {
        let mut job = Job::new(event);
        self.store.create(job.clone()).await.unwrap();
        loop {
            job = self.executor.execute(job).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_happy_path_completes_with_all_references() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::healthy(),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert_eq!(job.retry_count, 0);
    assert!(job.error_class.is_none());

    let artifact = job.artifact.as_ref().expect("artifact recorded");
    assert_eq!(artifact.title, "Test Cases: Add login tests");
    assert_eq!(artifact.sources, vec![7, 12]);
    assert_eq!(artifact.backend, "mock-backend");

    assert_eq!(
        job.branch.as_ref().map(|b| b.name.as_str()),
        Some("test-cases/issue-42")
    );
    assert!(job.commit.is_some());
    assert_eq!(job.publish.as_ref().map(|p| p.number), Some(17));

    assert_eq!(harness.repository.comment_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_happy_path_audit_trail_covers_lifecycle() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::healthy(),
    );

    let job = harness.drive(good_event()).await;
    let trail = harness.store.audit_trail(job.id).await;

    // create + PENDING→PROCESSING + five stage advances + completion
    assert_eq!(trail.len(), 8);
    assert_eq!(trail[1].prev_status, JobStatus::Pending);
    assert_eq!(trail[1].new_status, JobStatus::Processing);
    let last = trail.last().unwrap();
    assert_eq!(last.new_status, JobStatus::Completed);
    assert_eq!(last.prev_stage, Stage::Finalize);
    assert!(trail.iter().all(|e| e.correlation_id == job.correlation_id));
}

#[tokio::test]
async fn test_short_body_is_skipped_with_zero_collaborator_calls() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::healthy(),
    );

    // 40 chars, below the 50-char floor.
    let event = TriggerEvent::new(
        EventKind::Tagged,
        NaturalKey::new("acme/widgets", 43),
        "Short issue",
        "a".repeat(40),
        vec![TRIGGER_LABEL.to_string()],
        "sha256=abc",
    );

    let job = harness.drive(event).await;

    assert_eq!(job.status, JobStatus::Skipped);
    assert_eq!(job.current_stage, Stage::Receive);
    assert_eq!(job.retry_count, 0);
    assert!(job.completed_at.is_some());
    assert!(job.error_detail.unwrap().contains("below the 50 char floor"));

    assert_eq!(harness.retriever.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.repository.create_branch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generator_timeout_twice_then_success() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::scripted(vec![Gen::Hang, Gen::Hang, Gen::Ok]),
        MockRepository::healthy(),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.retry_count, 2);
    assert_eq!(
        job.retry_delays_consumed,
        vec![Duration::from_secs(5), Duration::from_secs(15)]
    );
    // A completed job carries no residue of its intermediate retries.
    assert!(job.error_class.is_none());
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_branch_collision_is_resolved_inline_without_retry_policy() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::scripted(vec![BranchOp::Exists, BranchOp::Ok], vec![], vec![]),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Completed);
    // Collision handled inline: no retry was consumed.
    assert_eq!(job.retry_count, 0);

    let names = harness.repository.created_branches.lock().unwrap().clone();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], "test-cases/issue-42");
    assert!(names[1].starts_with("test-cases/issue-42-"));
    assert_eq!(job.branch.unwrap().name, names[1]);
}

#[tokio::test]
async fn test_permission_denied_fails_immediately() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::scripted(vec![BranchOp::Denied], vec![], vec![]),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.error_class, Some(ErrorClass::PermissionDenied));
    assert!(job.completed_at.is_some());
    assert_eq!(harness.repository.publish_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_retriever_outage_degrades_to_empty_context() {
    let harness = Harness::new(
        MockRetriever::down(),
        MockGenerator::healthy(),
        MockRepository::healthy(),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.context.as_ref().is_some_and(|c| c.is_empty()));
    assert!(job.artifact.unwrap().sources.is_empty());
}

#[tokio::test]
async fn test_invalid_artifact_exhausts_retry_budget() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::scripted(vec![Gen::Invalid, Gen::Invalid, Gen::Invalid, Gen::Invalid]),
        MockRepository::healthy(),
    );

    let job = harness.drive(good_event()).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 3);
    assert_eq!(
        job.retry_delays_consumed,
        vec![
            Duration::from_secs(5),
            Duration::from_secs(15),
            Duration::from_secs(45)
        ]
    );
    assert_eq!(job.error_class, Some(ErrorClass::InvalidArtifact));
    assert!(job
        .error_detail
        .unwrap()
        .contains("retry budget exhausted"));
    // No repository side effects for a job that never produced a document.
    assert_eq!(harness.repository.create_branch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resume_after_publish_failure_does_not_repeat_commit() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::scripted(vec![], vec![PublishOp::Unavailable, PublishOp::Ok], vec![]),
    );

    let mut job = Job::new(good_event());
    harness.store.create(job.clone()).await.unwrap();

    // First invocation: fails at PUBLISH, schedules a retry.
    job = harness.executor.execute(job).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.current_stage, Stage::Publish);
    assert_eq!(job.retry_count, 1);
    assert!(job.branch.is_some() && job.commit.is_some());
    assert!(job.publish.is_none());

    // Resume: PUBLISH runs again, COMMIT does not.
    job = harness.executor.execute(job).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    assert_eq!(harness.repository.create_branch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.repository.commit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.repository.publish_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.repository.comment_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_finalize_failure_is_best_effort() {
    let harness = Harness::new(
        MockRetriever::healthy(),
        MockGenerator::healthy(),
        MockRepository::scripted(vec![], vec![], vec![CommentOp::Fail]),
    );

    let job = harness.drive(good_event()).await;

    // The deliverable exists; a failed notice never fails the job.
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.publish.is_some());
    assert_eq!(harness.repository.comment_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_completed_at_iff_terminal_across_outcomes() {
    for (generator, repository) in [
        (MockGenerator::healthy(), MockRepository::healthy()),
        (
            MockGenerator::healthy(),
            MockRepository::scripted(vec![BranchOp::Denied], vec![], vec![]),
        ),
    ] {
        let harness = Harness::new(MockRetriever::healthy(), generator, repository);
        let job = harness.drive(good_event()).await;
        assert!(job.status.is_terminal());
        assert!(job.completed_at.is_some());
    }
}
