//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These are
//! pure data types; parsing lives in `parser.rs` and defaults in
//! `defaults.rs`.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Complete application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Intake validation settings.
    pub intake: IntakeSettings,
    /// Retry budget and backoff schedule.
    pub retry: RetrySettings,
    /// Duplicate-admission settings.
    pub idempotency: IdempotencySettings,
    /// Per-stage pipeline settings.
    pub pipeline: PipelineSettings,
    /// Worker pool and watchdog settings.
    pub service: ServiceSettings,
}

/// Intake validation.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    /// Minimum body length (chars) below which an event is disqualified.
    pub min_body_len: usize,
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Maximum retries per job.
    pub max_retries: u32,
    /// Backoff delays, one per retry attempt.
    pub delays: Vec<Duration>,
}

impl RetrySettings {
    /// Builds the pure retry policy from these settings.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.delays.clone())
    }
}

/// Duplicate-admission settings.
#[derive(Debug, Clone)]
pub struct IdempotencySettings {
    /// How long an admitted key suppresses duplicates.
    pub ttl: Duration,
}

/// Per-stage pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Timeout for the context retriever query.
    pub retrieve_timeout: Duration,
    /// Timeout for the generation call.
    pub generate_timeout: Duration,
    /// Timeout for each repository operation.
    pub repository_timeout: Duration,
    /// Maximum context documents fed to the generator.
    pub context_limit: usize,
    /// Minimum generated content length for structural validity.
    pub min_artifact_len: usize,
}

/// Worker pool and watchdog settings.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Number of concurrent pipeline workers.
    pub workers: usize,
    /// How often the stuck-job sweep runs.
    pub watchdog_interval: Duration,
    /// Wall-clock bound after which a PROCESSING job is force-failed.
    pub max_processing: Duration,
}
