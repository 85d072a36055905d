//! Default values and constants for all configuration settings.

use super::settings::*;
use crate::retry::{DEFAULT_BACKOFF_SECS, DEFAULT_MAX_RETRIES};
use std::time::Duration;

/// Minimum event body length before disqualification.
pub const DEFAULT_MIN_BODY_LEN: usize = 50;

/// Admission TTL in seconds (one hour).
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 3_600;

/// Context retriever query timeout in seconds.
pub const DEFAULT_RETRIEVE_TIMEOUT_SECS: u64 = 5;

/// Generation call timeout in seconds.
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 120;

/// Per-operation repository timeout in seconds.
pub const DEFAULT_REPOSITORY_TIMEOUT_SECS: u64 = 30;

/// Maximum context documents fed to the generator.
pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

/// Minimum generated content length for structural validity.
pub const DEFAULT_MIN_ARTIFACT_LEN: usize = 80;

/// Stuck-job sweep interval in seconds.
pub const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 30;

/// Wall-clock bound on a PROCESSING job in seconds.
pub const DEFAULT_MAX_PROCESSING_SECS: u64 = 600;

/// Get the number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Default worker count: half the cores, clamped to 2..=8.
///
/// Workers spend most of their time waiting on collaborators, so there is no
/// benefit in scaling them past a small multiple of the expected concurrent
/// inbound rate.
pub fn default_workers() -> usize {
    (num_cpus() / 2).clamp(2, 8)
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            min_body_len: DEFAULT_MIN_BODY_LEN,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delays: DEFAULT_BACKOFF_SECS
                .iter()
                .map(|&s| Duration::from_secs(s))
                .collect(),
        }
    }
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_IDEMPOTENCY_TTL_SECS),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retrieve_timeout: Duration::from_secs(DEFAULT_RETRIEVE_TIMEOUT_SECS),
            generate_timeout: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
            repository_timeout: Duration::from_secs(DEFAULT_REPOSITORY_TIMEOUT_SECS),
            context_limit: DEFAULT_CONTEXT_LIMIT,
            min_artifact_len: DEFAULT_MIN_ARTIFACT_LEN,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            watchdog_interval: Duration::from_secs(DEFAULT_WATCHDOG_INTERVAL_SECS),
            max_processing: Duration::from_secs(DEFAULT_MAX_PROCESSING_SECS),
        }
    }
}
