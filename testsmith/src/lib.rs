//! Testsmith - issue-triggered test case generation orchestrator.
//!
//! This library accepts an external trigger event (an issue tagged for test
//! generation), admits it through an idempotency guard, and drives it through
//! a fixed six-stage pipeline with retries, duplicate suppression, and
//! end-to-end traceability.
//!
//! # Architecture
//!
//! ```text
//! TriggerEvent → Idempotency Guard → Job Store (PENDING) → Worker Pool
//!                                                              │
//!        RECEIVE → RETRIEVE → GENERATE → COMMIT → PUBLISH → FINALIZE
//!                                                              │
//!                              Job Store (COMPLETED / FAILED / SKIPPED)
//! ```
//!
//! # High-Level API
//!
//! The [`service`] module provides the orchestrator facade:
//!
//! ```ignore
//! use testsmith::config::Config;
//! use testsmith::service::{Orchestrator, SubmitOutcome};
//!
//! let orchestrator = Orchestrator::new(&Config::default(), retriever, generator, repository, store);
//!
//! match orchestrator.submit(event).await? {
//!     SubmitOutcome::Accepted(job_id) => println!("admitted as {job_id}"),
//!     SubmitOutcome::Duplicate => println!("already seen"),
//! }
//! ```
//!
//! Collaborators (context retriever, generation backend, repository client)
//! are consumed through the traits in [`provider`] and implemented outside
//! this crate.

pub mod artifact;
pub mod config;
pub mod event;
pub mod guard;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod retry;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod trace;

/// Version of the testsmith library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
