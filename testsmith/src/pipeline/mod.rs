//! Stage pipeline for test case generation.
//!
//! One job flows through a fixed sequence of stages:
//!
//! ```text
//! RECEIVE → RETRIEVE → GENERATE → COMMIT → PUBLISH → FINALIZE
//! ```
//!
//! The [`PipelineExecutor`] persists every transition through the job store
//! before running the next stage, classifies stage failures at its boundary,
//! and consults the retry policy on failure. Stage-output references
//! recorded on the job (branch, commit, publish) make resume idempotent:
//! a retried or recovered job never repeats a side effect that already
//! produced a reference.
//!
//! # Key Components
//!
//! - [`PipelineExecutor`] - drives one job through the stages
//! - [`PipelineContext`] - shared collaborators + tuning
//! - [`StageFailure`] - classified stage error fed to the retry policy
//! - [`stages`] - the six stage functions

mod context;
mod error;
mod executor;
mod result;
pub mod stages;

pub use context::{PipelineConfig, PipelineContext};
pub use error::{Disqualified, StageFailure};
pub use executor::PipelineExecutor;
pub use result::{StageOutcome, StageResult};
