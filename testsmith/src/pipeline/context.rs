//! Pipeline context containing shared collaborators and tuning.
//!
//! The context holds the collaborator capabilities every stage needs plus
//! the per-stage tuning knobs. It is cheaply cloneable (collaborators behind
//! `Arc`) so workers can share one set of collaborators.

use crate::config::Config;
use crate::provider::{ContextRetriever, Generator, RepositoryClient};
use std::sync::Arc;
use std::time::Duration;

/// Tuning for the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Body length floor below which RECEIVE disqualifies the event.
    pub min_body_len: usize,
    /// Deadline for the context retriever query.
    pub retrieve_timeout: Duration,
    /// Deadline for the generation call.
    pub generate_timeout: Duration,
    /// Deadline for each repository operation.
    pub repository_timeout: Duration,
    /// Maximum context documents requested from the retriever.
    pub context_limit: usize,
    /// Minimum generated content length for structural validity.
    pub min_artifact_len: usize,
}

impl PipelineConfig {
    /// Builds pipeline tuning from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_body_len: config.intake.min_body_len,
            retrieve_timeout: config.pipeline.retrieve_timeout,
            generate_timeout: config.pipeline.generate_timeout,
            repository_timeout: config.pipeline.repository_timeout,
            context_limit: config.pipeline.context_limit,
            min_artifact_len: config.pipeline.min_artifact_len,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Shared collaborators + tuning for pipeline execution.
#[derive(Clone)]
pub struct PipelineContext<R, G, V>
where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    /// Similarity-search backend.
    pub retriever: Arc<R>,
    /// Content-generation backend.
    pub generator: Arc<G>,
    /// Version-control client.
    pub repository: Arc<V>,
    /// Stage tuning.
    pub config: PipelineConfig,
}

impl<R, G, V> PipelineContext<R, G, V>
where
    R: ContextRetriever,
    G: Generator,
    V: RepositoryClient,
{
    pub fn new(
        retriever: Arc<R>,
        generator: Arc<G>,
        repository: Arc<V>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            repository,
            config,
        }
    }
}
