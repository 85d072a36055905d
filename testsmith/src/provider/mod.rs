//! Collaborator capabilities consumed by the pipeline.
//!
//! The orchestrator core treats its collaborators as opaque capabilities:
//! a similarity-search backend ([`ContextRetriever`]), a content-generation
//! backend ([`Generator`]), and a version-control client
//! ([`RepositoryClient`]). Each trait returns typed errors; mapping those
//! errors onto retry classifications happens at the executor boundary, never
//! inside a collaborator.

mod generator;
mod repository;
mod retriever;

pub use generator::{Generator, GeneratorError, PromptMaterial};
pub use repository::{BranchRef, CommitRef, PublishRef, RepositoryClient, RepositoryError};
pub use retriever::{ContextItem, ContextRetriever, RetrieverError};
