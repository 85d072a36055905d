//! Similarity-search collaborator.

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// One document returned by a similarity query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextItem {
    /// Document content (markdown).
    pub content: String,
    /// Issue number the document was originally generated for.
    pub source_issue: u64,
}

impl ContextItem {
    pub fn new(content: impl Into<String>, source_issue: u64) -> Self {
        Self {
            content: content.into(),
            source_issue,
        }
    }
}

/// Errors raised by a context retriever.
#[derive(Debug, Error)]
pub enum RetrieverError {
    /// The backend could not be reached or refused the query.
    #[error("retriever unavailable: {0}")]
    Unavailable(String),
    /// The query failed inside the backend.
    #[error("retriever query failed: {0}")]
    QueryFailed(String),
}

/// Capability: find documents similar to a piece of text.
///
/// An empty result is valid, not an error. Callers bound the call with their
/// own timeout; implementations should still fail fast when the backend is
/// down rather than hang.
pub trait ContextRetriever: Send + Sync + 'static {
    /// Returns up to `limit` documents similar to `text`, most similar first.
    fn query(
        &self,
        text: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ContextItem>, RetrieverError>> + Send;
}
