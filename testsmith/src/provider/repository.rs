//! Version-control collaborator.

use crate::event::NaturalKey;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Reference to a created branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

impl BranchRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Reference to a written commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

impl CommitRef {
    pub fn new(sha: impl Into<String>) -> Self {
        Self { sha: sha.into() }
    }
}

/// Reference to an opened publish request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRef {
    pub number: u64,
    pub url: String,
}

impl PublishRef {
    pub fn new(number: u64, url: impl Into<String>) -> Self {
        Self {
            number,
            url: url.into(),
        }
    }
}

/// Errors raised by a repository client.
///
/// `BranchExists` is handled inline by the COMMIT stage (deterministic name
/// suffixing) and never reaches the retry policy.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A branch with the requested name already exists.
    #[error("branch '{name}' already exists")]
    BranchExists { name: String },
    /// The credentials lack the required permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The API rejected the call due to rate limiting.
    #[error("rate limited")]
    RateLimited,
    /// The service could not be reached or returned a server error.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Capability: branch creation, file commit, publish request, comment.
pub trait RepositoryClient: Send + Sync + 'static {
    /// Creates a branch off the default branch.
    fn create_branch(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BranchRef, RepositoryError>> + Send;

    /// Creates or updates a file on a branch.
    fn commit_file(
        &self,
        branch: &BranchRef,
        path: &str,
        content: &str,
        message: &str,
    ) -> impl Future<Output = Result<CommitRef, RepositoryError>> + Send;

    /// Opens a publish request from `branch` into the default branch.
    fn open_publish_request(
        &self,
        branch: &BranchRef,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<PublishRef, RepositoryError>> + Send;

    /// Posts a comment on the issue identified by `target`.
    fn post_comment(
        &self,
        target: &NaturalKey,
        body: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
