//! COMMIT stage - create the branch and write the document.
//!
//! Branch-name collisions are resolved inline by retrying once with a
//! deterministic suffix; they never reach the retry policy. When a resumed
//! job already carries a branch ref, creation is skipped and only the
//! missing commit is performed.

use crate::artifact::GeneratedArtifact;
use crate::pipeline::error::StageFailure;
use crate::pipeline::PipelineConfig;
use crate::provider::{BranchRef, CommitRef, RepositoryClient, RepositoryError};
use tracing::{debug, warn};

/// Branch and file naming scheme for generated documents.
fn branch_name(issue_number: u64) -> String {
    format!("test-cases/issue-{issue_number}")
}

fn file_path(issue_number: u64) -> String {
    format!("test-cases/issue-{issue_number}.md")
}

fn commit_message(issue_number: u64) -> String {
    format!("Add test cases for issue #{issue_number}")
}

/// Creates the branch (unless already recorded) and commits the document.
///
/// `disambiguator` is a job-unique suffix used when the primary branch name
/// collides with an existing branch.
pub async fn commit_stage<V>(
    repository: &V,
    issue_number: u64,
    artifact: &GeneratedArtifact,
    existing_branch: Option<&BranchRef>,
    disambiguator: &str,
    config: &PipelineConfig,
) -> Result<(BranchRef, CommitRef), StageFailure>
where
    V: RepositoryClient,
{
    let branch = match existing_branch {
        Some(branch) => {
            debug!(branch = %branch.name, "Resuming with previously created branch");
            branch.clone()
        }
        None => create_branch_resolving_collision(repository, issue_number, disambiguator, config)
            .await?,
    };

    let commit = super::with_deadline(
        "file commit",
        config.repository_timeout,
        repository.commit_file(
            &branch,
            &file_path(issue_number),
            &artifact.content,
            &commit_message(issue_number),
        ),
    )
    .await?;

    debug!(branch = %branch.name, commit = %commit.sha, "Document committed");
    Ok((branch, commit))
}

/// Creates the branch, suffixing the name once on collision.
async fn create_branch_resolving_collision<V>(
    repository: &V,
    issue_number: u64,
    disambiguator: &str,
    config: &PipelineConfig,
) -> Result<BranchRef, StageFailure>
where
    V: RepositoryClient,
{
    let name = branch_name(issue_number);

    let first_attempt = tokio::time::timeout(
        config.repository_timeout,
        repository.create_branch(&name),
    )
    .await;

    match first_attempt {
        Ok(Ok(branch)) => Ok(branch),
        Ok(Err(RepositoryError::BranchExists { .. })) => {
            let suffixed = format!("{name}-{disambiguator}");
            warn!(
                branch = %name,
                retry_branch = %suffixed,
                "Branch name collision; retrying with suffixed name"
            );
            super::with_deadline(
                "branch creation",
                config.repository_timeout,
                repository.create_branch(&suffixed),
            )
            .await
        }
        Ok(Err(err)) => Err(StageFailure::from(err)),
        Err(_) => Err(StageFailure::timed_out(
            "branch creation",
            config.repository_timeout.as_secs(),
        )),
    }
}
