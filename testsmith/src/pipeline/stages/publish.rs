//! PUBLISH stage - open the publish request for the committed document.

use crate::artifact::GeneratedArtifact;
use crate::event::TriggerEvent;
use crate::pipeline::error::StageFailure;
use crate::pipeline::PipelineConfig;
use crate::provider::{BranchRef, PublishRef, RepositoryClient};
use std::fmt::Write as _;
use tracing::debug;

/// Builds the publish request body: provenance, context sources, and the
/// closing reference back to the triggering issue.
fn publish_body(event: &TriggerEvent, artifact: &GeneratedArtifact) -> String {
    let mut body = format!(
        "Automated test case generation for: **{}**\n\n",
        event.title
    );

    if !artifact.sources.is_empty() {
        body.push_str("### Context Sources\n\nGenerated using similar test cases from:\n");
        for source in &artifact.sources {
            let _ = writeln!(body, "- Issue #{source}");
        }
        body.push('\n');
    }

    let _ = write!(body, "Closes #{}", event.natural_key.issue_number);
    body
}

/// Opens the publish request referencing the artifact and the trigger event.
pub async fn publish_stage<V>(
    repository: &V,
    event: &TriggerEvent,
    artifact: &GeneratedArtifact,
    branch: &BranchRef,
    config: &PipelineConfig,
) -> Result<PublishRef, StageFailure>
where
    V: RepositoryClient,
{
    let body = publish_body(event, artifact);

    let publish = super::with_deadline(
        "publish request",
        config.repository_timeout,
        repository.open_publish_request(branch, &artifact.title, &body),
    )
    .await?;

    debug!(
        natural_key = %event.natural_key,
        publish_number = publish.number,
        publish_url = %publish.url,
        "Publish request opened"
    );
    Ok(publish)
}
