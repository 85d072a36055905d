//! FINALIZE stage - post the completion notice.
//!
//! Best-effort by design: once COMMIT and PUBLISH have succeeded the primary
//! deliverable exists, so a failed comment must not fail the job. The caller
//! logs the failure and completes the job regardless.

use crate::event::TriggerEvent;
use crate::pipeline::error::StageFailure;
use crate::pipeline::PipelineConfig;
use crate::provider::{PublishRef, RepositoryClient};
use tracing::debug;

/// Posts the completion comment on the triggering issue.
pub async fn finalize_stage<V>(
    repository: &V,
    event: &TriggerEvent,
    publish: &PublishRef,
    config: &PipelineConfig,
) -> Result<(), StageFailure>
where
    V: RepositoryClient,
{
    let comment = format!(
        "Test cases have been generated and are ready for review.\n\n\
         Pull request: {}",
        publish.url
    );

    super::with_deadline(
        "completion comment",
        config.repository_timeout,
        repository.post_comment(&event.natural_key, &comment),
    )
    .await?;

    debug!(
        natural_key = %event.natural_key,
        publish_url = %publish.url,
        "Completion notice posted"
    );
    Ok(())
}
