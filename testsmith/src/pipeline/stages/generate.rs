//! GENERATE stage - produce and validate the test case document.
//!
//! The generation call runs under the longest deadline in the pipeline. A
//! timeout is retryable-transient; a structurally invalid document is also
//! retried (regeneration may produce a valid one) — it is never accepted
//! silently.

use crate::artifact::GeneratedArtifact;
use crate::event::TriggerEvent;
use crate::pipeline::error::StageFailure;
use crate::pipeline::PipelineConfig;
use crate::provider::{ContextItem, Generator, PromptMaterial};
use crate::retry::ErrorClass;
use tracing::debug;

/// Generates the document for an event with the given context.
pub async fn generate_stage<G>(
    generator: &G,
    event: &TriggerEvent,
    context: &[ContextItem],
    config: &PipelineConfig,
) -> Result<GeneratedArtifact, StageFailure>
where
    G: Generator,
{
    let material = PromptMaterial {
        issue_number: event.natural_key.issue_number,
        title: event.title.clone(),
        body: event.body.clone(),
        context: context.to_vec(),
    };

    let content = super::with_deadline(
        "generation",
        config.generate_timeout,
        generator.generate(&material),
    )
    .await?;

    let artifact = GeneratedArtifact::new(
        format!("Test Cases: {}", event.title),
        content,
        context.iter().map(|c| c.source_issue).collect(),
        generator.backend(),
    );

    if !artifact.is_structurally_valid(config.min_artifact_len) {
        return Err(StageFailure::new(
            ErrorClass::InvalidArtifact,
            format!(
                "generated document failed structural validation \
                 ({} chars, floor {})",
                artifact.content.trim().chars().count(),
                config.min_artifact_len
            ),
        ));
    }

    debug!(
        natural_key = %event.natural_key,
        backend = artifact.backend,
        content_len = artifact.content.len(),
        sources = artifact.sources.len(),
        "Document generated"
    );
    Ok(artifact)
}
