//! RETRIEVE stage - look up similar documents for prompt context.
//!
//! Degrade, do not abort: a retriever that is down, erroring, or slow costs
//! the job its context, never its life. An empty result is perfectly valid.

use crate::event::TriggerEvent;
use crate::pipeline::PipelineConfig;
use crate::provider::{ContextItem, ContextRetriever};
use tracing::{debug, warn};

/// Queries the retriever for context documents, degrading to an empty set on
/// unavailability or timeout.
pub async fn retrieve_stage<R>(
    retriever: &R,
    event: &TriggerEvent,
    config: &PipelineConfig,
) -> Vec<ContextItem>
where
    R: ContextRetriever,
{
    let query = retriever.query(&event.body, config.context_limit);

    match tokio::time::timeout(config.retrieve_timeout, query).await {
        Ok(Ok(items)) => {
            debug!(
                natural_key = %event.natural_key,
                count = items.len(),
                "Context retrieved"
            );
            items
        }
        Ok(Err(err)) => {
            warn!(
                natural_key = %event.natural_key,
                error = %err,
                "Context retriever failed; proceeding without context"
            );
            Vec::new()
        }
        Err(_) => {
            warn!(
                natural_key = %event.natural_key,
                timeout_secs = config.retrieve_timeout.as_secs(),
                "Context retriever timed out; proceeding without context"
            );
            Vec::new()
        }
    }
}
