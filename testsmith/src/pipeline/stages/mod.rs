//! Pipeline stages in fixed execution order.
//!
//! Each stage is a free async function responsible for one step:
//!
//! 1. **Receive** - validate the trigger event, disqualify weak input
//! 2. **Retrieve** - query similar documents (degrades to empty on failure)
//! 3. **Generate** - produce and structurally validate the document
//! 4. **Commit** - create the branch and write the file
//! 5. **Publish** - open the publish request
//! 6. **Finalize** - post the completion notice (best-effort)

mod commit;
mod finalize;
mod generate;
mod publish;
mod receive;
mod retrieve;

pub use commit::commit_stage;
pub use finalize::finalize_stage;
pub use generate::generate_stage;
pub use publish::publish_stage;
pub use receive::receive_stage;
pub use retrieve::retrieve_stage;

use super::error::StageFailure;
use std::future::Future;
use std::time::Duration;

/// Runs a collaborator call under a deadline, classifying both the timeout
/// and the collaborator's own error at this boundary.
pub(super) async fn with_deadline<T, E, Fut>(
    what: &str,
    deadline: Duration,
    fut: Fut,
) -> Result<T, StageFailure>
where
    Fut: Future<Output = Result<T, E>>,
    StageFailure: From<E>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StageFailure::from(err)),
        Err(_) => Err(StageFailure::timed_out(what, deadline.as_secs())),
    }
}
