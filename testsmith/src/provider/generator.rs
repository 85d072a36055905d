//! Content-generation collaborator.

use super::retriever::ContextItem;
use std::fmt::Write as _;
use std::future::Future;
use thiserror::Error;

/// How much of each context document is quoted into the prompt.
const CONTEXT_EXCERPT_LEN: usize = 500;

/// Prompt input assembled from the trigger event and retrieved context.
#[derive(Clone, Debug)]
pub struct PromptMaterial {
    /// Issue number of the triggering issue.
    pub issue_number: u64,
    /// Issue title.
    pub title: String,
    /// Issue body (already truncated at intake).
    pub body: String,
    /// Similar documents to show the backend as references.
    pub context: Vec<ContextItem>,
}

impl PromptMaterial {
    /// Renders the prompt text sent to the generation backend.
    ///
    /// Layout: task preamble, the issue, optional reference documents
    /// (excerpted), and the required output structure.
    pub fn render(&self) -> String {
        let mut prompt = String::with_capacity(1024);

        prompt.push_str(
            "You are an expert software testing engineer. Generate comprehensive \
             test cases for the GitHub issue below.\n\n",
        );
        let _ = writeln!(
            prompt,
            "## GitHub Issue\n\n**Issue #{}: {}**\n\n{}\n",
            self.issue_number, self.title, self.body
        );

        if !self.context.is_empty() {
            prompt.push_str(
                "\n## Similar Test Cases for Reference\n\n\
                 Use these previously generated documents as inspiration for \
                 structure and coverage:\n",
            );
            for (i, item) in self.context.iter().enumerate() {
                let excerpt: String = item.content.chars().take(CONTEXT_EXCERPT_LEN).collect();
                let _ = writeln!(
                    prompt,
                    "\n### Reference {}: Issue #{}\n{}",
                    i + 1,
                    item.source_issue,
                    excerpt
                );
            }
        }

        let _ = writeln!(
            prompt,
            "\n## Your Task\n\nProduce a markdown document titled \
             `# Test Cases: {}` with Overview, Prerequisites, and Test \
             Scenarios sections. Each scenario must state Given/When/Then and \
             numbered test steps.",
            self.title
        );

        prompt
    }
}

/// Errors raised by a generation backend.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The backend could not be reached.
    #[error("generator unavailable: {0}")]
    Unavailable(String),
    /// The backend accepted the prompt but failed to produce content.
    #[error("generation failed: {0}")]
    Backend(String),
}

/// Capability: produce a test case document from prompt material.
///
/// The call is bounded by the executor's generation timeout; expiry is
/// classified as retryable-transient by the caller, not here.
pub trait Generator: Send + Sync + 'static {
    /// Generates document content for the given material.
    fn generate(
        &self,
        material: &PromptMaterial,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send;

    /// Identifier of the backend (e.g. a model name), recorded on artifacts.
    fn backend(&self) -> &str;
}
