//! Generated artifact model.
//!
//! A [`GeneratedArtifact`] is the product of the GENERATE stage: a markdown
//! test case document plus the provenance needed by the COMMIT and PUBLISH
//! stages. Created once per successful generation, immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one successful generation call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Document title, `Test Cases: {issue title}`.
    pub title: String,
    /// Markdown document body.
    pub content: String,
    /// Issue numbers of the context documents the generator was shown.
    pub sources: Vec<u64>,
    /// Identifier of the generation backend that produced the content.
    pub backend: String,
    /// When the content was generated.
    pub generated_at: DateTime<Utc>,
}

impl GeneratedArtifact {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        sources: Vec<u64>,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            sources,
            backend: backend.into(),
            generated_at: Utc::now(),
        }
    }

    /// Checks the structural validity rule for generated documents.
    ///
    /// A document is valid when it is non-blank, contains at least one
    /// markdown heading line, and is at least `min_len` characters long.
    /// Invalid documents are retried, never accepted silently.
    pub fn is_structurally_valid(&self, min_len: usize) -> bool {
        let trimmed = self.content.trim();
        !trimmed.is_empty() && trimmed.chars().count() >= min_len && has_markdown_heading(trimmed)
    }
}

/// Returns true if any line is a markdown heading (`#` to `######` followed
/// by whitespace and text).
fn has_markdown_heading(content: &str) -> bool {
    content.lines().any(|line| {
        let line = line.trim_start();
        let hashes = line.chars().take_while(|&c| c == '#').count();
        if hashes == 0 || hashes > 6 {
            return false;
        }
        line[hashes..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace())
            && !line[hashes..].trim().is_empty()
    })
}
