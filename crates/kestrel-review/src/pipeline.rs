use std::fmt;

use kestrel_core::{FeedbackComment, PullRequestInfo};
use kestrel_diff::parser::FileChange;
use serde::Serialize;

use crate::llm::{request_reviews, ChunkOutcome, CompletionClient};
use crate::mapper::map_findings;
use crate::prompt::build_review_prompt;

/// Result of a completed review run.
///
/// # Examples
///
/// ```
/// use kestrel_review::pipeline::{ReviewOutcome, ReviewStats};
///
/// let outcome = ReviewOutcome {
///     comments: vec![],
///     stats: ReviewStats {
///         files_reviewed: 0,
///         chunks_reviewed: 0,
///         failed_chunks: 0,
///         findings_received: 0,
///         findings_dropped: 0,
///         model_used: "gpt-4-1106-preview".into(),
///     },
/// };
/// assert!(outcome.comments.is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Accumulated comments, in diff order.
    pub comments: Vec<FeedbackComment>,
    /// Statistics about the run.
    pub stats: ReviewStats,
}

/// Statistics about a review run.
///
/// `failed_chunks` counts units whose completion call or response parsing
/// failed; those are invisible in the posted review (they contribute zero
/// comments, same as a clean no-issue verdict) but reported here so a failed
/// run does not masquerade as a quiet one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Number of files whose chunks were sent for review.
    pub files_reviewed: usize,
    /// Total chunks sent to the completion service.
    pub chunks_reviewed: usize,
    /// Chunks whose completion call or parse failed.
    pub failed_chunks: usize,
    /// Raw findings returned by the service across all chunks.
    pub findings_received: usize,
    /// Findings dropped for unusable or out-of-chunk line references.
    pub findings_dropped: usize,
    /// Model identifier used for the run.
    pub model_used: String,
}

/// Drives the diff-to-feedback pipeline over every retained file and chunk.
///
/// Units are processed strictly sequentially; the accumulator is appended to
/// only after a unit has fully resolved. A unit failure is absorbed and
/// counted, never propagated.
pub struct ReviewPipeline<C> {
    client: C,
}

impl<C: CompletionClient> ReviewPipeline<C> {
    /// Create a pipeline around a completion client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Consume the pipeline and hand the client back.
    pub fn into_client(self) -> C {
        self.client
    }

    /// Review every chunk of every file, in order, and accumulate comments.
    ///
    /// This performs no submission; the caller posts the accumulated
    /// comments exactly once if any exist.
    pub async fn review(&self, files: &[FileChange], pr: &PullRequestInfo) -> ReviewOutcome {
        let mut comments: Vec<FeedbackComment> = Vec::new();
        let mut stats = ReviewStats {
            files_reviewed: 0,
            chunks_reviewed: 0,
            failed_chunks: 0,
            findings_received: 0,
            findings_dropped: 0,
            model_used: self.client.model().to_string(),
        };

        for file in files {
            // Deletions are filtered out upstream; guard anyway.
            let Some(path) = file.new_path.as_deref() else {
                continue;
            };
            stats.files_reviewed += 1;

            for chunk in &file.chunks {
                stats.chunks_reviewed += 1;

                let prompt = build_review_prompt(path, chunk, pr);
                match request_reviews(&self.client, &prompt).await {
                    ChunkOutcome::Reviewed(findings) => {
                        stats.findings_received += findings.len();
                        let (mapped, dropped) = map_findings(path, &findings, chunk);
                        stats.findings_dropped += dropped;
                        comments.extend(mapped);
                    }
                    ChunkOutcome::Failed(reason) => {
                        stats.failed_chunks += 1;
                        eprintln!(
                            "warning: review of {} {} failed: {reason}",
                            path.display(),
                            chunk.header
                        );
                    }
                }
            }
        }

        ReviewOutcome { comments, stats }
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model: {} | Files: {} | Chunks: {} (failed: {}) | Findings: {} (dropped: {}) | Comments: {}",
            self.stats.model_used,
            self.stats.files_reviewed,
            self.stats.chunks_reviewed,
            self.stats.failed_chunks,
            self.stats.findings_received,
            self.stats.findings_dropped,
            self.comments.len(),
        )?;

        for c in &self.comments {
            writeln!(f, "{}:{}", c.path.display(), c.line)?;
            writeln!(f, "  {}", c.body)?;
        }

        Ok(())
    }
}
