use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata for the pull request under review.
///
/// Fetched once per run and treated as immutable afterwards. The title and
/// body are embedded verbatim into every review prompt as context.
///
/// # Examples
///
/// ```
/// use kestrel_core::PullRequestInfo;
///
/// let pr = PullRequestInfo {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     number: 42,
///     title: "Add greeting".into(),
///     body: "Adds a greeting to main".into(),
/// };
/// assert_eq!(pr.number, 42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInfo {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Pull request title.
    pub title: String,
    /// Pull request description, empty if none was written.
    pub body: String,
}

impl fmt::Display for PullRequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Classification of a single diff line.
///
/// # Examples
///
/// ```
/// use kestrel_core::LineKind;
///
/// let kind = LineKind::Added;
/// assert_eq!(serde_json::to_string(&kind).unwrap(), "\"added\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Line present only in the new version.
    Added,
    /// Line present only in the old version.
    Removed,
    /// Unchanged line shown for context.
    Context,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Added => write!(f, "added"),
            LineKind::Removed => write!(f, "removed"),
            LineKind::Context => write!(f, "context"),
        }
    }
}

/// One line of a diff hunk with its line-number anchors.
///
/// `content` keeps the raw text including the leading `+`/`-`/space marker,
/// so joining the lines of a chunk reproduces the hunk body exactly.
///
/// Per unified-diff semantics, added lines carry only a destination number,
/// removed lines only an origin number, and context lines both.
///
/// # Examples
///
/// ```
/// use kestrel_core::{DiffLine, LineKind};
///
/// let line = DiffLine {
///     kind: LineKind::Added,
///     old_line: None,
///     new_line: Some(12),
///     content: "+    retry(3);".into(),
/// };
/// assert_eq!(line.anchor(), Some(12));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Whether the line was added, removed, or is context.
    pub kind: LineKind,
    /// Line number in the old version, when meaningful.
    pub old_line: Option<u32>,
    /// Line number in the new version, when meaningful.
    pub new_line: Option<u32>,
    /// Raw line text including the diff marker.
    pub content: String,
}

impl DiffLine {
    /// The line number a review comment about this line should anchor to:
    /// the destination number for added/context lines, the origin number
    /// for removed lines.
    pub fn anchor(&self) -> Option<u32> {
        match self.kind {
            LineKind::Added | LineKind::Context => self.new_line,
            LineKind::Removed => self.old_line,
        }
    }
}

/// A contiguous hunk from a unified diff.
///
/// # Examples
///
/// ```
/// use kestrel_core::DiffChunk;
///
/// let chunk = DiffChunk {
///     header: "@@ -1,3 +1,4 @@ fn main()".into(),
///     old_start: 1,
///     old_lines: 3,
///     new_start: 1,
///     new_lines: 4,
///     lines: Vec::new(),
/// };
/// assert_eq!(chunk.new_start, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffChunk {
    /// The full `@@ … @@` header line as it appeared in the diff.
    pub header: String,
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Lines in diff order.
    pub lines: Vec<DiffLine>,
}

impl DiffChunk {
    /// Reassemble the hunk body (everything below the header) exactly as it
    /// appeared in the input diff, one line per entry, newline-terminated.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_core::{DiffChunk, DiffLine, LineKind};
    ///
    /// let chunk = DiffChunk {
    ///     header: "@@ -1 +1,2 @@".into(),
    ///     old_start: 1,
    ///     old_lines: 1,
    ///     new_start: 1,
    ///     new_lines: 2,
    ///     lines: vec![
    ///         DiffLine { kind: LineKind::Context, old_line: Some(1), new_line: Some(1), content: " fn main() {}".into() },
    ///         DiffLine { kind: LineKind::Added, old_line: None, new_line: Some(2), content: "+// docs".into() },
    ///     ],
    /// };
    /// assert_eq!(chunk.body(), " fn main() {}\n+// docs\n");
    /// ```
    pub fn body(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.content);
            out.push('\n');
        }
        out
    }

    /// Destination line numbers present in this chunk, in diff order.
    ///
    /// These are the only line numbers the submission API will accept for
    /// comments on this chunk.
    pub fn destination_lines(&self) -> Vec<u32> {
        self.lines.iter().filter_map(|l| l.new_line).collect()
    }
}

/// A review comment resolved to an absolute file path and destination line,
/// ready for submission.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use kestrel_core::FeedbackComment;
///
/// let comment = FeedbackComment {
///     path: PathBuf::from("src/main.rs"),
///     line: 5,
///     body: "avoid unused variable".into(),
/// };
/// assert_eq!(comment.line, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackComment {
    /// Path to the file in the new revision.
    pub path: PathBuf,
    /// Line number in the new version of the file.
    pub line: u32,
    /// Comment text, GitHub Markdown.
    pub body: String,
}

impl fmt::Display for FeedbackComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.path.display(), self.line, self.body)
    }
}
