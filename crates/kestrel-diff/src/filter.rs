//! Pre-review file filtering.
//!
//! Drops files that must never be sent to the completion service: deletions
//! (there is no destination line to anchor a comment to) and files matching
//! the configured exclusion globs.

use std::path::PathBuf;

use crate::parser::FileChange;

/// Exclusion filter built from glob patterns.
///
/// Patterns use standard shell-glob semantics (`*`, `**`, `?`, character
/// classes) and are matched against the destination path.
///
/// # Examples
///
/// ```
/// use kestrel_diff::filter::ExclusionFilter;
///
/// let filter = ExclusionFilter::new(&["*.md".into(), "dist/**".into()]);
/// assert!(filter.matches("README.md"));
/// assert!(filter.matches("dist/bundle/app.js"));
/// assert!(!filter.matches("src/main.ts"));
/// ```
pub struct ExclusionFilter {
    patterns: Vec<glob::Pattern>,
}

impl ExclusionFilter {
    /// Build a filter from pattern strings. Invalid patterns are skipped
    /// with a warning rather than failing the run.
    pub fn new(patterns: &[String]) -> Self {
        let mut compiled = Vec::new();
        for pat in patterns {
            match glob::Pattern::new(pat) {
                Ok(p) => compiled.push(p),
                Err(e) => eprintln!("warning: ignoring invalid exclude pattern {pat:?}: {e}"),
            }
        }
        Self { patterns: compiled }
    }

    /// Check whether a destination path matches any exclusion pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    /// Filter a list of [`FileChange`]s, returning only reviewable ones.
    ///
    /// A file is kept when it has a destination path (not a deletion) and
    /// that path matches no exclusion pattern. Order is preserved, and
    /// filtering an already-filtered list is a no-op.
    ///
    /// # Examples
    ///
    /// ```
    /// use kestrel_diff::filter::ExclusionFilter;
    /// use kestrel_diff::parser::parse_unified_diff;
    ///
    /// let diff = "diff --git a/src/main.rs b/src/main.rs\n\
    ///             --- a/src/main.rs\n\
    ///             +++ b/src/main.rs\n\
    ///             @@ -1,2 +1,3 @@\n\
    ///              line\n\
    ///             +new\n";
    /// let files = parse_unified_diff(diff);
    /// let result = ExclusionFilter::new(&[]).filter(files);
    /// assert_eq!(result.kept.len(), 1);
    /// assert!(result.skipped.is_empty());
    /// ```
    pub fn filter(&self, changes: Vec<FileChange>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for change in changes {
            let Some(new_path) = change.new_path.as_ref() else {
                skipped.push(SkippedFile {
                    path: change.old_path.clone(),
                    reason: SkipReason::Deleted,
                });
                continue;
            };

            let path_str = new_path.to_string_lossy();
            match self.patterns.iter().find(|p| p.matches(&path_str)) {
                Some(pat) => skipped.push(SkippedFile {
                    path: new_path.clone(),
                    reason: SkipReason::PatternMatch(pat.to_string()),
                }),
                None => kept.push(change),
            }
        }

        FilterResult { kept, skipped }
    }
}

/// Result of filtering a parsed diff.
pub struct FilterResult {
    /// Files that passed the filter, in input order.
    pub kept: Vec<FileChange>,
    /// Files that were dropped, with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was dropped during filtering.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path of the skipped file (origin path for deletions).
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was dropped.
///
/// # Examples
///
/// ```
/// use kestrel_diff::filter::SkipReason;
///
/// assert_eq!(format!("{}", SkipReason::Deleted), "file deleted");
/// ```
#[derive(Debug, Clone)]
pub enum SkipReason {
    /// The file was deleted; there is no destination to comment on.
    Deleted,
    /// The destination path matched an exclusion pattern.
    PatternMatch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Deleted => write!(f, "file deleted"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}
