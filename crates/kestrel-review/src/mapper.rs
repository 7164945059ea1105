//! Resolve raw findings into submittable review comments.

use std::collections::HashSet;
use std::path::Path;

use kestrel_core::{DiffChunk, FeedbackComment};

use crate::prompt::Finding;

/// Map one chunk's findings onto absolute file/line comments.
///
/// Each finding's line reference is coerced to a number (JSON numbers and
/// numeric strings are accepted) and cross-checked against the destination
/// line numbers actually present in the chunk. Findings that fail either
/// step are dropped with a warning: the model saw exactly those numbers in
/// its prompt, so anything else is a hallucination the submission API would
/// reject.
///
/// Returns the comments (message text verbatim, input order preserved) and
/// the number of findings dropped.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kestrel_core::{DiffChunk, DiffLine, LineKind};
/// use kestrel_review::mapper::map_findings;
/// use kestrel_review::prompt::parse_review_response;
///
/// let chunk = DiffChunk {
///     header: "@@ -1 +1,2 @@".into(),
///     old_start: 1, old_lines: 1, new_start: 1, new_lines: 2,
///     lines: vec![DiffLine {
///         kind: LineKind::Added,
///         old_line: None,
///         new_line: Some(2),
///         content: "+let unused = 3;".into(),
///     }],
/// };
/// let findings =
///     parse_review_response(r#"{"reviews":[{"lineNumber":2,"reviewComment":"unused"}]}"#)
///         .unwrap();
/// let (comments, dropped) = map_findings(Path::new("a.rs"), &findings, &chunk);
/// assert_eq!(comments.len(), 1);
/// assert_eq!(dropped, 0);
/// assert_eq!(comments[0].line, 2);
/// ```
pub fn map_findings(
    path: &Path,
    findings: &[Finding],
    chunk: &DiffChunk,
) -> (Vec<FeedbackComment>, usize) {
    let valid: HashSet<u32> = chunk.lines.iter().filter_map(|l| l.new_line).collect();

    let mut comments = Vec::new();
    let mut dropped = 0usize;

    for finding in findings {
        let Some(line) = coerce_line(&finding.line_number) else {
            eprintln!(
                "warning: dropping finding for {}: unusable line reference {}",
                path.display(),
                finding.line_number
            );
            dropped += 1;
            continue;
        };

        if !valid.contains(&line) {
            eprintln!(
                "warning: dropping finding for {}:{line}: line not present in reviewed chunk",
                path.display()
            );
            dropped += 1;
            continue;
        }

        comments.push(FeedbackComment {
            path: path.to_path_buf(),
            line,
            body: finding.review_comment.clone(),
        });
    }

    (comments, dropped)
}

/// Deterministic coercion of a raw line reference to a line number.
fn coerce_line(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{DiffLine, LineKind};
    use std::path::PathBuf;

    fn chunk_with_destinations(lines: &[u32]) -> DiffChunk {
        DiffChunk {
            header: "@@ -1 +1 @@".into(),
            old_start: 1,
            old_lines: 1,
            new_start: 1,
            new_lines: lines.len() as u32,
            lines: lines
                .iter()
                .map(|&n| DiffLine {
                    kind: LineKind::Added,
                    old_line: None,
                    new_line: Some(n),
                    content: format!("+line {n}"),
                })
                .collect(),
        }
    }

    fn finding(line: serde_json::Value, comment: &str) -> Finding {
        Finding {
            line_number: line,
            review_comment: comment.into(),
        }
    }

    #[test]
    fn one_comment_per_finding_order_and_text_preserved() {
        let chunk = chunk_with_destinations(&[5, 6, 7]);
        let findings = vec![
            finding(serde_json::json!(7), "third first"),
            finding(serde_json::json!(5), "then first"),
        ];
        let (comments, dropped) = map_findings(Path::new("src/a.rs"), &findings, &chunk);

        assert_eq!(dropped, 0);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].line, 7);
        assert_eq!(comments[0].body, "third first");
        assert_eq!(comments[1].line, 5);
        assert_eq!(comments[1].body, "then first");
        assert_eq!(comments[0].path, PathBuf::from("src/a.rs"));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let chunk = chunk_with_destinations(&[12]);
        let findings = vec![finding(serde_json::json!("12"), "stringly typed")];
        let (comments, dropped) = map_findings(Path::new("a.rs"), &findings, &chunk);
        assert_eq!(dropped, 0);
        assert_eq!(comments[0].line, 12);
    }

    #[test]
    fn lines_outside_chunk_are_dropped() {
        let chunk = chunk_with_destinations(&[5]);
        let findings = vec![
            finding(serde_json::json!(5), "kept"),
            finding(serde_json::json!(999), "hallucinated"),
        ];
        let (comments, dropped) = map_findings(Path::new("a.rs"), &findings, &chunk);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "kept");
        assert_eq!(dropped, 1);
    }

    #[test]
    fn origin_only_lines_are_not_valid_targets() {
        // A chunk of pure removals has no destination line to anchor to.
        let chunk = DiffChunk {
            header: "@@ -1,2 +0,0 @@".into(),
            old_start: 1,
            old_lines: 2,
            new_start: 0,
            new_lines: 0,
            lines: vec![
                DiffLine {
                    kind: LineKind::Removed,
                    old_line: Some(1),
                    new_line: None,
                    content: "-gone".into(),
                },
                DiffLine {
                    kind: LineKind::Removed,
                    old_line: Some(2),
                    new_line: None,
                    content: "-also gone".into(),
                },
            ],
        };
        let findings = vec![finding(serde_json::json!(1), "about a removed line")];
        let (comments, dropped) = map_findings(Path::new("a.rs"), &findings, &chunk);
        assert!(comments.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn unusable_references_are_dropped() {
        let chunk = chunk_with_destinations(&[1]);
        let findings = vec![
            finding(serde_json::Value::Null, "no line"),
            finding(serde_json::json!("not-a-number"), "garbage line"),
            finding(serde_json::json!([1]), "wrong type"),
            finding(serde_json::json!(-4), "negative"),
        ];
        let (comments, dropped) = map_findings(Path::new("a.rs"), &findings, &chunk);
        assert!(comments.is_empty());
        assert_eq!(dropped, 4);
    }

    #[test]
    fn empty_findings_empty_result() {
        let chunk = chunk_with_destinations(&[1]);
        let (comments, dropped) = map_findings(Path::new("a.rs"), &[], &chunk);
        assert!(comments.is_empty());
        assert_eq!(dropped, 0);
    }
}
