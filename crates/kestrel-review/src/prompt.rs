use std::fmt::Write;
use std::path::Path;

use kestrel_core::{DiffChunk, KestrelError, PullRequestInfo};
use serde::Deserialize;

const REVIEW_INSTRUCTIONS: &str = "\
You are a code review bot. Your task is to review pull request changes.

Instructions:
- Respond with JSON only: {\"reviews\": [{\"lineNumber\": <line>, \"reviewComment\": \"<comment>\"}]}
- Only comment if there is something to improve; otherwise \"reviews\" is an empty array.
- Never write compliments or positive feedback.
- Write comments in GitHub Markdown.
- Use the pull request title and description for context, but comment only on the code.
- Do NOT suggest adding comments to the code.";

/// Build the self-contained review request for one chunk of one file.
///
/// The text embeds everything the model needs: the fixed instruction block,
/// the pull request title and description verbatim, and the chunk rendered
/// with one line-number annotation per line. Added and context lines show
/// their destination number, removed lines their origin number — the same
/// numbers a returned finding must reference.
///
/// Deterministic for identical inputs.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kestrel_core::{DiffChunk, DiffLine, LineKind, PullRequestInfo};
/// use kestrel_review::prompt::build_review_prompt;
///
/// let chunk = DiffChunk {
///     header: "@@ -1 +1,2 @@".into(),
///     old_start: 1, old_lines: 1, new_start: 1, new_lines: 2,
///     lines: vec![DiffLine {
///         kind: LineKind::Added,
///         old_line: None,
///         new_line: Some(2),
///         content: "+let x = 1;".into(),
///     }],
/// };
/// let pr = PullRequestInfo {
///     owner: "o".into(), repo: "r".into(), number: 1,
///     title: "Add x".into(), body: "".into(),
/// };
/// let prompt = build_review_prompt(Path::new("src/lib.rs"), &chunk, &pr);
/// assert!(prompt.contains("2 +let x = 1;"));
/// assert!(prompt.contains("src/lib.rs"));
/// ```
pub fn build_review_prompt(path: &Path, chunk: &DiffChunk, pr: &PullRequestInfo) -> String {
    let mut prompt = String::new();
    prompt.push_str(REVIEW_INSTRUCTIONS);
    prompt.push_str("\n\n");

    let _ = writeln!(prompt, "Pull request title: {}", pr.title);
    prompt.push_str("Pull request description:\n\n---\n");
    prompt.push_str(&pr.body);
    prompt.push_str("\n---\n\n");

    let _ = writeln!(prompt, "Diff of file \"{}\" to review:", path.display());
    prompt.push_str("\n```diff\n");
    let _ = writeln!(prompt, "{}", chunk.header);
    for line in &chunk.lines {
        match line.anchor() {
            Some(n) => {
                let _ = writeln!(prompt, "{n} {}", line.content);
            }
            None => {
                let _ = writeln!(prompt, "{}", line.content);
            }
        }
    }
    prompt.push_str("```\n");

    prompt
}

/// A single raw finding as emitted by the completion service.
///
/// The line reference is kept as a raw JSON value: models sometimes return
/// it as a string, and coercion plus validation happen in the mapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Finding {
    /// The line the comment refers to, as the model sent it.
    #[serde(rename = "lineNumber")]
    pub line_number: serde_json::Value,
    /// The review comment text.
    #[serde(rename = "reviewComment")]
    pub review_comment: String,
}

#[derive(Deserialize)]
struct ReviewsResponse {
    reviews: Vec<Finding>,
}

/// Parse a completion response strictly as the fixed reviews shape.
///
/// Tolerates markdown code fences around the JSON, but nothing else: a
/// response that is not JSON or lacks the `reviews` key is an error, which
/// the requester converts into a failed (zero-finding) unit.
///
/// # Errors
///
/// Returns [`KestrelError::Serialization`] when the response does not decode
/// into the expected shape.
///
/// # Examples
///
/// ```
/// use kestrel_review::prompt::parse_review_response;
///
/// let findings = parse_review_response(r#"{"reviews":[]}"#).unwrap();
/// assert!(findings.is_empty());
///
/// assert!(parse_review_response("not json").is_err());
/// ```
pub fn parse_review_response(response: &str) -> Result<Vec<Finding>, KestrelError> {
    let cleaned = strip_code_fences(response);
    let parsed: ReviewsResponse = serde_json::from_str(cleaned)?;
    Ok(parsed.reviews)
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{DiffLine, LineKind};

    fn sample_pr() -> PullRequestInfo {
        PullRequestInfo {
            owner: "octocat".into(),
            repo: "demo".into(),
            number: 9,
            title: "Tighten validation".into(),
            body: "Rejects empty payloads early.".into(),
        }
    }

    fn sample_chunk() -> DiffChunk {
        DiffChunk {
            header: "@@ -3,3 +3,4 @@ fn validate()".into(),
            old_start: 3,
            old_lines: 3,
            new_start: 3,
            new_lines: 4,
            lines: vec![
                DiffLine {
                    kind: LineKind::Context,
                    old_line: Some(3),
                    new_line: Some(3),
                    content: " let input = read();".into(),
                },
                DiffLine {
                    kind: LineKind::Removed,
                    old_line: Some(4),
                    new_line: None,
                    content: "-process(input);".into(),
                },
                DiffLine {
                    kind: LineKind::Added,
                    old_line: None,
                    new_line: Some(4),
                    content: "+if input.is_empty() { return; }".into(),
                },
                DiffLine {
                    kind: LineKind::Added,
                    old_line: None,
                    new_line: Some(5),
                    content: "+process(input);".into(),
                },
            ],
        }
    }

    #[test]
    fn prompt_embeds_title_and_description() {
        let prompt = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        assert!(prompt.contains("Pull request title: Tighten validation"));
        assert!(prompt.contains("Rejects empty payloads early."));
    }

    #[test]
    fn prompt_states_the_response_shape() {
        let prompt = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        assert!(prompt.contains("\"reviews\""));
        assert!(prompt.contains("lineNumber"));
        assert!(prompt.contains("reviewComment"));
        assert!(prompt.contains("empty array"));
    }

    #[test]
    fn prompt_forbids_praise_and_code_comments() {
        let prompt = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        assert!(prompt.contains("Never write compliments"));
        assert!(prompt.contains("Do NOT suggest adding comments"));
    }

    #[test]
    fn prompt_renders_lines_with_anchors() {
        let prompt = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        assert!(prompt.contains("@@ -3,3 +3,4 @@ fn validate()"));
        // Context and added lines use destination numbers.
        assert!(prompt.contains("3  let input = read();"));
        assert!(prompt.contains("4 +if input.is_empty() { return; }"));
        assert!(prompt.contains("5 +process(input);"));
        // Removed lines use origin numbers.
        assert!(prompt.contains("4 -process(input);"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        let b = build_review_prompt(Path::new("src/v.rs"), &sample_chunk(), &sample_pr());
        assert_eq!(a, b);
    }

    #[test]
    fn parse_valid_response() {
        let json = r#"{
            "reviews": [
                {"lineNumber": 4, "reviewComment": "early return hides the error"},
                {"lineNumber": "5", "reviewComment": "double call"}
            ]
        }"#;
        let findings = parse_review_response(json).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].review_comment, "early return hides the error");
        assert!(findings[1].line_number.is_string());
    }

    #[test]
    fn parse_empty_reviews() {
        let findings = parse_review_response(r#"{"reviews":[]}"#).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn parse_with_code_fences() {
        let fenced = "```json\n{\"reviews\":[]}\n```";
        let findings = parse_review_response(fenced).unwrap();
        assert!(findings.is_empty());

        let bare_fence = "```\n{\"reviews\":[]}\n```";
        assert!(parse_review_response(bare_fence).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(parse_review_response("this is not json at all").is_err());
    }

    #[test]
    fn parse_rejects_missing_reviews_key() {
        assert!(parse_review_response(r#"{"comments":[]}"#).is_err());
    }
}
