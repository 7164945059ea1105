use std::fmt;
use std::path::PathBuf;

use kestrel_core::{DiffChunk, DiffLine, LineKind};
use serde::Serialize;

/// A complete diff for a single file, containing one or more chunks.
///
/// `new_path` is `None` when the file was deleted (destination `/dev/null`),
/// which downstream filtering uses to drop the file from review.
///
/// # Examples
///
/// ```
/// use kestrel_diff::parser::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,3 +1,4 @@\n\
///              fn main() {\n\
///             +    println!(\"hello\");\n\
///              }\n";
/// let files = parse_unified_diff(diff);
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].chunks.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version; `None` if the file was deleted.
    pub new_path: Option<PathBuf>,
    /// Parsed chunks for this file.
    pub chunks: Vec<DiffChunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FileChange {
    fn empty() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: None,
            chunks: Vec::new(),
            is_new_file: false,
            is_rename: false,
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .new_path
            .as_deref()
            .unwrap_or(self.old_path.as_path());
        write!(f, "{} ({} chunks)", path.display(), self.chunks.len())
    }
}

/// Parse a unified diff string (as produced by `git diff`) into structured
/// [`FileChange`] entries.
///
/// Handles standard unified diff format including new files, deleted files,
/// renamed files, and binary files (which are skipped). Line numbers are
/// assigned from the hunk header: context lines advance both counters,
/// removals advance only the origin counter, additions only the destination
/// counter.
///
/// Malformed input never fails the parse: an unparseable hunk header drops
/// that hunk, and text that contains no recognizable diff structure yields
/// an empty vec.
///
/// # Examples
///
/// ```
/// use kestrel_diff::parser::parse_unified_diff;
///
/// assert!(parse_unified_diff("").is_empty());
/// assert!(parse_unified_diff("not a diff at all").is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Vec<FileChange> {
    let mut files: Vec<FileChange> = Vec::new();
    let mut current: Option<FileChange> = None;
    let mut current_chunk: Option<DiffChunk> = None;
    let mut is_binary = false;
    // Running line counters for the chunk being built.
    let mut old_ln: u32 = 0;
    let mut new_ln: u32 = 0;

    for line in input.lines() {
        if line.starts_with("diff --git ") {
            flush_chunk(&mut current, &mut current_chunk);
            if let Some(file) = current.take() {
                if !is_binary {
                    files.push(file);
                }
            }
            is_binary = false;
            current = Some(FileChange::empty());
            continue;
        }

        // Implicitly start a file if we see a header but have no current file.
        // This handles standard patches that lack the "diff --git" command line.
        if line.starts_with("--- ") && current.is_none() {
            current = Some(FileChange::empty());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            is_binary = true;
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.new_path = None;
            continue;
        }

        if let Some(path) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = parse_path(path).unwrap_or_default();
            continue;
        }

        if let Some(path) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = parse_path(path);
            continue;
        }

        if line.starts_with("index ") || line.starts_with("similarity index") {
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path).unwrap_or_default();
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            continue;
        }

        if line.starts_with("@@ ") {
            flush_chunk(&mut current, &mut current_chunk);
            match parse_hunk_header(line) {
                Some((old_start, old_lines, new_start, new_lines)) => {
                    old_ln = old_start;
                    new_ln = new_start;
                    current_chunk = Some(DiffChunk {
                        header: line.to_string(),
                        old_start,
                        old_lines,
                        new_start,
                        new_lines,
                        lines: Vec::new(),
                    });
                }
                // Unparseable header: drop the hunk and its body lines.
                None => current_chunk = None,
            }
            continue;
        }

        if line == "\\ No newline at end of file" {
            continue;
        }

        if let Some(chunk) = current_chunk.as_mut() {
            let entry = match line.as_bytes().first() {
                Some(b'+') => {
                    let entry = DiffLine {
                        kind: LineKind::Added,
                        old_line: None,
                        new_line: Some(new_ln),
                        content: line.to_string(),
                    };
                    new_ln += 1;
                    entry
                }
                Some(b'-') => {
                    let entry = DiffLine {
                        kind: LineKind::Removed,
                        old_line: Some(old_ln),
                        new_line: None,
                        content: line.to_string(),
                    };
                    old_ln += 1;
                    entry
                }
                Some(b' ') => {
                    let entry = DiffLine {
                        kind: LineKind::Context,
                        old_line: Some(old_ln),
                        new_line: Some(new_ln),
                        content: line.to_string(),
                    };
                    old_ln += 1;
                    new_ln += 1;
                    entry
                }
                _ => continue,
            };
            chunk.lines.push(entry);
        }
    }

    flush_chunk(&mut current, &mut current_chunk);
    if let Some(file) = current.take() {
        if !is_binary {
            files.push(file);
        }
    }

    files
}

fn flush_chunk(current: &mut Option<FileChange>, chunk: &mut Option<DiffChunk>) {
    if let Some(c) = chunk.take() {
        if let Some(file) = current.as_mut() {
            file.chunks.push(c);
        }
    }
}

fn parse_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return None;
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    Some(PathBuf::from(stripped))
}

fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let inner = line.strip_prefix("@@ ").and_then(|s| {
        let end = s.find(" @@")?;
        Some(&s[..end])
    })?;

    let (old, new) = inner.split_once(' ')?;
    let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;

    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = range.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((range.parse().ok()?, 1))
    }
}
