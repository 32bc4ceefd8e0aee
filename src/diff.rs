//! Line-based unified diffs.
//!
//! Diffs are computed with the Myers algorithm from `similar` and rendered
//! as the body of a unified diff: `@@ -a,b +c,d @@` hunk headers followed by
//! lines prefixed with `+`, `-` or a space. No `---`/`+++` file headers are
//! emitted because the event topic already names the file. Lines are joined
//! with `\n` and the output has no trailing newline.
//!
//! A line that has no terminating newline is followed by
//! `\ No newline at end of file`, so two contents differing only in their
//! final newline still produce a non-empty diff.

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::error::ApplyError;

/// Marker emitted after a line that lacks a trailing newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Rendering options for [`unified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Unchanged lines shown around each change.
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

/// Renders the diff turning `old` into `new`.
///
/// Empty if and only if `old == new`.
///
/// # Examples
///
/// ```
/// use treewatch::diff::{unified, DiffOptions};
///
/// let d = unified("hi\n", "bye\n", &DiffOptions::default());
/// assert_eq!(d, "@@ -1 +1 @@\n-hi\n+bye");
/// ```
#[must_use]
pub fn unified(old: &str, new: &str, opts: &DiffOptions) -> String {
    if old == new {
        return String::new();
    }

    // Split on `\n` only, the same way `apply` does. `diff_lines` would also
    // break on a lone `\r`.
    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old_lines, &new_lines);

    let mut lines: Vec<String> = Vec::new();

    for group in diff.grouped_ops(opts.context_lines) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_end = last.old_range().end;
        let new_start = first.new_range().start;
        let new_end = last.new_range().end;

        lines.push(format!(
            "@@ -{} +{} @@",
            format_range(old_start, old_end),
            format_range(new_start, new_end)
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                let value = change.value();
                match value.strip_suffix('\n') {
                    Some(text) => lines.push(format!("{prefix}{text}")),
                    None => {
                        lines.push(format!("{prefix}{value}"));
                        lines.push(NO_NEWLINE_MARKER.to_string());
                    }
                }
            }
        }
    }

    lines.join("\n")
}

/// Hunk range in difflib's convention: 1-based start, count omitted when 1,
/// and an empty range anchored at the preceding line.
fn format_range(start: usize, end: usize) -> String {
    let len = end - start;
    match len {
        1 => format!("{}", start + 1),
        0 => format!("{start},0"),
        _ => format!("{},{len}", start + 1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastLine {
    Context,
    Removed,
    Added,
}

/// Applies a diff produced by [`unified`] to `old`, yielding the new content.
///
/// # Errors
///
/// Returns `ApplyError` if the diff is malformed or its hunks do not line up
/// with `old`.
pub fn apply(old: &str, diff: &str) -> Result<String, ApplyError> {
    if diff.is_empty() {
        return Ok(old.to_string());
    }

    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let mut out = String::with_capacity(old.len() + diff.len());
    let mut cursor = 0usize;
    let mut last: Option<LastLine> = None;

    for (idx, line) in diff.split('\n').enumerate() {
        let lineno = idx + 1;

        if let Some(header) = line.strip_prefix("@@ ") {
            let (start, len) = parse_old_range(header).ok_or_else(|| ApplyError::MalformedHeader {
                line: lineno,
                text: line.to_string(),
            })?;
            let hunk_start = if len == 0 { start } else { start.saturating_sub(1) };
            if hunk_start < cursor || hunk_start > old_lines.len() {
                return Err(ApplyError::ContextMismatch { line: lineno });
            }
            for orig in &old_lines[cursor..hunk_start] {
                out.push_str(orig);
            }
            cursor = hunk_start;
            last = None;
            continue;
        }

        if line == NO_NEWLINE_MARKER {
            if last == Some(LastLine::Added) && out.ends_with('\n') {
                out.pop();
            }
            continue;
        }

        let mut chars = line.chars();
        let tag = chars.next();
        let text = chars.as_str();
        match tag {
            Some(' ') => {
                let orig = expect_old_line(&old_lines, cursor, text, lineno)?;
                out.push_str(orig);
                cursor += 1;
                last = Some(LastLine::Context);
            }
            Some('-') => {
                expect_old_line(&old_lines, cursor, text, lineno)?;
                cursor += 1;
                last = Some(LastLine::Removed);
            }
            Some('+') => {
                out.push_str(text);
                out.push('\n');
                last = Some(LastLine::Added);
            }
            _ => {
                return Err(ApplyError::UnexpectedLine {
                    line: lineno,
                    text: line.to_string(),
                })
            }
        }
    }

    for orig in &old_lines[cursor..] {
        out.push_str(orig);
    }
    Ok(out)
}

fn expect_old_line<'a>(
    old_lines: &[&'a str],
    cursor: usize,
    text: &str,
    lineno: usize,
) -> Result<&'a str, ApplyError> {
    let orig = old_lines
        .get(cursor)
        .copied()
        .ok_or(ApplyError::ContextMismatch { line: lineno })?;
    if orig.strip_suffix('\n').unwrap_or(orig) != text {
        return Err(ApplyError::ContextMismatch { line: lineno });
    }
    Ok(orig)
}

/// Parses the `-a[,b]` half of a hunk header.
fn parse_old_range(header: &str) -> Option<(usize, usize)> {
    let old = header.split_whitespace().next()?.strip_prefix('-')?;
    match old.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((old.parse().ok()?, 1)),
    }
}
