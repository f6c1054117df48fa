//! Mapping engine failures onto editor ranges.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use ropey::Rope;
use serde::Serialize;

use crate::engine::EngineError;

static LINE_IN_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)line\s+(\d+)").expect("valid line pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// An editor annotation produced by a failed render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Char offsets into the rendered source.
    pub range: Range<usize>,
    /// 1-based line the range sits on.
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Build the diagnostic for a failure in `source`.
    ///
    /// The range covers the whole of `line`, or the first line when no line
    /// is known. A line outside the document yields one character at offset 0.
    pub fn for_failure(source: &str, line: Option<usize>, message: impl Into<String>) -> Self {
        let rope = Rope::from_str(source);
        let (line, range) = match line {
            Some(n) if (1..=rope.len_lines()).contains(&n) => (n, line_range(&rope, n - 1)),
            Some(_) => (1, 0..1),
            None => (1, line_range(&rope, 0)),
        };
        Self {
            range,
            line,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Char range of a zero-based line without its line break; empty lines get
/// one character so the annotation stays visible.
fn line_range(rope: &Rope, idx: usize) -> Range<usize> {
    let start = rope.line_to_char(idx);
    let len = rope
        .line(idx)
        .chars()
        .take_while(|c| *c != '\n' && *c != '\r')
        .count();
    if len == 0 {
        start..start + 1
    } else {
        start..start + len
    }
}

/// First `line N` mentioned in an engine message.
pub fn line_from_message(message: &str) -> Option<usize> {
    LINE_IN_MESSAGE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Structured line if the engine gave one, otherwise a best-effort scan of
/// the message text.
pub fn resolve_line(err: &EngineError) -> Option<usize> {
    err.line.or_else(|| line_from_message(&err.message))
}
