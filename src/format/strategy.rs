//! Per-grammar reindentation strategies.

use std::sync::LazyLock;

use regex::Regex;

use super::{DiagramType, INDENT};

static SUBGRAPH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^subgraph\b").unwrap());
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^end$").unwrap());
static SEQUENCE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(loop|alt|opt|par|critical|break|rect)\b").unwrap()
});
static SEQUENCE_DIVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(else|and|option)\b").unwrap());
static STATE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^state\b.*\{").unwrap());

/// A reindentation strategy for one family of grammars.
///
/// Every strategy receives the source lines starting at the header line and
/// derives indentation from trimmed line content only, which is what makes
/// formatting idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `subgraph` … `end` nesting.
    Flowchart,
    /// `loop`/`alt`/`opt`/… … `end` nesting with `else` dividers.
    Sequence,
    /// Fixed two-level bodies inside `{ }`.
    Class,
    /// `state X {` … `}` nesting.
    State,
    /// One level for every line after the header.
    Sectioned,
    /// Indentation is meaningful; only trailing whitespace is trimmed.
    Preserve,
    /// One level for every line after the header.
    Generic,
}

impl Strategy {
    pub const fn for_diagram(diagram: DiagramType) -> Self {
        match diagram {
            DiagramType::Flowchart => Self::Flowchart,
            DiagramType::Sequence => Self::Sequence,
            DiagramType::Class => Self::Class,
            DiagramType::State => Self::State,
            DiagramType::EntityRelationship
            | DiagramType::Gantt
            | DiagramType::Pie
            | DiagramType::Timeline
            | DiagramType::XyChart => Self::Sectioned,
            DiagramType::Mindmap => Self::Preserve,
            DiagramType::GitGraph
            | DiagramType::Architecture
            | DiagramType::Block
            | DiagramType::Generic => Self::Generic,
        }
    }

    /// Reindent `lines`; the first line is the diagram header.
    pub fn reindent(self, lines: &[&str]) -> Vec<String> {
        match self {
            Self::Flowchart => nested(
                lines,
                |l| SUBGRAPH_OPEN.is_match(l),
                |l| BLOCK_END.is_match(l),
            ),
            Self::State => nested(lines, |l| STATE_OPEN.is_match(l), |l| l.starts_with('}')),
            Self::Sequence => sequence(lines),
            Self::Class => class(lines),
            Self::Sectioned | Self::Generic => flat(lines),
            Self::Preserve => lines
                .iter()
                .enumerate()
                .map(|(i, l)| if i == 0 { l.trim() } else { l.trim_end() }.to_string())
                .collect(),
        }
    }
}

fn indented(depth: usize, line: &str) -> String {
    format!("{}{line}", INDENT.repeat(depth))
}

/// Walk body lines with a depth counter starting at 1.
///
/// Closers decrement before the line is emitted (floored at 1), openers
/// increment after it.
fn nested(
    lines: &[&str],
    opens: impl Fn(&str) -> bool,
    closes: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut depth = 1usize;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if i == 0 {
            out.push(line.to_string());
            continue;
        }
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        if closes(line) {
            depth = depth.saturating_sub(1).max(1);
        }
        out.push(indented(depth, line));
        if opens(line) {
            depth += 1;
        }
    }
    out
}

fn sequence(lines: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut depth = 1usize;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if i == 0 {
            out.push(line.to_string());
            continue;
        }
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        if BLOCK_END.is_match(line) {
            depth = depth.saturating_sub(1).max(1);
        }
        if SEQUENCE_DIVIDER.is_match(line) {
            out.push(indented(depth.saturating_sub(1), line));
            continue;
        }
        out.push(indented(depth, line));
        if SEQUENCE_OPEN.is_match(line) {
            depth += 1;
        }
    }
    out
}

fn class(lines: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut in_body = false;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if i == 0 {
            out.push(line.to_string());
            continue;
        }
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        if line.ends_with('{') {
            out.push(indented(1, line));
            in_body = true;
        } else if line.starts_with('}') {
            out.push(indented(1, line));
            in_body = false;
        } else {
            out.push(indented(if in_body { 2 } else { 1 }, line));
        }
    }
    out
}

fn flat(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let line = raw.trim();
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                indented(1, line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        assert_eq!(Strategy::for_diagram(DiagramType::Pie), Strategy::Sectioned);
        assert_eq!(Strategy::for_diagram(DiagramType::Mindmap), Strategy::Preserve);
        assert_eq!(Strategy::for_diagram(DiagramType::GitGraph), Strategy::Generic);
        assert_eq!(Strategy::for_diagram(DiagramType::Flowchart), Strategy::Flowchart);
    }

    #[test]
    fn test_nested_sequence_blocks() {
        let lines = ["sequenceDiagram", "loop poll", "opt maybe", "A->>B: x", "end", "end"];
        assert_eq!(
            Strategy::Sequence.reindent(&lines),
            vec![
                "sequenceDiagram",
                "    loop poll",
                "        opt maybe",
                "            A->>B: x",
                "        end",
                "    end",
            ]
        );
    }

    #[test]
    fn test_par_and_divider() {
        let lines = ["sequenceDiagram", "par one", "A->>B: x", "and two", "A->>C: y", "end"];
        assert_eq!(
            Strategy::Sequence.reindent(&lines),
            vec![
                "sequenceDiagram",
                "    par one",
                "        A->>B: x",
                "    and two",
                "        A->>C: y",
                "    end",
            ]
        );
    }

    #[test]
    fn test_blank_lines_do_not_change_depth() {
        let lines = ["graph TD", "subgraph a", "", "A", "end"];
        assert_eq!(
            Strategy::Flowchart.reindent(&lines),
            vec!["graph TD", "    subgraph a", "", "        A", "    end"]
        );
    }

    #[test]
    fn test_end_is_matched_case_insensitively_but_whole_line_only() {
        let lines = ["graph TD", "subgraph a", "ending --> x", "END"];
        assert_eq!(
            Strategy::Flowchart.reindent(&lines),
            vec!["graph TD", "    subgraph a", "        ending --> x", "    END"]
        );
    }

    #[test]
    fn test_preserve_only_trims_trailing() {
        let lines = ["mindmap", "  root  ", "      deep\t"];
        assert_eq!(
            Strategy::Preserve.reindent(&lines),
            vec!["mindmap", "  root", "      deep"]
        );
    }
}
