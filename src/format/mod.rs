//! Mermaid source formatter.
//!
//! Reindents diagram source according to the grammar named on its header
//! line. Front matter and `%%` comments ahead of the header are left as they
//! are. Only leading whitespace, trailing whitespace and blank-line
//! runs are touched; the token sequence of the source is never changed, and
//! formatting an already formatted source is a no-op.
//!
//! ```
//! use mermaidpad::format::format_source;
//!
//! let formatted = format_source("graph TD\nsubgraph one\nA-->B\nend");
//! assert_eq!(formatted, "graph TD\n    subgraph one\n        A-->B\n    end\n");
//! ```

mod strategy;

pub use strategy::Strategy;

/// Indentation unit for one nesting level.
pub const INDENT: &str = "    ";

/// Diagram grammar, detected from the header line of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramType {
    Flowchart,
    Sequence,
    Class,
    State,
    EntityRelationship,
    Gantt,
    Pie,
    Mindmap,
    GitGraph,
    Architecture,
    Block,
    Timeline,
    XyChart,
    Generic,
}

impl DiagramType {
    /// Detect the diagram type from the header line of `source`.
    pub fn detect(source: &str) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        header_index(&lines).map_or(Self::Generic, |index| Self::from_header(lines[index]))
    }

    /// Classify a single header line (case-insensitive).
    pub fn from_header(header: &str) -> Self {
        let header = header.trim().to_ascii_lowercase();
        let h = header.as_str();
        if starts_with_word(h, "graph") || starts_with_word(h, "flowchart") {
            Self::Flowchart
        } else if starts_with_word(h, "sequencediagram") {
            Self::Sequence
        } else if starts_with_word(h, "classdiagram") {
            Self::Class
        } else if h.starts_with("statediagram") {
            Self::State
        } else if starts_with_word(h, "erdiagram") {
            Self::EntityRelationship
        } else if starts_with_word(h, "gantt") {
            Self::Gantt
        } else if starts_with_word(h, "pie") {
            Self::Pie
        } else if starts_with_word(h, "mindmap") {
            Self::Mindmap
        } else if starts_with_word(h, "gitgraph") {
            Self::GitGraph
        } else if h.starts_with("architecture") {
            Self::Architecture
        } else if starts_with_word(h, "block-beta") {
            Self::Block
        } else if starts_with_word(h, "timeline") {
            Self::Timeline
        } else if h.starts_with("xychart") {
            Self::XyChart
        } else {
            Self::Generic
        }
    }

    /// Human-readable name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::EntityRelationship => "entity-relationship",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::Mindmap => "mindmap",
            Self::GitGraph => "git-graph",
            Self::Architecture => "architecture",
            Self::Block => "block",
            Self::Timeline => "timeline",
            Self::XyChart => "xy-chart",
            Self::Generic => "generic",
        }
    }
}

/// Index of the diagram header in `lines`.
///
/// Blank lines, `%%` comments and directives, and a leading `---` front
/// matter block are skipped. `None` when nothing else is left.
pub fn header_index(lines: &[&str]) -> Option<usize> {
    let from = front_matter_end(lines).map_or(0, |end| end + 1);
    lines[from..]
        .iter()
        .position(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("%%")
        })
        .map(|offset| from + offset)
}

/// Index of the closing `---` when the first non-blank line opens front matter.
fn front_matter_end(lines: &[&str]) -> Option<usize> {
    let open = lines.iter().position(|line| !line.trim().is_empty())?;
    if lines[open].trim() != "---" {
        return None;
    }
    lines[open + 1..]
        .iter()
        .position(|line| line.trim() == "---")
        .map(|offset| open + 1 + offset)
}

/// `true` when `text` starts with `word` followed by a non-word character or
/// the end of the string.
fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Format Mermaid source.
///
/// Empty or whitespace-only input is returned unchanged. Any other input is
/// reindented with the strategy for its [`DiagramType`] and normalized: no
/// trailing whitespace, no runs of blank lines, exactly one final newline.
pub fn format_source(source: &str) -> String {
    if source.trim().is_empty() {
        return source.to_string();
    }

    let diagram = DiagramType::detect(source);
    let lines: Vec<&str> = source.lines().collect();
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(0);
    let header = header_index(&lines).unwrap_or(start);

    let mut reindented: Vec<String> = lines[start..header]
        .iter()
        .map(|line| (*line).to_string())
        .collect();
    reindented.extend(Strategy::for_diagram(diagram).reindent(&lines[header..]));
    tracing::debug!(
        diagram = diagram.label(),
        lines = reindented.len(),
        "formatted source"
    );
    finish(&reindented)
}

/// Trim trailing whitespace, collapse blank runs and terminate with a newline.
fn finish(lines: &[String]) -> String {
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim_end();
        if line.is_empty() && kept.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        kept.push(line);
    }
    while kept.last().is_some_and(|line| line.is_empty()) {
        kept.pop();
    }

    let mut out = kept.join("\n");
    out.push('\n');
    out
}
