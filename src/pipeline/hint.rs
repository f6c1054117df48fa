//! Guessing the likely cause of a parse failure from the engine message.

use serde::Serialize;

use crate::i18n::Lang;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintKind {
    UnknownDiagramType,
    IncompleteInput,
    UnterminatedToken,
    UnmatchedBlock,
    MissingDeclaration,
    MalformedConnector,
}

const RULES: &[(HintKind, &[&str])] = &[
    (
        HintKind::UnknownDiagramType,
        &[
            "no diagram type detected",
            "unknown diagram",
            "unsupported diagram",
            "no diagram definition",
        ],
    ),
    (
        HintKind::IncompleteInput,
        &["got 'eof'", "unexpected end", "unexpected eof", "end of input"],
    ),
    (
        HintKind::UnterminatedToken,
        &["unterminated", "unclosed", "missing closing", "lexical error"],
    ),
    (
        HintKind::UnmatchedBlock,
        &["unmatched", "expecting 'end'", "unbalanced", "missing end"],
    ),
    (
        HintKind::MissingDeclaration,
        &["not declared", "undeclared", "undefined", "unknown participant", "not defined"],
    ),
    (
        HintKind::MalformedConnector,
        &["arrow", "connector", "got 'link'", "invalid link", "edge"],
    ),
];

impl HintKind {
    /// Classify `message`; the first matching rule wins.
    pub fn classify(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|needle| lower.contains(needle)))
            .map(|(kind, _)| *kind)
    }

    pub const fn text(self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Self::UnknownDiagramType, Lang::En) => {
                "The first line must name a diagram type, e.g. `graph TD` or `sequenceDiagram`."
            }
            (Self::UnknownDiagramType, Lang::Zh) => {
                "第一行需要声明图表类型，例如 graph TD 或 sequenceDiagram"
            }
            (Self::IncompleteInput, Lang::En) => {
                "The diagram ends too early; a statement or connection is unfinished."
            }
            (Self::IncompleteInput, Lang::Zh) => "代码提前结束，可能有未写完的语句或连线",
            (Self::UnterminatedToken, Lang::En) => "A quote, bracket or label is not closed.",
            (Self::UnterminatedToken, Lang::Zh) => "有未闭合的引号、括号或标签",
            (Self::UnmatchedBlock, Lang::En) => {
                "A block is not balanced; check `subgraph`/`end` pairs and braces."
            }
            (Self::UnmatchedBlock, Lang::Zh) => "代码块不匹配，请检查 subgraph/end 或花括号",
            (Self::MissingDeclaration, Lang::En) => "Something is used before it is declared.",
            (Self::MissingDeclaration, Lang::Zh) => "存在未声明就使用的元素",
            (Self::MalformedConnector, Lang::En) => "An arrow or connector is written incorrectly.",
            (Self::MalformedConnector, Lang::Zh) => "箭头或连线写法有误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unknown_type() {
        assert_eq!(
            HintKind::classify("No diagram type detected matching given configuration for text: foo"),
            Some(HintKind::UnknownDiagramType)
        );
    }

    #[test]
    fn test_classify_incomplete_input() {
        let msg = "Parse error on line 2:\n...A -->\n------^\nExpecting 'AMP', 'ALPHA', got 'EOF'";
        assert_eq!(HintKind::classify(msg), Some(HintKind::IncompleteInput));
    }

    #[test]
    fn test_rule_order_breaks_ties() {
        // Mentions both an unclosed token and an arrow; the earlier rule wins.
        assert_eq!(
            HintKind::classify("unclosed label before arrow"),
            Some(HintKind::UnterminatedToken)
        );
    }

    #[test]
    fn test_other_kinds() {
        assert_eq!(
            HintKind::classify("Expecting 'end' but found subgraph"),
            Some(HintKind::UnmatchedBlock)
        );
        assert_eq!(
            HintKind::classify("Participant Bob is not declared"),
            Some(HintKind::MissingDeclaration)
        );
        assert_eq!(
            HintKind::classify("Expecting 'SEMI', got 'LINK'"),
            Some(HintKind::MalformedConnector)
        );
        assert_eq!(HintKind::classify("something odd"), None);
    }

    #[test]
    fn test_every_kind_has_text() {
        for (kind, _) in RULES {
            assert!(!kind.text(Lang::En).is_empty());
            assert!(!kind.text(Lang::Zh).is_empty());
        }
    }
}
