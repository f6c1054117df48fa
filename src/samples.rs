//! Built-in diagrams: the default document and the example gallery.

use crate::i18n::Lang;

/// Source shown when nothing else is available at startup.
pub const DEFAULT_SOURCE: &str = "graph TD
    A[开始 Start] --> B{判断 Decision}
    B -->|是 Yes| C[成功 OK]
    B -->|否 No| D[失败 Fail]
    C --> E[结束 End]
    D --> E";

/// One gallery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Stable identifier used on the command line.
    pub name: &'static str,
    pub label: &'static str,
    pub label_zh: &'static str,
    pub source: &'static str,
}

impl Sample {
    pub const fn label_for(&self, lang: Lang) -> &'static str {
        match lang {
            Lang::En => self.label,
            Lang::Zh => self.label_zh,
        }
    }
}

pub const EXAMPLES: &[Sample] = &[
    Sample {
        name: "flowchart",
        label: "Flowchart",
        label_zh: "流程图",
        source: "graph TD\n    A[Start] --> B{Decision}\n    B -->|Yes| C[OK]\n    B -->|No| D[Fail]\n    C --> E[End]\n    D --> E",
    },
    Sample {
        name: "sequence",
        label: "Sequence",
        label_zh: "时序图",
        source: "sequenceDiagram\n    participant User\n    participant Server\n    User->>Server: Request\n    alt cached\n        Server-->>User: 304\n    else fresh\n        Server-->>User: 200\n    end",
    },
    Sample {
        name: "class",
        label: "Class",
        label_zh: "类图",
        source: "classDiagram\n    class Animal {\n        +String name\n        +makeSound()\n    }\n    class Dog {\n        +fetch()\n    }\n    Animal <|-- Dog",
    },
    Sample {
        name: "gantt",
        label: "Gantt",
        label_zh: "甘特图",
        source: "gantt\n    title Project Plan\n    dateFormat YYYY-MM-DD\n    section Phase 1\n    Design: 2024-01-01, 7d\n    Build: 2024-01-08, 14d\n    section Phase 2\n    Test: 2024-01-22, 7d",
    },
    Sample {
        name: "pie",
        label: "Pie",
        label_zh: "饼图",
        source: "pie title Share\n    \"A\" : 40\n    \"B\" : 30\n    \"C\" : 20\n    \"D\" : 10",
    },
    Sample {
        name: "mindmap",
        label: "Mindmap",
        label_zh: "思维导图",
        source: "mindmap\n  root((Core))\n    Branch one\n      Leaf 1\n      Leaf 2\n    Branch two\n      Leaf 3",
    },
    Sample {
        name: "er",
        label: "ER Diagram",
        label_zh: "ER 图",
        source: "erDiagram\n    USER ||--o{ ORDER : places\n    ORDER ||--|{ LINE-ITEM : contains\n    PRODUCT ||--o{ LINE-ITEM : includes",
    },
    Sample {
        name: "state",
        label: "State",
        label_zh: "状态图",
        source: "stateDiagram-v2\n    [*] --> Idle\n    Idle --> Running : start\n    Running --> Paused : pause\n    Paused --> Running : resume\n    Running --> [*] : stop",
    },
    Sample {
        name: "architecture",
        label: "Architecture",
        label_zh: "架构图",
        source: "graph LR\n    subgraph Frontend\n        A[Browser]\n    end\n    subgraph Backend\n        B[API]\n        C[Database]\n    end\n    A -->|HTTP| B\n    B -->|SQL| C",
    },
    Sample {
        name: "git",
        label: "Git Graph",
        label_zh: "Git 图",
        source: "gitGraph\n    commit\n    branch feature\n    checkout feature\n    commit\n    checkout main\n    merge feature",
    },
    Sample {
        name: "block",
        label: "Block",
        label_zh: "块图",
        source: "block-beta\n    columns 2\n    a[\"Ingest\"] b[\"Store\"]\n    c[\"Query\"] d[\"Serve\"]",
    },
];

/// Look up a gallery entry by its identifier (case-insensitive).
pub fn find(name: &str) -> Option<&'static Sample> {
    EXAMPLES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_source, DiagramType};

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find("GANTT").map(|s| s.name), Some("gantt"));
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_samples_are_already_formatted() {
        for sample in EXAMPLES {
            let formatted = format_source(sample.source);
            assert_eq!(formatted.trim_end(), sample.source, "sample {}", sample.name);
        }
    }

    #[test]
    fn test_default_source_is_a_flowchart() {
        assert_eq!(DiagramType::detect(DEFAULT_SOURCE), DiagramType::Flowchart);
    }

    #[test]
    fn test_labels_follow_language() {
        let sample = find("pie").unwrap();
        assert_eq!(sample.label_for(Lang::En), "Pie");
        assert_eq!(sample.label_for(Lang::Zh), "饼图");
    }
}
