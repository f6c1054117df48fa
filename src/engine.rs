//! Diagram grammar engine.
//!
//! The pipeline only talks to [`DiagramEngine`]; [`MermaidEngine`] is the
//! adapter over `mermaid-rs-renderer` used by the binary.

use serde::Serialize;

use crate::format::{DiagramType, header_index};
use crate::state::{Look, RenderStyle, ThemeName};

/// Failure reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
    /// 1-based line, when the engine knows it.
    pub line: Option<usize>,
    /// 1-based column, when the engine knows it.
    pub column: Option<usize>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn at(mut self, line: usize, column: Option<usize>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }
}

/// Engine settings for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub theme: ThemeName,
    /// Effective look, after diagram-type compatibility was applied.
    pub look: Look,
    pub font_family: String,
    pub font_size_px: f32,
    pub seed: u32,
}

impl EngineConfig {
    /// Settings for `style` rendered with the `look` that actually applies.
    pub fn for_style(style: &RenderStyle, look: Look) -> Self {
        let style = RenderStyle {
            look,
            ..style.clone()
        };
        Self {
            theme: style.theme,
            look,
            font_family: style.font_family(),
            font_size_px: style.font_size_px(),
            seed: style.seed,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let style = RenderStyle::default();
        Self::for_style(&style, style.look)
    }
}

/// A grammar engine that validates and renders diagram source.
pub trait DiagramEngine: Send + Sync {
    /// Check that `source` is renderable without producing output.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] describing the first problem found.
    fn validate(&self, source: &str) -> Result<(), EngineError>;

    /// Render `source` to an SVG document whose root carries `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the source cannot be rendered.
    fn render(&self, id: &str, source: &str, config: &EngineConfig)
    -> Result<String, EngineError>;
}

/// Engine backed by `mermaid-rs-renderer`.
///
/// The hand-drawn look is expressed through the font stack and size; stroke
/// roughening is not supported by the renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct MermaidEngine;

impl DiagramEngine for MermaidEngine {
    fn validate(&self, source: &str) -> Result<(), EngineError> {
        let lines: Vec<&str> = source.lines().collect();
        let Some(index) = header_index(&lines) else {
            return Err(EngineError::new("No diagram definition found"));
        };
        let header = lines[index];
        if DiagramType::from_header(header) == DiagramType::Generic {
            return Err(EngineError::new(format!(
                "No diagram type detected matching given configuration for text: {}",
                header.trim()
            ))
            .at(index + 1, Some(1)));
        }
        Ok(())
    }

    fn render(
        &self,
        id: &str,
        source: &str,
        config: &EngineConfig,
    ) -> Result<String, EngineError> {
        let options = mermaid_rs_renderer::RenderOptions {
            theme: theme_for(config),
            layout: mermaid_rs_renderer::LayoutConfig::default(),
        };
        let svg = mermaid_rs_renderer::render_with_options(source, options)
            .map_err(|err| EngineError::new(err.to_string()))?;
        tracing::debug!(id, bytes = svg.len(), "engine produced svg");
        Ok(tag_root_id(&fix_font_family_quotes(&svg), id))
    }
}

struct Palette {
    primary: &'static str,
    primary_text: &'static str,
    border: &'static str,
    line: &'static str,
    secondary: &'static str,
    tertiary: &'static str,
    cluster: &'static str,
    cluster_border: &'static str,
    label_background: &'static str,
    background: &'static str,
    text: &'static str,
}

const fn palette(theme: ThemeName) -> Option<Palette> {
    match theme {
        ThemeName::Default => None,
        ThemeName::Dark => Some(Palette {
            primary: "#1f2020",
            primary_text: "#e0dfdf",
            border: "#81b1db",
            line: "#d3d3d3",
            secondary: "#3a3a3a",
            tertiary: "#2b2b2b",
            cluster: "#2a2a2a",
            cluster_border: "#6e6e6e",
            label_background: "#585858",
            background: "#333333",
            text: "#cccccc",
        }),
        ThemeName::Forest => Some(Palette {
            primary: "#cde498",
            primary_text: "#000000",
            border: "#13540c",
            line: "#008000",
            secondary: "#cdffb2",
            tertiary: "#ecf3e2",
            cluster: "#cdffb2",
            cluster_border: "#6eaa49",
            label_background: "#e8e8e8",
            background: "#ffffff",
            text: "#000000",
        }),
        ThemeName::Neutral => Some(Palette {
            primary: "#eeeeee",
            primary_text: "#333333",
            border: "#999999",
            line: "#666666",
            secondary: "#f4f4f4",
            tertiary: "#f8f8f8",
            cluster: "#fafafa",
            cluster_border: "#aaaaaa",
            label_background: "#ffffff",
            background: "#ffffff",
            text: "#333333",
        }),
        ThemeName::Base => Some(Palette {
            primary: "#fff4dd",
            primary_text: "#333333",
            border: "#9d8b5d",
            line: "#333333",
            secondary: "#fffde6",
            tertiary: "#fffbf0",
            cluster: "#fffde6",
            cluster_border: "#aaaa33",
            label_background: "#e8e8e8",
            background: "#ffffff",
            text: "#333333",
        }),
    }
}

fn theme_for(config: &EngineConfig) -> mermaid_rs_renderer::Theme {
    let mut theme = mermaid_rs_renderer::Theme::modern();
    if let Some(p) = palette(config.theme) {
        theme.primary_color = p.primary.to_string();
        theme.primary_text_color = p.primary_text.to_string();
        theme.primary_border_color = p.border.to_string();
        theme.line_color = p.line.to_string();
        theme.secondary_color = p.secondary.to_string();
        theme.tertiary_color = p.tertiary.to_string();
        theme.cluster_background = p.cluster.to_string();
        theme.cluster_border = p.cluster_border.to_string();
        theme.edge_label_background = p.label_background.to_string();
        theme.background = p.background.to_string();
        theme.text_color = p.text.to_string();
    }
    theme.font_family.clone_from(&config.font_family);
    theme.font_size = config.font_size_px.into();
    theme
}

/// Fix unescaped double quotes inside `font-family` attributes.
///
/// The renderer can emit `font-family="Inter, "Segoe UI", sans-serif"`,
/// which is not well-formed XML. Inner double quotes become single quotes.
pub fn fix_font_family_quotes(svg: &str) -> String {
    const MARKER: &str = "font-family=\"";
    let mut result = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(pos) = rest.find(MARKER) {
        result.push_str(&rest[..pos + MARKER.len()]);
        rest = &rest[pos + MARKER.len()..];

        // The closing quote is the first `"` followed by `>`, ` `, `/` or the end.
        let mut value = String::new();
        let mut end_offset = rest.len();
        let mut closed = false;
        for (i, ch) in rest.char_indices() {
            if ch == '"' {
                let after = rest.get(i + 1..i + 2).unwrap_or("");
                if after.is_empty() || after.starts_with(['>', ' ', '/']) {
                    result.push_str(&value);
                    result.push('"');
                    end_offset = i + 1;
                    closed = true;
                    break;
                }
                value.push('\'');
            } else {
                value.push(ch);
            }
        }
        if !closed {
            result.push_str(&value);
        }
        rest = &rest[end_offset..];
    }
    result.push_str(rest);
    result
}

/// Put `id` on the root `<svg>` element unless it already has one.
fn tag_root_id(svg: &str, id: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let tag_end = svg[start..].find('>').map_or(svg.len(), |end| start + end);
    if svg[start..tag_end].contains(" id=") {
        return svg.to_string();
    }
    let insert_at = start + "<svg".len();
    format!("{} id=\"{id}\"{}", &svg[..insert_at], &svg[insert_at..])
}
