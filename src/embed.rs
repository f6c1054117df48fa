//! Read-only view of a shared diagram.

use crate::engine::DiagramEngine;
use crate::i18n::Lang;
use crate::pipeline::{RenderOutcome, RenderPipeline};
use crate::preview::VectorScene;
use crate::share::link::source_from_link;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedState {
    Rendered(VectorScene),
    /// Message to show in place of the diagram.
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedView;

impl EmbedView {
    /// Decode `token` (a bare token or a full link) and render it once.
    pub fn open(token: &str, engine: &dyn DiagramEngine, state: &AppState) -> EmbedState {
        let source = match source_from_link(token) {
            Ok(source) => source,
            Err(err) => {
                tracing::debug!(error = %err, "embed token did not decode");
                return EmbedState::Failed(state.lang.strings().failed_with(err));
            }
        };
        let mut pipeline = RenderPipeline::new(state.lang);
        let result = pipeline
            .begin(&source, &state.snapshot_style())
            .run(engine, None);
        match result.outcome {
            RenderOutcome::Success(scene) => EmbedState::Rendered(scene),
            RenderOutcome::Empty => EmbedState::Failed(state.lang.strings().no_diagram.to_string()),
            RenderOutcome::ParseFailure(failure) => EmbedState::Failed(failure.message),
        }
    }
}

impl EmbedState {
    /// Standalone page showing the diagram or the error, without any chrome.
    pub fn to_html(&self, lang: Lang) -> String {
        let body = match self {
            Self::Rendered(scene) => format!("<div id=\"diagram\">{}</div>", scene.markup),
            Self::Failed(message) => format!(
                "<div id=\"error\"><strong>{}</strong><pre>{}</pre></div>",
                lang.strings().error_syntax,
                escape_html(message)
            ),
        };
        format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Mermaid Diagram</title>\n<style>body{{margin:0;display:flex;\
             justify-content:center;align-items:center;min-height:100vh;background:#fff}}\
             #diagram svg{{max-width:100%;height:auto}}#error{{color:#b91c1c;font-family:\
             system-ui,sans-serif;padding:1rem}}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            lang.code()
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
