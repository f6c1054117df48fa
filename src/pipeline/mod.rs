//! Render pipeline: source in, diagram or located failure out.
//!
//! A render is split into three steps so the engine call can run off the
//! loop thread:
//!
//! 1. [`RenderPipeline::begin`] issues a ticket and an instance id.
//! 2. [`RenderJob::run`] does the slow work and touches no shared state.
//! 3. [`RenderPipeline::apply`] commits the result if its ticket is still the
//!    newest one; older results are dropped.

mod diagnostic;
mod hint;

pub use diagnostic::{Diagnostic, Severity, line_from_message, resolve_line};
pub use hint::HintKind;

use serde::Serialize;

use crate::editor::Editor;
use crate::engine::{DiagramEngine, EngineConfig, EngineError};
use crate::export::fonts::FontCache;
use crate::format::DiagramType;
use crate::i18n::Lang;
use crate::perf;
use crate::preview::{ErrorPanel, Preview, VectorScene};
use crate::state::{Look, RenderStyle};

/// Prefix of render instance ids.
pub const INSTANCE_PREFIX: &str = "mermaid-diagram-";

/// Ordering token for a render request. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Look that applies to `diagram` when `requested` is asked for.
///
/// Diagram types without hand-drawn support always render classic.
pub const fn look_for(diagram: DiagramType, requested: Look) -> Look {
    match diagram {
        DiagramType::Class
        | DiagramType::State
        | DiagramType::EntityRelationship
        | DiagramType::Gantt
        | DiagramType::Pie
        | DiagramType::Mindmap
        | DiagramType::Timeline
        | DiagramType::XyChart => Look::Classic,
        _ => requested,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub ticket: RenderTicket,
    pub id: String,
    pub source: String,
    pub style: RenderStyle,
}

/// Work handed to a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderJob {
    /// Whitespace-only source; nothing to render.
    Empty { ticket: RenderTicket },
    Render(RenderRequest),
}

/// A failed validate or render, located in the source where possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub hint: Option<HintKind>,
}

impl From<EngineError> for ParseFailure {
    fn from(err: EngineError) -> Self {
        Self {
            line: resolve_line(&err),
            column: err.column,
            hint: HintKind::classify(&err.message),
            message: err.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Empty,
    Success(VectorScene),
    ParseFailure(ParseFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub ticket: RenderTicket,
    pub outcome: RenderOutcome,
    /// Source the outcome was computed from; diagnostics are ranged over it.
    pub source: String,
    /// The hand-drawn look was requested but the diagram type forced classic.
    pub look_downgraded: bool,
}

impl RenderJob {
    pub const fn ticket(&self) -> RenderTicket {
        match self {
            Self::Empty { ticket } => *ticket,
            Self::Render(request) => request.ticket,
        }
    }

    /// Validate and render. Never panics on engine failure.
    pub fn run(&self, engine: &dyn DiagramEngine, fonts: Option<&FontCache>) -> RenderResult {
        let request = match self {
            Self::Empty { ticket } => {
                return RenderResult {
                    ticket: *ticket,
                    outcome: RenderOutcome::Empty,
                    source: String::new(),
                    look_downgraded: false,
                };
            }
            Self::Render(request) => request,
        };
        let _scope = perf::scope("pipeline.run");

        let diagram = DiagramType::detect(&request.source);
        let look = look_for(diagram, request.style.look);
        let look_downgraded = request.style.is_hand_drawn() && look == Look::Classic;

        if look == Look::HandDrawn
            && let Some(fonts) = fonts
        {
            // Best effort; export inlines whatever made it into the cache.
            fonts.preload(request.style.hand_font);
        }

        let config = EngineConfig::for_style(&request.style, look);
        let outcome = match engine
            .validate(&request.source)
            .and_then(|()| engine.render(&request.id, &request.source, &config))
        {
            Ok(svg) => RenderOutcome::Success(VectorScene::new(request.id.clone(), svg)),
            Err(err) => {
                tracing::debug!(id = %request.id, error = %err, "render failed");
                RenderOutcome::ParseFailure(err.into())
            }
        };
        perf::log_event(
            "pipeline.run",
            format!(
                "ticket={} id={} type={} look={look:?} ok={}",
                request.ticket.value(),
                request.id,
                diagram.label(),
                matches!(outcome, RenderOutcome::Success(_))
            ),
        );

        RenderResult {
            ticket: request.ticket,
            outcome,
            source: request.source.clone(),
            look_downgraded,
        }
    }
}

/// What [`RenderPipeline::apply`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Committed,
    /// A newer render was requested; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct RenderPipeline {
    next_ticket: u64,
    latest: Option<RenderTicket>,
    instances: u64,
    lang: Lang,
}

impl RenderPipeline {
    pub fn new(lang: Lang) -> Self {
        Self {
            lang,
            ..Self::default()
        }
    }

    pub const fn set_lang(&mut self, lang: Lang) {
        self.lang = lang;
    }

    pub const fn lang(&self) -> Lang {
        self.lang
    }

    pub const fn latest_ticket(&self) -> Option<RenderTicket> {
        self.latest
    }

    /// Start a render of `source`; any earlier job becomes stale.
    pub fn begin(&mut self, source: &str, style: &RenderStyle) -> RenderJob {
        self.next_ticket += 1;
        let ticket = RenderTicket(self.next_ticket);
        self.latest = Some(ticket);
        if source.trim().is_empty() {
            return RenderJob::Empty { ticket };
        }
        self.instances += 1;
        RenderJob::Render(RenderRequest {
            ticket,
            id: format!("{INSTANCE_PREFIX}{}", self.instances),
            source: source.to_string(),
            style: style.clone(),
        })
    }

    /// Commit `result` to the editor and preview if it is the newest render.
    pub fn apply(
        &mut self,
        result: RenderResult,
        editor: &mut dyn Editor,
        preview: &mut Preview,
        now_ms: u64,
    ) -> Applied {
        if self.latest != Some(result.ticket) {
            tracing::debug!(ticket = result.ticket.value(), "dropping stale render");
            perf::log_event("pipeline.stale", format!("ticket={}", result.ticket.value()));
            return Applied::Stale;
        }

        preview.set_look_warning(result.look_downgraded);
        match result.outcome {
            RenderOutcome::Empty => {
                editor.set_diagnostics(Vec::new());
                preview.show_placeholder();
            }
            RenderOutcome::Success(scene) => {
                editor.set_diagnostics(Vec::new());
                preview.show_scene(scene, now_ms);
            }
            RenderOutcome::ParseFailure(failure) => {
                let diagnostic =
                    Diagnostic::for_failure(&result.source, failure.line, failure.message.clone());
                editor.set_diagnostics(vec![diagnostic]);
                preview.show_error(ErrorPanel {
                    hint: failure.hint.map(|kind| kind.text(self.lang).to_string()),
                    line: failure.line,
                    message: failure.message,
                });
            }
        }
        perf::log_event("pipeline.commit", format!("ticket={}", result.ticket.value()));
        Applied::Committed
    }

    /// Render the editor's current text synchronously.
    pub fn render(
        &mut self,
        editor: &mut dyn Editor,
        preview: &mut Preview,
        style: &RenderStyle,
        engine: &dyn DiagramEngine,
        fonts: Option<&FontCache>,
        now_ms: u64,
    ) -> Applied {
        let job = self.begin(&editor.text(), style);
        preview.set_rendering();
        let result = job.run(engine, fonts);
        self.apply(result, editor, preview, now_ms)
    }
}

/// Move the editor to the line named by the error panel, if any.
pub fn jump_to_error(preview: &Preview, editor: &mut dyn Editor) -> bool {
    let Some(line) = preview.error().and_then(|panel| panel.line) else {
        return false;
    };
    editor.scroll_to_line(line);
    editor.focus();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::editor::EditorBuffer;
    use crate::export::{FetchError, FontFetcher};
    use crate::preview::{PreviewContent, RenderStatus};

    /// Engine that accepts anything with a header and echoes the config.
    struct EchoEngine;

    impl DiagramEngine for EchoEngine {
        fn validate(&self, source: &str) -> Result<(), EngineError> {
            if source.contains("-->\n") || source.trim_end().ends_with("-->") {
                return Err(EngineError::new(
                    "Parse error on line 2:\n...A -->\n-------^\nExpecting 'ALPHA', got 'EOF'",
                ));
            }
            Ok(())
        }

        fn render(
            &self,
            id: &str,
            _source: &str,
            config: &EngineConfig,
        ) -> Result<String, EngineError> {
            Ok(format!(
                "<svg id=\"{id}\" data-look=\"{:?}\" font-family=\"{}\"/>",
                config.look, config.font_family
            ))
        }
    }

    fn style() -> RenderStyle {
        RenderStyle::default()
    }

    #[test]
    fn test_tickets_and_ids_increase() {
        let mut pipeline = RenderPipeline::default();
        let first = pipeline.begin("graph TD\nA", &style());
        let second = pipeline.begin("graph TD\nB", &style());
        assert!(second.ticket() > first.ticket());
        let (RenderJob::Render(a), RenderJob::Render(b)) = (first, second) else {
            panic!("expected render jobs");
        };
        assert_eq!(a.id, "mermaid-diagram-1");
        assert_eq!(b.id, "mermaid-diagram-2");
    }

    #[test]
    fn test_empty_source_shows_placeholder() {
        let mut pipeline = RenderPipeline::default();
        let mut editor = EditorBuffer::from_text("  \n\t\n");
        let mut preview = Preview::default();
        let applied =
            pipeline.render(&mut editor, &mut preview, &style(), &EchoEngine, None, 0);
        assert_eq!(applied, Applied::Committed);
        assert_eq!(preview.content(), &PreviewContent::Placeholder);
        assert!(editor.diagnostics().is_empty());
        assert_eq!(preview.status(), RenderStatus::Idle);
    }

    #[test]
    fn test_late_result_is_discarded() {
        let mut pipeline = RenderPipeline::default();
        let mut editor = EditorBuffer::from_text("graph TD\nA --> B");
        let mut preview = Preview::default();

        let r1 = pipeline.begin("graph TD\nA --> B", &style());
        let r2 = pipeline.begin("graph TD\nA --> C", &style());
        let done2 = r2.run(&EchoEngine, None);
        let done1 = r1.run(&EchoEngine, None);

        assert_eq!(
            pipeline.apply(done2, &mut editor, &mut preview, 10),
            Applied::Committed
        );
        assert_eq!(
            pipeline.apply(done1, &mut editor, &mut preview, 20),
            Applied::Stale
        );
        assert_eq!(preview.scene().unwrap().id, "mermaid-diagram-2");
    }

    #[test]
    fn test_failure_marks_line_two() {
        let mut pipeline = RenderPipeline::new(Lang::En);
        let mut editor = EditorBuffer::from_text("graph TD\nA --> ");
        let mut preview = Preview::default();
        pipeline.render(&mut editor, &mut preview, &style(), &EchoEngine, None, 0);

        let panel = preview.error().unwrap();
        assert_eq!(panel.line, Some(2));
        assert!(panel.hint.is_some());
        let diags = editor.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
        assert_eq!(diags[0].range.start, 9);
        assert_eq!(preview.status(), RenderStatus::Error);
    }

    #[test]
    fn test_success_clears_diagnostics() {
        let mut pipeline = RenderPipeline::default();
        let mut editor = EditorBuffer::from_text("graph TD\nA --> ");
        let mut preview = Preview::default();
        pipeline.render(&mut editor, &mut preview, &style(), &EchoEngine, None, 0);
        assert!(!editor.diagnostics().is_empty());

        editor.set_text("graph TD\nA --> B");
        pipeline.render(&mut editor, &mut preview, &style(), &EchoEngine, None, 5);
        assert!(editor.diagnostics().is_empty());
        assert_eq!(preview.status(), RenderStatus::Ok { expires_at: 1505 });
    }

    struct UnreachableFonts(Arc<AtomicUsize>);

    impl FontFetcher for UnreachableFonts {
        fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Http {
                url: url.to_string(),
                message: "unreachable".into(),
            })
        }
    }

    #[test]
    fn test_hand_drawn_renders_fetch_missing_font_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fonts = FontCache::new(UnreachableFonts(Arc::clone(&calls)));
        let hand = RenderStyle {
            look: Look::HandDrawn,
            ..style()
        };
        let mut pipeline = RenderPipeline::default();
        for _ in 0..3 {
            let job = pipeline.begin("graph TD\nA --> B", &hand);
            let result = job.run(&EchoEngine, Some(&fonts));
            assert!(matches!(result.outcome, RenderOutcome::Success(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_type_after_front_matter_still_downgrades_look() {
        let mut pipeline = RenderPipeline::default();
        let source = "---\ntitle: Pets\n---\n%% counts\npie\n    \"Dogs\" : 3";
        let result = pipeline.begin(source, &style()).run(&EchoEngine, None);
        assert!(result.look_downgraded);
    }

    #[test]
    fn test_commented_source_renders_with_mermaid_engine() {
        let mut pipeline = RenderPipeline::default();
        let job = pipeline.begin("%% a comment\ngraph TD\nA --> B", &style());
        let result = job.run(&crate::engine::MermaidEngine, None);
        assert!(matches!(result.outcome, RenderOutcome::Success(_)));
    }

    #[test]
    fn test_denylisted_type_downgrades_look() {
        let mut pipeline = RenderPipeline::default();
        let job = pipeline.begin("pie title Pets\n    \"Dogs\" : 3", &style());
        let result = job.run(&EchoEngine, None);
        assert!(result.look_downgraded);
        let RenderOutcome::Success(scene) = result.outcome else {
            panic!("expected success");
        };
        assert!(scene.markup.contains("data-look=\"Classic\""));
    }

    #[test]
    fn test_flowchart_keeps_hand_drawn_look() {
        let mut pipeline = RenderPipeline::default();
        let result = pipeline.begin("graph TD\nA --> B", &style()).run(&EchoEngine, None);
        assert!(!result.look_downgraded);
        let RenderOutcome::Success(scene) = result.outcome else {
            panic!("expected success");
        };
        assert!(scene.markup.contains("data-look=\"HandDrawn\""));
        assert!(scene.markup.contains("Virgil"));
    }

    #[test]
    fn test_jump_to_error_moves_cursor() {
        let mut pipeline = RenderPipeline::default();
        let mut editor = EditorBuffer::from_text("graph TD\nA --> ");
        let mut preview = Preview::default();
        pipeline.render(&mut editor, &mut preview, &style(), &EchoEngine, None, 0);
        assert!(jump_to_error(&preview, &mut editor));
        assert_eq!(editor.cursor().line, 1);
        assert!(editor.is_focused());
    }

    #[test]
    fn test_look_for_denylist() {
        assert_eq!(look_for(DiagramType::Gantt, Look::HandDrawn), Look::Classic);
        assert_eq!(look_for(DiagramType::Sequence, Look::HandDrawn), Look::HandDrawn);
        assert_eq!(look_for(DiagramType::Flowchart, Look::Classic), Look::Classic);
    }
}
