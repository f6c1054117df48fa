//! Preview surface: what the diagram pane currently shows.

pub mod viewport;

use std::sync::Arc;

use serde::Serialize;

use crate::i18n::Lang;
use crate::state::PreviewBackground;
pub use viewport::ViewportTransform;

/// How long the "OK" status stays visible after a successful render.
pub const OK_STATUS_MS: u64 = 1500;

/// A rendered diagram.
///
/// Cloning shares the markup, so exports can hold a snapshot while the
/// preview moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorScene {
    /// Render instance id, e.g. `mermaid-diagram-3`.
    pub id: String,
    /// SVG document.
    pub markup: Arc<str>,
}

impl VectorScene {
    pub fn new(id: impl Into<String>, markup: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            markup: markup.into(),
        }
    }
}

/// Error surface shown in place of the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPanel {
    /// Raw engine message.
    pub message: String,
    /// Localized hint for the likely cause.
    pub hint: Option<String>,
    /// 1-based line to jump to, when one could be extracted.
    pub line: Option<usize>,
}

impl ErrorPanel {
    /// Header text, e.g. "Syntax Error · Line 2".
    pub fn title(&self, lang: Lang) -> String {
        let strings = lang.strings();
        match self.line {
            Some(line) => format!("{} · {}", strings.error_syntax, strings.error_line(line)),
            None => strings.error_syntax.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewContent {
    Placeholder,
    Diagram(VectorScene),
    Error(ErrorPanel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderStatus {
    Idle,
    Rendering,
    Ok { expires_at: u64 },
    Error,
}

/// The diagram pane.
#[derive(Debug, Clone)]
pub struct Preview {
    content: PreviewContent,
    status: RenderStatus,
    pub viewport: ViewportTransform,
    pub background: PreviewBackground,
    look_warning: bool,
}

impl Default for Preview {
    fn default() -> Self {
        Self {
            content: PreviewContent::Placeholder,
            status: RenderStatus::Idle,
            viewport: ViewportTransform::default(),
            background: PreviewBackground::default(),
            look_warning: false,
        }
    }
}

impl Preview {
    pub const fn content(&self) -> &PreviewContent {
        &self.content
    }

    pub const fn status(&self) -> RenderStatus {
        self.status
    }

    /// The diagram on screen, if the last committed render succeeded.
    pub const fn scene(&self) -> Option<&VectorScene> {
        match &self.content {
            PreviewContent::Diagram(scene) => Some(scene),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&ErrorPanel> {
        match &self.content {
            PreviewContent::Error(panel) => Some(panel),
            _ => None,
        }
    }

    /// Whether the hand-drawn control should show as unsupported.
    pub const fn look_warning(&self) -> bool {
        self.look_warning
    }

    pub const fn set_look_warning(&mut self, unsupported: bool) {
        self.look_warning = unsupported;
    }

    pub const fn set_rendering(&mut self) {
        self.status = RenderStatus::Rendering;
    }

    pub fn show_placeholder(&mut self) {
        self.content = PreviewContent::Placeholder;
        self.status = RenderStatus::Idle;
    }

    pub fn show_scene(&mut self, scene: VectorScene, now_ms: u64) {
        self.content = PreviewContent::Diagram(scene);
        self.status = RenderStatus::Ok {
            expires_at: now_ms.saturating_add(OK_STATUS_MS),
        };
    }

    pub fn show_error(&mut self, panel: ErrorPanel) {
        self.content = PreviewContent::Error(panel);
        self.status = RenderStatus::Error;
    }

    /// Close the error panel; the status keeps reporting the failure.
    pub fn dismiss_error(&mut self) {
        if matches!(self.content, PreviewContent::Error(_)) {
            self.content = PreviewContent::Placeholder;
        }
    }

    /// Expire the "OK" status. Returns `true` when something changed.
    pub const fn tick(&mut self, now_ms: u64) -> bool {
        if let RenderStatus::Ok { expires_at } = self.status
            && now_ms >= expires_at
        {
            self.status = RenderStatus::Idle;
            return true;
        }
        false
    }

    /// Status line text; empty while idle.
    pub const fn status_text(&self, lang: Lang) -> &'static str {
        let strings = lang.strings();
        match self.status {
            RenderStatus::Idle => "",
            RenderStatus::Rendering => strings.rendering,
            RenderStatus::Ok { .. } => strings.render_ok,
            RenderStatus::Error => strings.render_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_status_expires() {
        let mut preview = Preview::default();
        preview.show_scene(VectorScene::new("mermaid-diagram-1", "<svg/>"), 100);
        assert_eq!(preview.status_text(Lang::En), "✓ OK");
        assert!(!preview.tick(100 + OK_STATUS_MS - 1));
        assert!(preview.tick(100 + OK_STATUS_MS));
        assert_eq!(preview.status(), RenderStatus::Idle);
        assert!(preview.scene().is_some());
    }

    #[test]
    fn test_error_panel_title() {
        let panel = ErrorPanel {
            message: "Parse error on line 2".into(),
            hint: None,
            line: Some(2),
        };
        assert_eq!(panel.title(Lang::En), "Syntax Error · Line 2");
        assert_eq!(panel.title(Lang::Zh), "语法错误 · 第 2 行");
    }

    #[test]
    fn test_dismiss_error_keeps_status() {
        let mut preview = Preview::default();
        preview.show_error(ErrorPanel {
            message: "boom".into(),
            hint: None,
            line: None,
        });
        preview.dismiss_error();
        assert_eq!(preview.content(), &PreviewContent::Placeholder);
        assert_eq!(preview.status(), RenderStatus::Error);
    }

    #[test]
    fn test_scene_snapshot_shares_markup() {
        let scene = VectorScene::new("mermaid-diagram-1", "<svg/>");
        let snapshot = scene.clone();
        assert!(Arc::ptr_eq(&scene.markup, &snapshot.markup));
    }
}
