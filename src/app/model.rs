use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use url::Url;

use crate::editor::{Editor, EditorBuffer};
use crate::export::ExportFormat;
use crate::export::raster::DEFAULT_SCALE;
use crate::notice::{Notice, NoticeSlot};
use crate::pipeline::RenderPipeline;
use crate::preview::{Preview, PreviewContent};
use crate::share::link;
use crate::state::AppState;

/// The complete state of a live editing session.
///
/// All state lives here; the event loop owns the only copy.
pub struct Model {
    /// Source file being edited.
    pub file_path: PathBuf,
    pub state: AppState,
    pub editor: EditorBuffer,
    pub preview: Preview,
    pub pipeline: RenderPipeline,
    /// Page the share links point at.
    pub base_url: Url,
    /// File re-exported after every successful render.
    pub output: Option<PathBuf>,
    pub export_format: ExportFormat,
    pub scale: f32,
    /// Last clock value seen through [`super::Message::Tick`].
    pub now_ms: u64,
    pub should_quit: bool,
    notice: NoticeSlot,
    /// Full text after each editor change.
    edits: Receiver<String>,
    render_requested: bool,
    save_requested: bool,
}

impl Model {
    pub fn new(file_path: PathBuf, source: &str, state: AppState, base_url: Url) -> Self {
        let lang = state.lang;
        let mut preview = Preview::default();
        preview.background = state.background;
        let mut editor = EditorBuffer::from_text(source);
        let edits = editor.subscribe();
        Self {
            file_path,
            state,
            editor,
            preview,
            pipeline: RenderPipeline::new(lang),
            base_url,
            output: None,
            export_format: ExportFormat::Svg,
            scale: DEFAULT_SCALE,
            now_ms: 0,
            should_quit: false,
            notice: NoticeSlot::default(),
            edits,
            render_requested: true,
            save_requested: false,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Option<PathBuf>, format: ExportFormat) -> Self {
        self.output = output;
        self.export_format = format;
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn file_name(&self) -> &Path {
        self.file_path
            .file_name()
            .map_or(self.file_path.as_path(), Path::new)
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.notice.show(notice, self.now_ms);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.current()
    }

    pub(super) fn tick_notice(&mut self) -> bool {
        self.notice.tick(self.now_ms)
    }

    /// Ask the loop to schedule a (debounced) render.
    pub(super) const fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Request a render if the editor text changed since the last call.
    pub(super) fn drain_edits(&mut self) {
        if self.edits.try_iter().count() > 0 {
            self.request_render();
        }
    }

    /// Whether a render was requested since the last call.
    pub const fn take_render_request(&mut self) -> bool {
        std::mem::replace(&mut self.render_requested, false)
    }

    pub(super) const fn request_save(&mut self) {
        self.save_requested = true;
    }

    pub const fn take_save_request(&mut self) -> bool {
        std::mem::replace(&mut self.save_requested, false)
    }

    pub fn share_url(&self) -> Url {
        link::share_url(&self.base_url, &self.editor.text())
    }

    /// One-line summary of what the preview shows.
    pub fn status_line(&self) -> String {
        let lang = self.state.lang;
        let status = self.preview.status_text(lang);
        let content = match self.preview.content() {
            PreviewContent::Placeholder => lang.strings().placeholder.to_string(),
            PreviewContent::Diagram(scene) => format!(
                "{} @ {}%",
                scene.id,
                self.preview.viewport.zoom_percent()
            ),
            PreviewContent::Error(panel) => panel.title(lang),
        };
        let editor = self.editor.status_line(lang);
        if status.is_empty() {
            format!("{} | {content} | {editor}", self.file_name().display())
        } else {
            format!("{} | {status} {content} | {editor}", self.file_name().display())
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("state", &self.state)
            .field("editor", &self.editor)
            .field("now_ms", &self.now_ms)
            .finish_non_exhaustive()
    }
}
