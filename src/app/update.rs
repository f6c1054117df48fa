use std::path::PathBuf;

use kurbo::Vec2;

use crate::app::Model;
use crate::editor::Editor;
use crate::export::ExportFormat;
use crate::i18n::Lang;
use crate::notice::Notice;
use crate::pipeline::{self, RenderResult};
use crate::state::{FontSize, HandFont, PreviewBackground, SeedMode, ThemeName};

/// All possible events and actions in a live session.
///
/// These represent typed commands, file changes, clock ticks and results
/// coming back from render workers.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Source
    /// The source text changed (external edit or reload)
    SourceChanged(String),
    /// Start a render of the current source right away
    RenderNow,
    /// A render worker finished
    RenderFinished(Box<RenderResult>),
    /// Clock advanced to the given millisecond
    Tick(u64),
    /// Reindent the source and save it
    Format,

    // Style
    ToggleHandDrawn,
    SetTheme(ThemeName),
    SetHandFont(HandFont),
    SetFontSize(FontSize),
    SetSeedMode(SeedMode),
    SetBackground(PreviewBackground),
    /// Draw a new sketch seed and render again
    ReshuffleSeed,
    SetLang(Lang),

    // Viewport
    ZoomIn,
    ZoomOut,
    ZoomReset,
    /// Move the diagram by (dx, dy) screen pixels
    Pan(f64, f64),

    // Export and share
    /// Export the current diagram; no path means the clipboard
    Export(ExportFormat, Option<PathBuf>),
    CopyShareLink,
    CopyEmbed,
    CopyAiPrompt,

    // Error surface
    /// Move the editor to the line of the current error
    JumpToError,
    DismissError,

    /// Show a one-shot notice
    Notify(Notice),
    ShowHelp,
    Quit,
}

/// Apply `msg` to `model` and return the new state.
///
/// Work that touches the outside world (workers, clipboard, files) happens
/// in the event loop after this returns.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::SourceChanged(text) => {
            if text != model.editor.text() {
                model.editor.set_text(&text);
            }
        }
        Message::RenderNow => model.preview.set_rendering(),
        Message::RenderFinished(result) => {
            let now_ms = model.now_ms;
            model
                .pipeline
                .apply(*result, &mut model.editor, &mut model.preview, now_ms);
        }
        Message::Tick(now_ms) => {
            model.now_ms = now_ms;
            model.preview.tick(now_ms);
            model.tick_notice();
        }
        Message::Format => {
            if model.editor.format() {
                model.request_save();
            }
        }

        Message::ToggleHandDrawn => {
            model.state.toggle_hand_drawn();
            model.request_render();
        }
        Message::SetTheme(theme) => {
            model.state.theme = theme;
            model.request_render();
        }
        Message::SetHandFont(font) => {
            model.state.hand_font = font;
            model.request_render();
        }
        Message::SetFontSize(size) => {
            model.state.font_size = size;
            model.request_render();
        }
        Message::SetSeedMode(mode) => model.state.seed_mode = mode,
        Message::SetBackground(background) => {
            model.state.background = background;
            model.preview.background = background;
        }
        Message::ReshuffleSeed => {
            model.state.reshuffle_seed();
            model.request_render();
        }
        Message::SetLang(lang) => {
            model.state.lang = lang;
            model.pipeline.set_lang(lang);
            // Hints in the error panel are localized at commit time.
            model.request_render();
        }

        Message::ZoomIn => model.preview.viewport.zoom_in(),
        Message::ZoomOut => model.preview.viewport.zoom_out(),
        Message::ZoomReset => model.preview.viewport.reset(),
        Message::Pan(dx, dy) => model.preview.viewport.pan(Vec2::new(dx, dy)),

        Message::JumpToError => {
            if !pipeline::jump_to_error(&model.preview, &mut model.editor) {
                crate::perf::log_event("app.jump", "no error line");
            }
        }
        Message::DismissError => model.preview.dismiss_error(),

        Message::Notify(notice) => model.show_notice(notice),
        Message::Quit => model.should_quit = true,

        // Side effects only
        Message::Export(..)
        | Message::CopyShareLink
        | Message::CopyEmbed
        | Message::CopyAiPrompt
        | Message::ShowHelp => {}
    }
    model.drain_edits();
    model
}
