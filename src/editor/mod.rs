//! Source editor collaborator.
//!
//! The pipeline reads and annotates the source only through [`Editor`];
//! [`EditorBuffer`] is the rope-backed implementation used by the watch loop.

mod buffer;

pub use buffer::{Cursor, EditorBuffer};

use crate::pipeline::Diagnostic;

pub trait Editor {
    /// Current full text. Never cached by callers across an edit.
    fn text(&self) -> String;

    /// Replace the whole text; subscribers are notified.
    fn set_text(&mut self, text: &str);

    /// Replace the diagnostics shown in the editor.
    fn set_diagnostics(&mut self, diagnostics: Vec<Diagnostic>);

    /// Bring a 1-based line into view and put the cursor on it.
    fn scroll_to_line(&mut self, line: usize);

    fn focus(&mut self);
}
