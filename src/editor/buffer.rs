use std::sync::mpsc::{self, Receiver, Sender};

use ropey::Rope;

use super::Editor;
use crate::format::format_source;
use crate::pipeline::Diagnostic;

/// Cursor position in the editor buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
}

/// Diagram source held in a rope.
///
/// Every change is broadcast to subscribers as the full new text; diagnostics
/// from the last committed render are kept until replaced.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    dirty: bool,
    diagnostics: Vec<Diagnostic>,
    focused: bool,
    /// First visible line, moved by [`Editor::scroll_to_line`].
    top_line: usize,
    subscribers: Vec<Sender<String>>,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            dirty: false,
            diagnostics: Vec::new(),
            focused: false,
            top_line: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Receive the full text after every change.
    pub fn subscribe(&mut self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Whether the text changed since the last save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    pub const fn top_line(&self) -> usize {
        self.top_line
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Length of a line in bytes, without its line break.
    fn line_len(&self, line_idx: usize) -> usize {
        if line_idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(line_idx).to_string();
        line.trim_end_matches(['\n', '\r']).len()
    }

    /// "N lines · M chars"; an empty buffer has zero lines.
    pub fn status_line(&self, lang: crate::i18n::Lang) -> String {
        let chars = self.rope.len_chars();
        let lines = if chars == 0 { 0 } else { self.line_count() };
        lang.strings().editor_status(lines, chars)
    }

    /// Move to a line and byte column, clamped to the buffer.
    fn move_to(&mut self, line: usize, col: usize) {
        let max_line = self.line_count().saturating_sub(1);
        self.cursor.line = line.min(max_line);
        self.cursor.col = col.min(self.line_len(self.cursor.line));
    }

    /// Reformat the whole buffer, keeping the cursor on the same line.
    ///
    /// Returns `true` if the text changed.
    pub fn format(&mut self) -> bool {
        let current = self.text();
        let formatted = format_source(&current);
        if formatted == current {
            return false;
        }
        let line = self.cursor.line;
        self.rope = Rope::from_str(&formatted);
        self.move_to(line, usize::MAX);
        self.changed();
        true
    }

    fn changed(&mut self) {
        self.dirty = true;
        let text = self.rope.to_string();
        self.subscribers
            .retain(|subscriber| subscriber.send(text.clone()).is_ok());
    }
}

impl Editor for EditorBuffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        let Cursor { line, col } = self.cursor;
        self.move_to(line, col);
        self.changed();
    }

    fn set_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.diagnostics = diagnostics;
    }

    fn scroll_to_line(&mut self, line: usize) {
        self.move_to(line.saturating_sub(1), 0);
        self.top_line = self.cursor.line;
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;
    use crate::pipeline::Severity;

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = EditorBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn test_set_text_notifies_subscribers() {
        let mut buf = EditorBuffer::from_text("graph TD");
        let rx = buf.subscribe();
        buf.set_text("graph TD\nA-->B");
        assert_eq!(rx.try_recv().unwrap(), "graph TD\nA-->B");
        assert!(buf.is_dirty());
        buf.mark_clean();
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut buf = EditorBuffer::empty();
        drop(buf.subscribe());
        buf.set_text("x");
        assert!(buf.subscribers.is_empty());
    }

    #[test]
    fn test_set_text_clamps_cursor() {
        let mut buf = EditorBuffer::from_text("a\nbbbb\nc");
        buf.scroll_to_line(3);
        assert_eq!(buf.cursor(), Cursor { line: 2, col: 0 });
        buf.set_text("only");
        assert_eq!(buf.cursor(), Cursor { line: 0, col: 0 });
    }

    #[test]
    fn test_format_rewrites_and_notifies() {
        let mut buf = EditorBuffer::from_text("graph TD\nA-->B");
        let rx = buf.subscribe();
        assert!(buf.format());
        assert_eq!(buf.text(), "graph TD\n    A-->B\n");
        assert_eq!(rx.try_recv().unwrap(), "graph TD\n    A-->B\n");
        assert!(!buf.format());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_format_keeps_cursor_line() {
        let mut buf = EditorBuffer::from_text("graph TD\nA-->B\nB-->C");
        buf.scroll_to_line(3);
        assert!(buf.format());
        assert_eq!(buf.cursor(), Cursor { line: 2, col: 9 });
    }

    #[test]
    fn test_scroll_to_line_is_one_based_and_clamped() {
        let mut buf = EditorBuffer::from_text("a\nb\nc");
        buf.scroll_to_line(2);
        assert_eq!(buf.cursor().line, 1);
        assert_eq!(buf.top_line(), 1);
        buf.scroll_to_line(99);
        assert_eq!(buf.cursor().line, 2);
        buf.scroll_to_line(0);
        assert_eq!(buf.cursor().line, 0);
    }

    #[test]
    fn test_status_line() {
        assert_eq!(EditorBuffer::empty().status_line(Lang::En), "0 lines · 0 chars");
        assert_eq!(
            EditorBuffer::from_text("a\nbc").status_line(Lang::En),
            "2 lines · 4 chars"
        );
    }

    #[test]
    fn test_diagnostics_are_replaced() {
        let mut buf = EditorBuffer::from_text("graph TD");
        buf.set_diagnostics(vec![Diagnostic {
            range: 0..8,
            line: 1,
            severity: Severity::Error,
            message: "bad".into(),
        }]);
        assert_eq!(buf.diagnostics().len(), 1);
        buf.set_diagnostics(Vec::new());
        assert!(buf.diagnostics().is_empty());
    }
}
