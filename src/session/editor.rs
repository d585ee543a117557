//! Host editor surface
//!
//! The session never owns the document. It reads snapshots and issues edits
//! through [`EditorSurface`]. [`BufferEditor`] is the in-memory surface the
//! CLI drives.

use thiserror::Error;

use super::merger::EditOperation;

/// Errors raised when an edit can't be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The document no longer matches what the edit was computed against
    #[error("document changed under the edit: {0}")]
    TornDocument(String),

    /// The cursor points outside the document
    #[error("cursor offset {offset} outside document of {len} characters")]
    CursorOutOfRange { offset: usize, len: usize },
}

/// What the session needs from the editor hosting the document
pub trait EditorSurface {
    /// Snapshot of the full document text
    fn document_text(&self) -> String;

    /// Characters between the cursor and the end of the text (0 = at end)
    fn cursor_offset_from_end(&self) -> usize;

    /// Apply an edit at the cursor
    fn apply_edit(&mut self, edit: &EditOperation) -> Result<(), EditError>;

    /// Return keyboard focus to the text
    fn focus(&mut self) {}

    fn cursor_at_end(&self) -> bool {
        self.cursor_offset_from_end() == 0
    }

    /// Document text up to the cursor
    fn text_before_cursor(&self) -> String {
        let text = self.document_text();
        let keep = text
            .chars()
            .count()
            .saturating_sub(self.cursor_offset_from_end());
        text.chars().take(keep).collect()
    }
}

/// Plain in-memory document with a cursor
#[derive(Debug, Clone, Default)]
pub struct BufferEditor {
    text: String,
    /// Cursor position counted in characters back from the end
    cursor_from_end: usize,
    focused: bool,
}

impl BufferEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing text, cursor at the end
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cursor_from_end: 0,
            focused: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Replace the whole document, cursor at the end
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor_from_end = 0;
    }

    /// Insert typed text at the cursor
    pub fn type_text(&mut self, typed: &str) {
        let at = self.cursor_byte_index();
        self.text.insert_str(at, typed);
    }

    /// Move the cursor left by `chars`, stopping at the start
    pub fn move_left(&mut self, chars: usize) {
        let len = self.text.chars().count();
        self.cursor_from_end = (self.cursor_from_end + chars).min(len);
    }

    pub fn move_to_end(&mut self) {
        self.cursor_from_end = 0;
    }

    fn cursor_byte_index(&self) -> usize {
        let len = self.text.chars().count();
        let chars_before = len.saturating_sub(self.cursor_from_end);
        self.text
            .char_indices()
            .nth(chars_before)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

impl EditorSurface for BufferEditor {
    fn document_text(&self) -> String {
        self.text.clone()
    }

    fn cursor_offset_from_end(&self) -> usize {
        self.cursor_from_end
    }

    fn apply_edit(&mut self, edit: &EditOperation) -> Result<(), EditError> {
        let len = self.text.chars().count();
        if self.cursor_from_end > len {
            return Err(EditError::CursorOutOfRange {
                offset: self.cursor_from_end,
                len,
            });
        }

        let mut at = self.cursor_byte_index();
        if edit.delete_preceding_space {
            if !self.text[..at].ends_with(' ') {
                return Err(EditError::TornDocument(
                    "expected a space before the cursor".to_string(),
                ));
            }
            at -= 1;
            self.text.remove(at);
        }
        self.text.insert_str(at, &edit.insert);
        Ok(())
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
