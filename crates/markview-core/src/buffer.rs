//! Rope-backed text buffer with line/offset addressing.
//!
//! All public coordinates are **character offsets** (Unicode scalar values) and
//! 0-based line/column pairs. Ranges are half-open (`start..end`). Byte offsets
//! appear only at the edges where integrations (e.g. Tree-sitter) require them.

use crate::transaction::{Transaction, TransactionEdit};
use ropey::Rope;

/// A 0-based line/column position.
///
/// `column` counts characters from the line start, not visual cells; visual
/// projection (tabs, wide characters) is the viewport's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// 0-based line index.
    pub line: usize,
    /// 0-based character column within the line.
    pub column: usize,
}

impl Location {
    /// Create a new location.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Errors for position conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    /// The requested line does not exist in the document.
    LineOutOfRange {
        /// The requested 0-based line.
        line: usize,
        /// The document's line count.
        line_count: usize,
    },
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LineOutOfRange { line, line_count } => {
                write!(f, "line {line} out of range (document has {line_count} lines)")
            }
        }
    }
}

impl std::error::Error for PositionError {}

/// A text buffer addressed in character offsets, backed by a rope.
///
/// Mutation helpers return a [`Transaction`] describing the applied change so
/// that decoration sets, search state, and syntax trees can follow along.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    /// Create a buffer from initial text.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Document length in characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of lines in the document.
    ///
    /// An empty document has one (empty) line; a trailing newline opens a new
    /// final line, matching rope semantics.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Character offset of the start of `line`, or `None` past the last line.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        Some(self.rope.line_to_char(line))
    }

    /// Length of `line` in characters, excluding the line terminator.
    ///
    /// Returns 0 for out-of-range lines.
    pub fn line_len(&self, line: usize) -> usize {
        if line >= self.line_count() {
            return 0;
        }
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        // Strip "\n" or "\r\n".
        if len > 0 && slice.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && slice.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len
    }

    /// Text of `line` without its terminator, or `None` past the last line.
    pub fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.line_count() {
            return None;
        }
        let start = self.rope.line_to_char(line);
        let end = start + self.line_len(line);
        Some(self.rope.slice(start..end).to_string())
    }

    /// Width in characters of the leading whitespace of `line`.
    ///
    /// Returns 0 for out-of-range lines.
    pub fn leading_indentation(&self, line: usize) -> usize {
        let Some(text) = self.line_text(line) else {
            return 0;
        };
        text.chars().take_while(|ch| ch.is_whitespace()).count()
    }

    /// Convert a line/column pair to a character offset.
    ///
    /// The column is clamped to the line's length (excluding the terminator);
    /// a line past the end of the document is an error.
    pub fn offset_at(&self, line: usize, column: usize) -> Result<usize, PositionError> {
        let line_count = self.line_count();
        if line >= line_count {
            return Err(PositionError::LineOutOfRange { line, line_count });
        }
        let start = self.rope.line_to_char(line);
        Ok(start + column.min(self.line_len(line)))
    }

    /// Convert a character offset to a line/column pair.
    ///
    /// Exact for any offset in `[0, len_chars]`; larger offsets clamp to the
    /// end of the document.
    pub fn location_at(&self, offset: usize) -> Location {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let column = offset - self.rope.line_to_char(line);
        Location { line, column }
    }

    /// The character at `offset`, or `None` at/past the end.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset >= self.rope.len_chars() {
            return None;
        }
        Some(self.rope.char(offset))
    }

    /// Text of the half-open character range `start..end`, clamped to the document.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let start = start.min(len);
        let end = end.clamp(start, len);
        self.rope.slice(start..end).to_string()
    }

    /// Convert a character offset to a byte offset.
    pub fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset.min(self.rope.len_chars()))
    }

    /// Convert a byte offset to a character offset.
    pub fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset.min(self.rope.len_bytes()))
    }

    /// Iterate `(line_index, line_text)` over `from_line..to_line`, clamped to
    /// the document.
    pub fn iter_lines(
        &self,
        from_line: usize,
        to_line: usize,
    ) -> impl Iterator<Item = (usize, String)> + '_ {
        let last = to_line.min(self.line_count());
        (from_line.min(last)..last).map(move |line| {
            // Lines below `last` always exist.
            (line, self.line_text(line).unwrap_or_default())
        })
    }

    /// Replace the half-open character range `start..end` with `text`.
    ///
    /// Offsets are clamped to the document. Returns the applied [`Transaction`].
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Transaction {
        let len = self.rope.len_chars();
        let start = start.min(len);
        let end = end.clamp(start, len);

        let before_char_count = len;
        let deleted_text = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.rope.insert(start, text);

        Transaction {
            before_char_count,
            after_char_count: self.rope.len_chars(),
            edits: vec![TransactionEdit {
                start,
                deleted_text,
                inserted_text: text.to_string(),
            }],
        }
    }

    /// Insert `text` at `offset` (clamped to the document).
    pub fn insert(&mut self, offset: usize, text: &str) -> Transaction {
        self.replace(offset, offset, text)
    }

    /// Remove the half-open character range `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) -> Transaction {
        self.replace(start, end, "")
    }
}
