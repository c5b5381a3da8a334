use markview_core::{Location, TextBuffer, TokenResolver, TokenSpan, Transaction};
use thiserror::Error;
use tree_sitter::{InputEdit, Language, Node, Parser, Point, Tree};

/// Errors produced by [`SyntaxProcessor`] and the symbol queries.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// Setting the Tree-sitter language failed.
    #[error("tree-sitter language error: {0}")]
    Language(String),
    /// Compiling a Tree-sitter query failed.
    #[error("tree-sitter query error: {0}")]
    Query(String),
    /// Internal text synchronization failed (the transaction did not match
    /// the tracked text).
    #[error("tree-sitter transaction mismatch")]
    DeltaMismatch,
}

/// How the processor updated its parse tree for the last `process()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// First parse for this processor instance.
    Initial,
    /// Updated by applying [`Transaction`] edits and re-parsing incrementally.
    Incremental,
    /// Fell back to re-syncing from full text and re-parsing.
    FullReparse,
}

/// An incremental Tree-sitter parser kept in sync with a
/// [`TextBuffer`](markview_core::TextBuffer).
///
/// The processor mirrors the document text and applies buffer
/// [`Transaction`]s as tree edits, re-parsing incrementally; any mismatch
/// falls back to a full re-sync. It implements the core crate's
/// [`TokenResolver`] seam so the decoration engine can extend class markers
/// over the token at their anchor.
pub struct SyntaxProcessor {
    language: Language,
    parser: Parser,
    tree: Option<Tree>,
    text: String,
    index: TextBuffer,
    last_update_mode: UpdateMode,
}

impl SyntaxProcessor {
    /// Create a processor for the given language.
    pub fn new(language: Language) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SyntaxError::Language(e.to_string()))?;

        Ok(Self {
            language,
            parser,
            tree: None,
            text: String::new(),
            index: TextBuffer::empty(),
            last_update_mode: UpdateMode::Initial,
        })
    }

    /// The configured language.
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// The current parse tree, if a parse has run.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// The mirrored document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines in the mirrored document.
    pub fn line_count(&self) -> usize {
        self.index.line_count()
    }

    /// Get the last update mode (useful for tests and instrumentation).
    pub fn last_update_mode(&self) -> UpdateMode {
        self.last_update_mode
    }

    /// Returns `true` once a parse tree exists.
    pub fn parse_available(&self) -> bool {
        self.tree.is_some()
    }

    /// Sync with the buffer and re-parse.
    ///
    /// With a transaction the update is incremental (tree edits + re-parse
    /// reusing the old tree); a mismatching transaction, or none, re-syncs
    /// from the full buffer text.
    pub fn process(&mut self, buffer: &TextBuffer, delta: Option<&Transaction>) -> UpdateMode {
        let mode = if self.tree.is_none() {
            self.sync_full(buffer);
            UpdateMode::Initial
        } else if let Some(delta) = delta {
            match self.apply_transaction_incremental(delta) {
                Ok(()) => {
                    self.tree = self.parser.parse(&self.text, self.tree.as_ref());
                    UpdateMode::Incremental
                }
                Err(_) => {
                    self.sync_full(buffer);
                    UpdateMode::FullReparse
                }
            }
        } else {
            self.sync_full(buffer);
            UpdateMode::FullReparse
        };

        self.last_update_mode = mode;
        mode
    }

    /// Ensure the parse covers `to_offset` of the given buffer.
    ///
    /// Tree-sitter parses the whole document eagerly, so covering any offset
    /// reduces to being in sync at all; a stale mirror triggers a full
    /// re-sync. Returns `true` when the tree covers the offset.
    pub fn force_parse(&mut self, buffer: &TextBuffer, to_offset: usize) -> bool {
        if self.tree.is_none() || self.index.len_chars() != buffer.len_chars() {
            self.process(buffer, None);
        }
        self.tree.is_some() && to_offset <= self.index.len_chars()
    }

    /// Parse standalone source text without touching the tracked document.
    ///
    /// Used for out-of-band queries against registered sources that are not
    /// currently loaded.
    pub fn parse_source(&self, source: &str) -> Result<Option<Tree>, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| SyntaxError::Language(e.to_string()))?;
        Ok(parser.parse(source, None))
    }

    /// Convert a character offset in the mirrored text to a byte offset.
    pub fn char_to_byte(&self, char_offset: usize) -> usize {
        self.index.char_to_byte(char_offset)
    }

    /// Convert a byte offset in the mirrored text to a character offset.
    pub fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.index.byte_to_char(byte_offset)
    }

    /// Line/column (character-based) of a byte offset in the mirrored text.
    pub fn location_of_byte(&self, byte_offset: usize) -> Location {
        self.index.location_at(self.byte_to_char(byte_offset))
    }

    /// Character offset of a location in the mirrored text, or `None` past
    /// the last line.
    pub fn offset_of(&self, location: Location) -> Option<usize> {
        self.index.offset_at(location.line, location.column).ok()
    }

    /// Byte range of a line's content in the mirrored text (terminator
    /// excluded), or `None` past the last line.
    pub fn line_byte_range(&self, line: usize) -> Option<(usize, usize)> {
        let start = self.index.line_start(line)?;
        let end = start + self.index.line_len(line);
        Some((self.index.char_to_byte(start), self.index.char_to_byte(end)))
    }

    /// The text of a node in the mirrored document.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        self.text.get(node.byte_range()).unwrap_or_default()
    }

    fn sync_full(&mut self, buffer: &TextBuffer) {
        self.text = buffer.text();
        self.index = buffer.clone();
        self.tree = self.parser.parse(&self.text, None);
    }

    fn point_for_char_offset(&self, char_offset: usize) -> Point {
        let location = self.index.location_at(char_offset);
        let line_start_byte = match self.index.line_start(location.line) {
            Some(start) => self.index.char_to_byte(start),
            None => 0,
        };
        Point {
            row: location.line,
            column: self.index.char_to_byte(char_offset) - line_start_byte,
        }
    }

    fn advance_point(mut point: Point, text: &str) -> Point {
        let mut parts = text.split('\n');
        let Some(first) = parts.next() else {
            return point;
        };

        point.column = point.column.saturating_add(first.len());
        for part in parts {
            point.row = point.row.saturating_add(1);
            point.column = part.len();
        }

        point
    }

    fn apply_transaction_incremental(&mut self, delta: &Transaction) -> Result<(), SyntaxError> {
        if self.index.len_chars() != delta.before_char_count {
            return Err(SyntaxError::DeltaMismatch);
        }
        if self.tree.is_none() {
            return Err(SyntaxError::DeltaMismatch);
        }

        for edit in &delta.edits {
            let start_char = edit.start;
            let deleted_chars = edit.deleted_text.chars().count();

            let start_byte = self.index.char_to_byte(start_char);
            let old_end_byte = start_byte.saturating_add(edit.deleted_text.len());
            let new_end_byte = start_byte.saturating_add(edit.inserted_text.len());

            let Some(old_slice) = self.text.get(start_byte..old_end_byte) else {
                return Err(SyntaxError::DeltaMismatch);
            };
            if old_slice != edit.deleted_text {
                return Err(SyntaxError::DeltaMismatch);
            }

            let start_position = self.point_for_char_offset(start_char);
            let old_end_position = Self::advance_point(start_position, &edit.deleted_text);
            let new_end_position = Self::advance_point(start_position, &edit.inserted_text);

            if let Some(tree) = self.tree.as_mut() {
                tree.edit(&InputEdit {
                    start_byte,
                    old_end_byte,
                    new_end_byte,
                    start_position,
                    old_end_position,
                    new_end_position,
                });
            }

            self.text
                .replace_range(start_byte..old_end_byte, &edit.inserted_text);
            self.index
                .replace(start_char, start_char + deleted_chars, &edit.inserted_text);
        }

        if self.index.len_chars() != delta.after_char_count {
            return Err(SyntaxError::DeltaMismatch);
        }

        Ok(())
    }
}

impl TokenResolver for SyntaxProcessor {
    /// Resolve the innermost node at a character offset.
    ///
    /// Anonymous nodes (punctuation) count: the decoration engine relies on
    /// seeing bracket tokens so it can skip them.
    fn token_at(&self, offset: usize) -> Option<TokenSpan> {
        let tree = self.tree.as_ref()?;
        let byte = self.char_to_byte(offset);
        // The smallest node spanning the offset, anonymous leaves included.
        let node = tree.root_node().descendant_for_byte_range(byte, byte)?;
        Some(TokenSpan {
            from: self.byte_to_char(node.start_byte()),
            to: self.byte_to_char(node.end_byte()),
        })
    }
}
