//! Document search: compilation, cyclic navigation, highlight overlay.
//!
//! Search runs over the whole document in **character offsets** and splits
//! into two independent pieces of state:
//!
//! - [`SearchState`]: the compiled cursor list plus the selected index,
//!   advanced by explicit [`next`](SearchState::next) calls
//! - [`HighlightOverlay`]: the match-class decoration source keyed by
//!   `(pattern, options, class)`, rebuilt per viewport and cleared
//!   independently of navigation

use crate::buffer::{Location, TextBuffer};
use crate::decorations::{Decoration, DecorationKind, DecorationRange};
use crate::viewport::Viewport;
use regex::{Regex, RegexBuilder};

/// Marker id used by overlay decorations.
pub const SEARCH_OVERLAY_MARKER_ID: &str = "search-overlay";

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (ASCII-alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match returned by the search APIs, expressed as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Line/column of the match start.
    pub fn location(&self, buffer: &TextBuffer) -> Location {
        buffer.location_at(self.start)
    }
}

/// Search errors.
#[derive(Debug)]
pub enum SearchError {
    /// The provided regex pattern failed to compile.
    InvalidRegex(regex::Error),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRegex(err) => write!(f, "Invalid regex: {}", err),
        }
    }
}

impl std::error::Error for SearchError {}

#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    pub(crate) fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn compile_search_regex(query: &str, options: SearchOptions) -> Result<Regex, SearchError> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()
        .map_err(SearchError::InvalidRegex)
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    if m.is_empty() {
        return false;
    }

    let before = if m.start == 0 {
        None
    } else {
        index.char_at(text, m.start.saturating_sub(1))
    };
    let after = index.char_at(text, m.end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Find all occurrences of `query` in `text`.
///
/// - Returns an empty list if `query` is empty.
/// - Match ranges are character offsets and are half-open (`[start, end)`).
pub fn find_all(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let re = compile_search_regex(query, options)?;
    let index = CharIndex::new(text);

    let mut matches: Vec<SearchMatch> = Vec::new();
    for m in re.find_iter(text) {
        let start = index.byte_to_char(m.start());
        let end = index.byte_to_char(m.end());
        let candidate = SearchMatch { start, end };

        if candidate.is_empty() {
            continue;
        }
        if options.whole_word && !is_whole_word(text, &index, candidate) {
            continue;
        }

        matches.push(candidate);
    }

    Ok(matches)
}

/// The compiled whole-document search state.
///
/// The cursor list is fixed at compile time; `current` is independent
/// application state advanced only by [`next`](Self::next). Compiling (or
/// recompiling after an edit) resets the selection.
#[derive(Debug)]
pub struct SearchState {
    query: String,
    options: SearchOptions,
    cursors: Vec<SearchMatch>,
    current: Option<usize>,
}

impl SearchState {
    /// Compile `query` against the whole document.
    pub fn compile(
        buffer: &TextBuffer,
        query: &str,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        let cursors = find_all(&buffer.text(), query, options)?;
        Ok(Self {
            query: query.to_string(),
            options,
            cursors,
            current: None,
        })
    }

    /// The compiled query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The compile options.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// All matches in document order.
    pub fn cursors(&self) -> &[SearchMatch] {
        &self.cursors
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Returns `true` if there are no matches.
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// The selected match index, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The selected match, if any.
    pub fn current(&self) -> Option<SearchMatch> {
        self.current.and_then(|i| self.cursors.get(i).copied())
    }

    /// Advance the selection and return the newly selected match.
    ///
    /// Rotation is cyclic in both directions. From the unselected state,
    /// forward selects the first match and reverse selects the last.
    pub fn next(&mut self, reverse: bool) -> Option<SearchMatch> {
        if self.cursors.is_empty() {
            return None;
        }
        let last = self.cursors.len() - 1;
        let index = match (self.current, reverse) {
            (None, false) => 0,
            (None, true) => last,
            (Some(i), false) => {
                if i >= last {
                    0
                } else {
                    i + 1
                }
            }
            (Some(i), true) => {
                if i == 0 {
                    last
                } else {
                    i - 1
                }
            }
        };
        self.current = Some(index);
        Some(self.cursors[index])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverlayKey {
    query: String,
    options: SearchOptions,
    class: String,
}

/// The search highlight decoration source.
///
/// Keyed by `(pattern, options, class)`: setting the same key again is a
/// no-op for consumers diffing by key. [`clear`](Self::clear) resets only the
/// overlay; compiled cursors and the selection are untouched.
#[derive(Debug, Default)]
pub struct HighlightOverlay {
    key: Option<OverlayKey>,
}

impl HighlightOverlay {
    /// Create an inactive overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a highlight key is installed.
    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }

    /// Install (or replace) the highlight key. Returns `true` if the key
    /// changed.
    pub fn set(&mut self, query: &str, options: SearchOptions, class: &str) -> bool {
        let key = OverlayKey {
            query: query.to_string(),
            options,
            class: class.to_string(),
        };
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        self.key = Some(key);
        true
    }

    /// Drop the highlight key. Returns `true` if one was installed.
    pub fn clear(&mut self) -> bool {
        self.key.take().is_some()
    }

    /// Build match-class decorations for the visible range.
    ///
    /// An invalid stored regex produces no decorations (the compile error
    /// already surfaced when the search was issued).
    pub fn build(&self, buffer: &TextBuffer, viewport: &Viewport) -> Vec<Decoration> {
        let Some(key) = self.key.as_ref() else {
            return Vec::new();
        };
        let Ok(matches) = find_all(&buffer.text(), &key.query, key.options) else {
            return Vec::new();
        };
        matches
            .into_iter()
            .filter(|m| m.start >= viewport.from && m.end <= viewport.to)
            .map(|m| Decoration {
                marker_id: SEARCH_OVERLAY_MARKER_ID.to_string(),
                range: DecorationRange::new(m.start, m.end),
                kind: DecorationKind::TokenClass {
                    class: key.class.clone(),
                },
                side: 0,
                widget_key: None,
            })
            .collect()
    }
}
