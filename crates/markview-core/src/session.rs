//! Session façade: one document, one viewport, one decoration state.
//!
//! [`SessionManager`] wires the buffer, viewport, decoration engine, search
//! state, and scroll snapshot cache together behind a single-writer API, and
//! exposes version tracking plus change-notification callbacks so hosts can
//! re-render incrementally.
//!
//! Operations that rebuild decorations take an optional
//! [`TokenResolver`](crate::engine::TokenResolver): the syntax provider is
//! owned by the host and passed in by reference, keeping the core crate free
//! of any parser dependency.

use crate::buffer::{Location, TextBuffer};
use crate::decorations::DecorationSet;
use crate::engine::{BuildContext, DecorationEngine, TokenResolver};
use crate::markers::{GutterMarker, LineContentMarker, MarkerError, PositionContentMarker};
use crate::port::{DecorationPort, RangeSetPort, RenderBatch};
use crate::scroll::{ScrollSnapshot, ScrollSnapshotCache};
use crate::search::{HighlightOverlay, SearchError, SearchMatch, SearchOptions, SearchState};
use crate::transaction::{Assoc, Transaction};
use crate::viewport::Viewport;
use std::collections::HashMap;
use std::time::Instant;

/// Session change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChangeType {
    /// The document was swapped wholesale.
    DocumentSwapped,
    /// The document was edited in place.
    DocumentModified,
    /// Marker registrations changed.
    MarkersChanged,
    /// The viewport moved.
    ViewportChanged,
    /// Search state or the highlight overlay changed.
    SearchChanged,
}

/// Session change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChange {
    /// Change type.
    pub change_type: SessionChangeType,
    /// Version before the change.
    pub old_version: u64,
    /// Version after the change.
    pub new_version: u64,
}

/// Session change callback function type.
pub type SessionChangeCallback = Box<dyn FnMut(&SessionChange) + Send>;

/// How the viewport was positioned by a document swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedScroll {
    /// A committed snapshot for the incoming document id was applied.
    Restored(ScrollSnapshot),
    /// No snapshot existed; the view starts at the origin.
    Origin,
    /// The text was already loaded; nothing moved.
    Unchanged,
}

/// The session façade over one document.
pub struct SessionManager {
    buffer: TextBuffer,
    viewport: Viewport,
    engine: DecorationEngine,
    search: Option<SearchState>,
    overlay: HighlightOverlay,
    scroll: ScrollSnapshotCache,
    document_id: Option<String>,
    sources: HashMap<String, String>,
    version: u64,
    callbacks: Vec<SessionChangeCallback>,
    port: Box<dyn DecorationPort>,
}

impl SessionManager {
    /// Create a session over initial text with the given viewport, using the
    /// range-set decoration port.
    pub fn new(text: &str, viewport: Viewport) -> Self {
        Self {
            buffer: TextBuffer::new(text),
            viewport,
            engine: DecorationEngine::new(),
            search: None,
            overlay: HighlightOverlay::new(),
            scroll: ScrollSnapshotCache::new(),
            document_id: None,
            sources: HashMap::new(),
            version: 0,
            callbacks: Vec::new(),
            port: Box::new(RangeSetPort),
        }
    }

    /// Replace the decoration port.
    pub fn with_port(mut self, port: Box<dyn DecorationPort>) -> Self {
        self.port = port;
        self
    }

    /// The document buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// The current viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The decoration engine.
    pub fn engine(&self) -> &DecorationEngine {
        &self.engine
    }

    /// The active document id, if the loaded content has one.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Session state version, incremented by every notified change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Subscribe to session change notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if state has changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version > version
    }

    fn mark_changed(&mut self, change_type: SessionChangeType) {
        let old_version = self.version;
        self.version += 1;
        let change = SessionChange {
            change_type,
            old_version,
            new_version: self.version,
        };
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }

    /// Swap the document content, restoring a committed scroll snapshot for
    /// the incoming document id in the same step.
    ///
    /// - Identical text is a no-op (beyond adopting the new id).
    /// - `None` marks transient content (loading/error placeholders): no
    ///   snapshot is ever captured against it.
    /// - Markers persist; viewport and search state are derived fresh.
    pub fn set_document(
        &mut self,
        text: &str,
        document_id: Option<&str>,
        tokens: Option<&dyn TokenResolver>,
    ) -> AppliedScroll {
        // An in-flight scroll of the outgoing document commits now.
        self.scroll.flush();
        self.document_id = document_id.map(|s| s.to_string());

        if self.buffer.text() == text {
            return AppliedScroll::Unchanged;
        }

        let height = self.viewport.height_lines(&self.buffer);
        self.buffer = TextBuffer::new(text);
        self.search = None;
        self.overlay.clear();

        let snapshot = self
            .document_id
            .as_deref()
            .and_then(|id| self.scroll.get(id));
        let applied = match snapshot {
            Some(snapshot) => {
                self.viewport = Viewport::anchored(&self.buffer, snapshot.top_line, height);
                AppliedScroll::Restored(snapshot)
            }
            None => {
                self.viewport = Viewport::anchored(&self.buffer, 0, height);
                AppliedScroll::Origin
            }
        };

        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.handle_viewport_change(&ctx);
        self.mark_changed(SessionChangeType::DocumentSwapped);
        applied
    }

    /// Replace the half-open character range `start..end` with `text`.
    ///
    /// Decorations remap then rebuild; an active search recompiles against
    /// the new document with the selection reset.
    pub fn edit(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        tokens: Option<&dyn TokenResolver>,
    ) -> Transaction {
        let tx = self.buffer.replace(start, end, text);

        // The viewport tracks the text it was showing.
        self.viewport.from = tx.map_offset(self.viewport.from, Assoc::Before);
        self.viewport.to = tx.map_offset(self.viewport.to, Assoc::After);

        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.apply_transaction(&tx, &ctx);

        if let Some(previous) = self.search.take() {
            // Recompiling the same pattern cannot fail.
            self.search =
                SearchState::compile(&self.buffer, previous.query(), previous.options()).ok();
        }

        self.mark_changed(SessionChangeType::DocumentModified);
        tx
    }

    /// Move the viewport; decorations rebuild against the new visible range.
    pub fn set_viewport(&mut self, viewport: Viewport, tokens: Option<&dyn TokenResolver>) {
        self.viewport = viewport;
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.handle_viewport_change(&ctx);
        self.mark_changed(SessionChangeType::ViewportChanged);
    }

    // --- markers ---

    /// Register (or replace) a line-content marker.
    pub fn add_line_marker(
        &mut self,
        marker: LineContentMarker,
        tokens: Option<&dyn TokenResolver>,
    ) -> Result<(), MarkerError> {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.add_line_marker(marker, &ctx)?;
        self.mark_changed(SessionChangeType::MarkersChanged);
        Ok(())
    }

    /// Unregister a line-content marker.
    pub fn remove_line_marker(&mut self, id: &str, tokens: Option<&dyn TokenResolver>) {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.remove_line_marker(id, &ctx);
        self.mark_changed(SessionChangeType::MarkersChanged);
    }

    /// Register (or replace) a position-content marker.
    pub fn add_position_marker(
        &mut self,
        marker: PositionContentMarker,
        tokens: Option<&dyn TokenResolver>,
    ) -> Result<(), MarkerError> {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.add_position_marker(marker, &ctx)?;
        self.mark_changed(SessionChangeType::MarkersChanged);
        Ok(())
    }

    /// Unregister a position-content marker.
    pub fn remove_position_marker(&mut self, id: &str, tokens: Option<&dyn TokenResolver>) {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.remove_position_marker(id, &ctx);
        self.mark_changed(SessionChangeType::MarkersChanged);
    }

    /// Register (or replace) a gutter marker.
    pub fn add_gutter_marker(
        &mut self,
        marker: GutterMarker,
        tokens: Option<&dyn TokenResolver>,
    ) -> Result<(), MarkerError> {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.add_gutter_marker(marker, &ctx)?;
        self.mark_changed(SessionChangeType::MarkersChanged);
        Ok(())
    }

    /// Unregister a gutter marker.
    pub fn remove_gutter_marker(&mut self, id: &str, tokens: Option<&dyn TokenResolver>) {
        let ctx = build_ctx(&self.buffer, &self.viewport, tokens);
        self.engine.remove_gutter_marker(id, &ctx);
        self.mark_changed(SessionChangeType::MarkersChanged);
    }

    // --- search ---

    /// Compile a search and install its highlight overlay.
    ///
    /// Returns the match count. The selection starts unselected.
    pub fn search(
        &mut self,
        query: &str,
        options: SearchOptions,
        highlight_class: &str,
    ) -> Result<usize, SearchError> {
        let state = SearchState::compile(&self.buffer, query, options)?;
        let count = state.len();
        self.overlay.set(query, options, highlight_class);
        self.search = Some(state);
        self.mark_changed(SessionChangeType::SearchChanged);
        Ok(count)
    }

    /// The compiled search state, if any.
    pub fn search_state(&self) -> Option<&SearchState> {
        self.search.as_ref()
    }

    /// Advance the search selection and return the match with its location.
    pub fn next_match(&mut self, reverse: bool) -> Option<(SearchMatch, Location)> {
        let m = self.search.as_mut()?.next(reverse)?;
        let location = m.location(&self.buffer);
        self.mark_changed(SessionChangeType::SearchChanged);
        Some((m, location))
    }

    /// Clear the highlight overlay. Compiled cursors and the selection stay.
    pub fn clear_search(&mut self) {
        if self.overlay.clear() {
            self.mark_changed(SessionChangeType::SearchChanged);
        }
    }

    // --- scroll snapshots ---

    /// Note the current scroll position at time `now`.
    ///
    /// Ignored for transient content (no document id).
    pub fn note_scroll(&mut self, top_line: usize, now: Instant) {
        let Some(document_id) = self.document_id.clone() else {
            return;
        };
        let anchor_offset = self.buffer.offset_at(top_line, 0).unwrap_or(0);
        self.scroll.note_scroll(
            &document_id,
            ScrollSnapshot {
                top_line,
                anchor_offset,
            },
            now,
        );
    }

    /// Commit a pending scroll snapshot if its quiet window has elapsed.
    pub fn settle_scroll(&mut self, now: Instant) -> bool {
        self.scroll.settle(now)
    }

    /// The committed snapshot for a document id, if any.
    pub fn scroll_snapshot(&self, document_id: &str) -> Option<ScrollSnapshot> {
        self.scroll.get(document_id)
    }

    // --- source registry ---

    /// Register source text for out-of-band symbol queries against documents
    /// that are not currently loaded.
    pub fn add_source(&mut self, document_id: &str, text: &str) {
        self.sources
            .insert(document_id.to_string(), text.to_string());
    }

    /// Source text registered for `document_id`, if any.
    pub fn source(&self, document_id: &str) -> Option<&str> {
        self.sources.get(document_id).map(String::as_str)
    }

    /// Drop all registered sources.
    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    /// Number of registered sources.
    pub fn sources_count(&self) -> usize {
        self.sources.len()
    }

    // --- navigation & rendering ---

    /// Jump to a `line[:column]` navigation string (1-based line as typed).
    ///
    /// Moves the viewport if the target is not visible; returns the resolved
    /// 0-based location, or `None` for unparsable input.
    pub fn jump_to(&mut self, input: &str, tokens: Option<&dyn TokenResolver>) -> Option<Location> {
        let target = parse_jump_target(input)?;
        let line = target.line.min(self.buffer.line_count().saturating_sub(1));
        let target = Location::new(line, target.column.min(self.buffer.line_len(line)));

        if let Some(request) = self.viewport.scroll_into_view(&self.buffer, target) {
            let height = self.viewport.height_lines(&self.buffer);
            let mut viewport = Viewport::anchored(&self.buffer, request.top_line, height)
                .with_horizontal(self.viewport.left_column, self.viewport.width_columns)
                .with_tab_width(self.viewport.tab_width);
            if let Some(left) = request.left_column {
                viewport.left_column = left;
            }
            self.set_viewport(viewport, tokens);
        }
        Some(target)
    }

    /// Materialize the current decoration state through the session's port.
    pub fn render(&self) -> RenderBatch {
        let mut content = DecorationSet::new();
        content.insert_all(self.engine.line_decorations().items().to_vec());
        content.insert_all(self.engine.position_decorations().items().to_vec());
        content.insert_all(self.overlay.build(&self.buffer, &self.viewport));
        self.port
            .materialize(&self.buffer, &content, self.engine.gutter_decorations())
    }
}

fn build_ctx<'a>(
    buffer: &'a TextBuffer,
    viewport: &'a Viewport,
    tokens: Option<&'a dyn TokenResolver>,
) -> BuildContext<'a> {
    let ctx = BuildContext::new(buffer, viewport);
    match tokens {
        Some(tokens) => ctx.with_tokens(tokens),
        None => ctx,
    }
}

/// Parse a `line[:column]` navigation string.
///
/// The line is 1-based as typed by users; the result is 0-based. Trailing
/// garbage after the numeric prefix is ignored, mirroring lenient prompt
/// parsing. Returns `None` when the input does not start with a line number.
pub fn parse_jump_target(input: &str) -> Option<Location> {
    let digits: String = input.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let line: usize = digits.parse().ok()?;

    let rest = &input[digits.len()..];
    let column = if let Some(rest) = rest.strip_prefix(':') {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().unwrap_or(0)
    } else {
        0
    };

    Some(Location::new(line.saturating_sub(1), column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_jump_target() {
        assert_eq!(parse_jump_target("12"), Some(Location::new(11, 0)));
        assert_eq!(parse_jump_target("12:34"), Some(Location::new(11, 34)));
        assert_eq!(parse_jump_target("12:"), Some(Location::new(11, 0)));
        assert_eq!(parse_jump_target("7th line"), Some(Location::new(6, 0)));
        assert_eq!(parse_jump_target("go to 7"), None);
        assert_eq!(parse_jump_target(""), None);
    }

    #[test]
    fn test_set_document_same_text_is_noop() {
        let mut session = SessionManager::new("same", Viewport::new(0, 4));
        let before = session.version();
        let applied = session.set_document("same", Some("a.js"), None);
        assert_eq!(applied, AppliedScroll::Unchanged);
        assert_eq!(session.version(), before);
        assert_eq!(session.document_id(), Some("a.js"));
    }

    #[test]
    fn test_transient_content_never_captures_snapshots() {
        let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let mut session = SessionManager::new(&text, Viewport::anchored(&TextBuffer::new(&text), 0, 10));
        session.set_document(&text, None, None);

        let t0 = Instant::now();
        session.note_scroll(20, t0);
        assert!(!session.settle_scroll(t0 + ScrollSnapshotCache::DEFAULT_QUIET));
    }

    #[test]
    fn test_version_and_callbacks() {
        let mut session = SessionManager::new("a\nb", Viewport::new(0, 3));
        session.subscribe(|change| {
            assert_eq!(change.new_version, change.old_version + 1);
        });
        session.edit(0, 1, "z", None);
        assert_eq!(session.version(), 1);
        assert!(session.has_changed_since(0));
    }

    #[test]
    fn test_source_registry() {
        let mut session = SessionManager::new("", Viewport::new(0, 0));
        session.add_source("a.js", "function a() {}");
        session.add_source("b.js", "function b() {}");
        assert_eq!(session.sources_count(), 2);
        assert_eq!(session.source("a.js"), Some("function a() {}"));
        session.clear_sources();
        assert_eq!(session.sources_count(), 0);
    }
}
