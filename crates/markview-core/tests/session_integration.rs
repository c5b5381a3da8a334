use markview_core::{
    AppliedScroll, LineContentMarker, LineSpec, RenderBatch, ScrollSnapshotCache, SearchOptions,
    SessionChangeType, SessionManager, TextBuffer, Viewport,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;

fn numbered(lines: usize) -> String {
    (0..lines).map(|i| format!("line {i}\n")).collect()
}

fn session_over(text: &str, top: usize, height: usize) -> SessionManager {
    let viewport = Viewport::anchored(&TextBuffer::new(text), top, height);
    SessionManager::new(text, viewport)
}

#[test]
fn test_document_swap_restores_committed_snapshot() {
    let doc_a = numbered(100);
    let doc_b = numbered(40);
    let mut session = session_over(&doc_a, 0, 10);
    session.set_document(&doc_a, Some("a.js"), None);

    // Scroll A to line 42 and let it settle.
    let t0 = Instant::now();
    session.note_scroll(42, t0);
    assert!(session.settle_scroll(t0 + ScrollSnapshotCache::DEFAULT_QUIET));

    // Swap to B: no snapshot, so the origin.
    assert_eq!(
        session.set_document(&doc_b, Some("b.js"), None),
        AppliedScroll::Origin
    );
    assert_eq!(session.viewport().start_line(session.buffer()), 0);

    // Swap back to A: the snapshot applies in the same transaction.
    let applied = session.set_document(&doc_a, Some("a.js"), None);
    match applied {
        AppliedScroll::Restored(snapshot) => assert_eq!(snapshot.top_line, 42),
        other => panic!("expected a restored snapshot, got {other:?}"),
    }
    assert_eq!(session.viewport().start_line(session.buffer()), 42);
}

#[test]
fn test_snapshot_for_one_document_never_applies_to_another() {
    let doc_a = numbered(100);
    let doc_c: String = (0..100).map(|i| format!("row {i}\n")).collect();
    let mut session = session_over(&doc_a, 0, 10);
    session.set_document(&doc_a, Some("a.js"), None);

    let t0 = Instant::now();
    session.note_scroll(70, t0);
    session.settle_scroll(t0 + ScrollSnapshotCache::DEFAULT_QUIET);

    // Same shape of content under a different id: origin, not line 70.
    assert_eq!(
        session.set_document(&doc_c, Some("c.js"), None),
        AppliedScroll::Origin
    );
}

#[test]
fn test_markers_persist_across_swap_and_reattach() {
    let short = numbered(3);
    let long = numbered(10);
    let mut session = session_over(&long, 0, 20);
    session.set_document(&long, Some("long.js"), None);
    session
        .add_line_marker(
            LineContentMarker::class("hl", "highlight-line", vec![LineSpec::at(5)]),
            None,
        )
        .unwrap();
    assert_eq!(session.engine().line_decorations().len(), 1);

    // Swap to a 3-line document: the marker is out of range, not gone.
    session.set_document(&short, Some("short.js"), None);
    assert!(session.engine().line_decorations().is_empty());

    // Swap back: the decoration reappears without re-registration.
    session.set_document(&long, Some("long.js"), None);
    assert_eq!(session.engine().line_decorations().len(), 1);
}

#[test]
fn test_search_survives_edits_with_selection_reset() {
    let mut session = session_over("foo bar foo baz foo", 0, 1);
    let count = session
        .search("foo", SearchOptions::default(), "cm-searching")
        .unwrap();
    assert_eq!(count, 3);

    let (first, loc) = session.next_match(false).unwrap();
    assert_eq!(first.start, 0);
    assert_eq!(loc.line, 0);

    // Editing recompiles the cursors and drops the selection.
    session.edit(0, 3, "qux", None);
    let state = session.search_state().unwrap();
    assert_eq!(state.len(), 2);
    assert_eq!(state.current_index(), None);

    // Reverse from unselected lands on the last match.
    let (last, _) = session.next_match(true).unwrap();
    assert_eq!(session.buffer().slice(last.start, last.end), "foo");
    assert_eq!(last.start, 16);
}

#[test]
fn test_clear_search_resets_overlay_but_not_cursors() {
    let mut session = session_over("x x x", 0, 1);
    session.search("x", SearchOptions::default(), "cm-searching").unwrap();
    session.next_match(false).unwrap();

    session.clear_search();
    let state = session.search_state().unwrap();
    assert_eq!(state.len(), 3);
    assert_eq!(state.current_index(), Some(0));

    // The render batch carries no overlay decorations after the clear.
    let RenderBatch::Ranges { items, .. } = session.render() else {
        panic!("expected a range batch");
    };
    assert!(items.is_empty());
}

#[test]
fn test_render_merges_overlay_with_marker_decorations() {
    let mut session = session_over("foo\nfoo\n", 0, 10);
    session
        .add_line_marker(
            LineContentMarker::class("hl", "highlight-line", vec![LineSpec::at(1)]),
            None,
        )
        .unwrap();
    session.search("foo", SearchOptions::default(), "cm-searching").unwrap();

    let RenderBatch::Ranges { items, .. } = session.render() else {
        panic!("expected a range batch");
    };
    // Two overlay matches plus one line class, in offset order.
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].range.start, 0);
    assert!(items.iter().any(|i| i.marker_id == "hl"));
}

#[test]
fn test_change_notifications_carry_kinds() {
    let seen = Arc::new(Mutex::new(Vec::<SessionChangeType>::new()));
    let seen_clone = Arc::clone(&seen);

    let mut session = session_over(&numbered(20), 0, 5);
    session.subscribe(move |change| {
        seen_clone.lock().unwrap().push(change.change_type);
    });

    session.set_document(&numbered(30), Some("a.js"), None);
    session.edit(0, 0, "x", None);
    session.set_viewport(Viewport::anchored(session.buffer(), 3, 5), None);
    session.search("line", SearchOptions::default(), "cm-searching").unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            SessionChangeType::DocumentSwapped,
            SessionChangeType::DocumentModified,
            SessionChangeType::ViewportChanged,
            SessionChangeType::SearchChanged,
        ]
    );
}

#[test]
fn test_jump_to_moves_viewport_only_when_needed() {
    let text = numbered(100);
    let mut session = session_over(&text, 0, 10);

    // Visible target: no viewport change.
    let before = *session.viewport();
    assert_eq!(session.jump_to("5", None).unwrap().line, 4);
    assert_eq!(*session.viewport(), before);

    // Far target: the viewport moves to reveal it.
    let target = session.jump_to("80:2", None).unwrap();
    assert_eq!(target.line, 79);
    assert_eq!(target.column, 2);
    let (start, end) = session.viewport().line_range(session.buffer());
    assert!(start <= 79 && 79 <= end);
}
