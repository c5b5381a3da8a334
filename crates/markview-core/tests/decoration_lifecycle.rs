use markview_core::{
    BuildContext, DecorationEngine, DecorationKind, GutterMarker, LineContentMarker, LineSpec,
    PositionContentMarker, PositionSpec, TextBuffer, TokenResolver, TokenSpan, Viewport,
};
use std::sync::Arc;

/// Word-token resolver: every maximal `[A-Za-z0-9_]+` run is a token.
struct WordTokens {
    tokens: Vec<TokenSpan>,
}

impl WordTokens {
    fn from_buffer(buffer: &TextBuffer) -> Self {
        let mut tokens = Vec::new();
        let mut start: Option<usize> = None;
        for (i, ch) in buffer.text().chars().enumerate() {
            let word = ch == '_' || ch.is_alphanumeric();
            match (word, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    tokens.push(TokenSpan { from: s, to: i });
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            tokens.push(TokenSpan {
                from: s,
                to: buffer.len_chars(),
            });
        }
        Self { tokens }
    }
}

impl TokenResolver for WordTokens {
    fn token_at(&self, offset: usize) -> Option<TokenSpan> {
        self.tokens
            .iter()
            .copied()
            .find(|t| t.from <= offset && offset < t.to)
    }
}

#[test]
fn test_marker_scenario_short_then_long_document() {
    // A 3-line document with a marker on line 5: registration succeeds and
    // produces nothing.
    let buffer = TextBuffer::new("a\nb\nc");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    let mut engine = DecorationEngine::new();
    engine
        .add_line_marker(
            LineContentMarker::class("hl", "highlight-line", vec![LineSpec::at(5)]),
            &ctx,
        )
        .unwrap();
    assert!(engine.line_decorations().is_empty());

    // The same engine now sees a 10-line document: the decoration appears on
    // line 5 without re-registering anything.
    let buffer = TextBuffer::new("0\n1\n2\n3\n4\n5\n6\n7\n8\n9");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    engine.handle_viewport_change(&ctx);
    let items = engine.line_decorations().items();
    assert_eq!(items.len(), 1);
    assert_eq!(buffer.location_at(items[0].range.start).line, 5);
}

#[test]
fn test_marker_add_is_idempotent_and_scoped_to_viewport() {
    let buffer = TextBuffer::new("0\n1\n2\n3\n4\n5\n6\n7\n8\n9");
    let viewport = Viewport::anchored(&buffer, 2, 4); // lines 2..=5
    let ctx = BuildContext::new(&buffer, &viewport);
    let mut engine = DecorationEngine::new();

    let marker = LineContentMarker::class(
        "hl",
        "highlight-line",
        vec![LineSpec::at(0), LineSpec::at(3), LineSpec::at(9)],
    );
    engine.add_line_marker(marker.clone(), &ctx).unwrap();
    engine.add_line_marker(marker, &ctx).unwrap();

    let items = engine.line_decorations().items();
    assert_eq!(items.len(), 1);
    assert_eq!(buffer.location_at(items[0].range.start).line, 3);
}

#[test]
fn test_edit_remaps_decorations_then_rebuild_repins_lines() {
    let mut buffer = TextBuffer::new("alpha\nbeta\ngamma\n");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    let mut engine = DecorationEngine::new();

    // A span marker over "beta" survives unrelated edits by remapping.
    engine
        .add_position_marker(
            PositionContentMarker::class(
                "sel",
                "selected",
                vec![PositionSpec::Span { from: 6, to: 10 }],
            ),
            &ctx,
        )
        .unwrap();

    let tx = buffer.insert(0, "// header\n");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    engine.apply_transaction(&tx, &ctx);

    let items = engine.position_decorations().items();
    assert_eq!(items.len(), 1);
    assert_eq!(buffer.slice(items[0].range.start, items[0].range.end), "beta");
}

#[test]
fn test_token_class_extension_over_word_tokens() {
    let buffer = TextBuffer::new("  const value = total;\n");
    let viewport = Viewport::new(0, buffer.len_chars());
    let tokens = WordTokens::from_buffer(&buffer);
    let ctx = BuildContext::new(&buffer, &viewport).with_tokens(&tokens);
    let mut engine = DecorationEngine::new();

    // Column 0 clamps to the indentation (column 2), where "const" starts.
    engine
        .add_position_marker(
            PositionContentMarker::class(
                "expr",
                "debug-expression",
                vec![PositionSpec::Point {
                    line: 0,
                    column: 0,
                    data: None,
                }],
            ),
            &ctx,
        )
        .unwrap();

    let items = engine.position_decorations().items();
    assert_eq!(items.len(), 1);
    assert_eq!(buffer.slice(items[0].range.start, items[0].range.end), "const");
    assert!(matches!(
        &items[0].kind,
        DecorationKind::TokenClass { class } if class == "debug-expression"
    ));
}

#[test]
fn test_widget_identity_survives_edit_with_custom_equality() {
    let mut buffer = TextBuffer::new("line0\nline1\nline2\n");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    let mut engine = DecorationEngine::new();

    // Identity compares only the part of the payload before '#'.
    let eq = Arc::new(|a: &str, b: &str| {
        a.split('#').next() == b.split('#').next()
    });
    engine
        .add_position_marker(
            PositionContentMarker::widget(
                "logpoint",
                vec![PositionSpec::Point {
                    line: 1,
                    column: 0,
                    data: Some("msg#1".to_string()),
                }],
            )
            .with_data_eq(eq.clone()),
            &ctx,
        )
        .unwrap();
    let key_before = engine.position_decorations().items()[0].widget_key;

    // Re-adding with a payload equal under the custom comparison keeps the key.
    engine
        .add_position_marker(
            PositionContentMarker::widget(
                "logpoint",
                vec![PositionSpec::Point {
                    line: 1,
                    column: 0,
                    data: Some("msg#2".to_string()),
                }],
            )
            .with_data_eq(eq),
            &ctx,
        )
        .unwrap();
    let key_after = engine.position_decorations().items()[0].widget_key;
    assert_eq!(key_before, key_after);

    // An edit on another line leaves the widget in place with the same key.
    let tx = buffer.insert(0, "x");
    let viewport = Viewport::new(0, buffer.len_chars());
    let ctx = BuildContext::new(&buffer, &viewport);
    engine.apply_transaction(&tx, &ctx);
    assert_eq!(engine.position_decorations().items()[0].widget_key, key_after);
}

#[test]
fn test_gutter_pass_runs_against_every_effect() {
    let buffer = TextBuffer::new("0\n1\n2\n3\n4\n5");
    let viewport = Viewport::anchored(&buffer, 0, 3); // lines 0..=2
    let ctx = BuildContext::new(&buffer, &viewport);
    let mut engine = DecorationEngine::new();
    engine
        .add_gutter_marker(GutterMarker::new("bp", |line| Some(line.to_string())), &ctx)
        .unwrap();
    assert_eq!(engine.gutter_decorations().len(), 3);

    // Scrolling re-runs the pass against the new visible lines.
    let viewport = Viewport::anchored(&buffer, 4, 3); // lines 4..=5
    let ctx = BuildContext::new(&buffer, &viewport);
    engine.handle_viewport_change(&ctx);
    let lines: Vec<usize> = engine.gutter_decorations().iter().map(|g| g.line).collect();
    assert_eq!(lines, vec![4, 5]);
}
