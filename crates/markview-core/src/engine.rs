//! The decoration engine: markers in, decorations out.
//!
//! State changes arrive as [`DecorationEffect`]s (a tagged effect log) and are
//! folded by a reducer into the engine's decoration sets:
//!
//! - marker add/remove rebuilds only that marker's decorations
//! - a document edit remaps every decoration through the transaction, then
//!   rebuilds against the (possibly shifted) viewport
//! - a viewport move rebuilds everything against the new visible range
//!
//! The build rules themselves are pure functions of `(marker, context)` and
//! are unit-tested in isolation. Widget decorations carry stable keys that
//! survive rebuilds when the old and new widgets compare equal, so hosts can
//! reuse widget instances instead of recreating them.

use crate::buffer::TextBuffer;
use crate::decorations::{
    Decoration, DecorationKind, DecorationRange, DecorationSet, GutterDecoration,
};
use crate::markers::{
    GutterMarker, LineContentMarker, LineRender, MarkerError, PositionContentMarker,
    PositionRender, PositionSpec, validate_id,
};
use crate::transaction::Transaction;
use crate::viewport::Viewport;

/// A syntax token span in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    /// Inclusive start character offset.
    pub from: usize,
    /// Exclusive end character offset.
    pub to: usize,
}

/// Resolves the innermost syntax token at a character offset.
///
/// Implemented by the syntax provider crate; the engine uses it to extend
/// class-rendered point markers over the token under their anchor. `None`
/// means "not resolvable yet" and the position is skipped for this build.
pub trait TokenResolver {
    /// The innermost token containing `offset`, if the syntax tree covers it.
    fn token_at(&self, offset: usize) -> Option<TokenSpan>;
}

/// Everything a decoration build reads: the buffer, the current viewport, and
/// an optional token resolver.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// The document.
    pub buffer: &'a TextBuffer,
    /// The current rendered range.
    pub viewport: &'a Viewport,
    /// Optional syntax token lookup for class-rendered point markers.
    pub tokens: Option<&'a dyn TokenResolver>,
}

impl<'a> BuildContext<'a> {
    /// A context without token resolution.
    pub fn new(buffer: &'a TextBuffer, viewport: &'a Viewport) -> Self {
        Self {
            buffer,
            viewport,
            tokens: None,
        }
    }

    /// Attach a token resolver.
    pub fn with_tokens(mut self, tokens: &'a dyn TokenResolver) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

/// A state change folded into the engine by [`DecorationEngine::apply`].
#[derive(Debug, Clone)]
pub enum DecorationEffect {
    /// Register (or replace) a line-content marker.
    AddLineMarker(LineContentMarker),
    /// Unregister a line-content marker.
    RemoveLineMarker(String),
    /// Register (or replace) a position-content marker.
    AddPositionMarker(PositionContentMarker),
    /// Unregister a position-content marker.
    RemovePositionMarker(String),
    /// Register (or replace) a gutter marker.
    AddGutterMarker(GutterMarker),
    /// Unregister a gutter marker.
    RemoveGutterMarker(String),
    /// The document changed; remap then rebuild.
    DocumentEdited(Transaction),
    /// The viewport changed with the document untouched; rebuild.
    ViewportMoved,
}

struct Registered<M> {
    seq: u64,
    marker: M,
}

/// Derives decorations from registered markers and keeps them consistent
/// across edits and scrolling.
pub struct DecorationEngine {
    line_markers: Vec<Registered<LineContentMarker>>,
    position_markers: Vec<Registered<PositionContentMarker>>,
    gutter_markers: Vec<Registered<GutterMarker>>,
    next_seq: u64,
    next_widget_key: u64,
    line_set: DecorationSet,
    position_set: DecorationSet,
    gutter: Vec<GutterDecoration>,
    version: u64,
}

impl Default for DecorationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self {
            line_markers: Vec::new(),
            position_markers: Vec::new(),
            gutter_markers: Vec::new(),
            next_seq: 0,
            next_widget_key: 0,
            line_set: DecorationSet::new(),
            position_set: DecorationSet::new(),
            gutter: Vec::new(),
            version: 0,
        }
    }

    /// Line-content decorations in render order.
    pub fn line_decorations(&self) -> &DecorationSet {
        &self.line_set
    }

    /// Position-content decorations in render order.
    pub fn position_decorations(&self) -> &DecorationSet {
        &self.position_set
    }

    /// Gutter elements for the current viewport, in line order.
    pub fn gutter_decorations(&self) -> &[GutterDecoration] {
        &self.gutter
    }

    /// Decoration state version, incremented by every applied effect.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Fold one effect into the decoration state.
    ///
    /// Returns `Err` only for caller contract violations (empty marker ids);
    /// removals of unknown ids are no-ops.
    pub fn apply(
        &mut self,
        effect: DecorationEffect,
        ctx: &BuildContext<'_>,
    ) -> Result<(), MarkerError> {
        match effect {
            DecorationEffect::AddLineMarker(marker) => {
                validate_id(&marker.id)?;
                let id = marker.id.clone();
                upsert(&mut self.line_markers, marker, |m| &m.id, &mut self.next_seq);
                let old = self.line_set.remove_marker(&id);
                let mut built = self
                    .line_markers
                    .iter()
                    .find(|r| r.marker.id == id)
                    .map(|r| build_line_marker(&r.marker, ctx))
                    .unwrap_or_default();
                carry_widget_keys(&mut self.next_widget_key, &old, &mut built, None);
                self.line_set.insert_all(built);
            }
            DecorationEffect::RemoveLineMarker(id) => {
                self.line_markers.retain(|r| r.marker.id != id);
                self.line_set.remove_marker(&id);
            }
            DecorationEffect::AddPositionMarker(marker) => {
                validate_id(&marker.id)?;
                let id = marker.id.clone();
                upsert(
                    &mut self.position_markers,
                    marker,
                    |m| &m.id,
                    &mut self.next_seq,
                );
                let old = self.position_set.remove_marker(&id);
                let reg = self.position_markers.iter().find(|r| r.marker.id == id);
                let (mut built, data_eq) = match reg {
                    Some(r) => (
                        build_position_marker(&r.marker, ctx),
                        r.marker.data_eq.clone(),
                    ),
                    None => (Vec::new(), None),
                };
                carry_widget_keys(
                    &mut self.next_widget_key,
                    &old,
                    &mut built,
                    data_eq.as_deref(),
                );
                self.position_set.insert_all(built);
            }
            DecorationEffect::RemovePositionMarker(id) => {
                self.position_markers.retain(|r| r.marker.id != id);
                self.position_set.remove_marker(&id);
            }
            DecorationEffect::AddGutterMarker(marker) => {
                validate_id(&marker.id)?;
                upsert(
                    &mut self.gutter_markers,
                    marker,
                    |m| &m.id,
                    &mut self.next_seq,
                );
            }
            DecorationEffect::RemoveGutterMarker(id) => {
                self.gutter_markers.retain(|r| r.marker.id != id);
            }
            DecorationEffect::DocumentEdited(tx) => {
                self.line_set.map(&tx);
                self.position_set.map(&tx);
                self.rebuild_content(ctx);
            }
            DecorationEffect::ViewportMoved => {
                self.rebuild_content(ctx);
            }
        }
        self.rebuild_gutter(ctx);
        self.version += 1;
        Ok(())
    }

    /// Register (or replace) a line-content marker.
    pub fn add_line_marker(
        &mut self,
        marker: LineContentMarker,
        ctx: &BuildContext<'_>,
    ) -> Result<(), MarkerError> {
        self.apply(DecorationEffect::AddLineMarker(marker), ctx)
    }

    /// Unregister a line-content marker.
    pub fn remove_line_marker(&mut self, id: &str, ctx: &BuildContext<'_>) {
        // Removal of an unknown id is not an error.
        let _ = self.apply(DecorationEffect::RemoveLineMarker(id.to_string()), ctx);
    }

    /// Register (or replace) a position-content marker.
    pub fn add_position_marker(
        &mut self,
        marker: PositionContentMarker,
        ctx: &BuildContext<'_>,
    ) -> Result<(), MarkerError> {
        self.apply(DecorationEffect::AddPositionMarker(marker), ctx)
    }

    /// Unregister a position-content marker.
    pub fn remove_position_marker(&mut self, id: &str, ctx: &BuildContext<'_>) {
        let _ = self.apply(DecorationEffect::RemovePositionMarker(id.to_string()), ctx);
    }

    /// Register (or replace) a gutter marker.
    pub fn add_gutter_marker(
        &mut self,
        marker: GutterMarker,
        ctx: &BuildContext<'_>,
    ) -> Result<(), MarkerError> {
        self.apply(DecorationEffect::AddGutterMarker(marker), ctx)
    }

    /// Unregister a gutter marker.
    pub fn remove_gutter_marker(&mut self, id: &str, ctx: &BuildContext<'_>) {
        let _ = self.apply(DecorationEffect::RemoveGutterMarker(id.to_string()), ctx);
    }

    /// Fold a document edit (remap, then rebuild).
    pub fn apply_transaction(&mut self, tx: &Transaction, ctx: &BuildContext<'_>) {
        let _ = self.apply(DecorationEffect::DocumentEdited(tx.clone()), ctx);
    }

    /// Fold a viewport-only change (full rebuild).
    pub fn handle_viewport_change(&mut self, ctx: &BuildContext<'_>) {
        let _ = self.apply(DecorationEffect::ViewportMoved, ctx);
    }

    fn rebuild_content(&mut self, ctx: &BuildContext<'_>) {
        let old_lines = std::mem::take(&mut self.line_set);
        let mut line_built = Vec::new();
        for reg in &self.line_markers {
            line_built.extend(build_line_marker(&reg.marker, ctx));
        }
        carry_widget_keys(
            &mut self.next_widget_key,
            old_lines.items(),
            &mut line_built,
            None,
        );
        self.line_set.insert_all(line_built);

        let old_positions = std::mem::take(&mut self.position_set);
        let mut position_built = Vec::new();
        // display_last markers build after all others; registration order
        // breaks ties within each group.
        for reg in self
            .position_markers
            .iter()
            .filter(|r| !r.marker.display_last)
            .chain(self.position_markers.iter().filter(|r| r.marker.display_last))
        {
            let mut built = build_position_marker(&reg.marker, ctx);
            let old: Vec<Decoration> = old_positions
                .iter()
                .filter(|d| d.marker_id == reg.marker.id)
                .cloned()
                .collect();
            carry_widget_keys(
                &mut self.next_widget_key,
                &old,
                &mut built,
                reg.marker.data_eq.as_deref(),
            );
            position_built.extend(built);
        }
        self.position_set.insert_all(position_built);
    }

    fn rebuild_gutter(&mut self, ctx: &BuildContext<'_>) {
        let markers: Vec<&GutterMarker> = self.gutter_markers.iter().map(|r| &r.marker).collect();
        self.gutter = build_gutter(&markers, ctx);
    }

}

/// Give every widget in `built` a stable key: the key of an equal old widget
/// where one exists, a fresh key otherwise.
fn carry_widget_keys(
    next_widget_key: &mut u64,
    old: &[Decoration],
    built: &mut [Decoration],
    data_eq: Option<&(dyn Fn(&str, &str) -> bool + Send + Sync)>,
) {
    let mut consumed = vec![false; old.len()];
    for d in built.iter_mut() {
        if !d.is_widget() {
            continue;
        }
        let reused = old.iter().enumerate().find(|(i, o)| {
            !consumed[*i] && o.widget_key.is_some() && widgets_equal(o, d, data_eq)
        });
        match reused {
            Some((i, o)) => {
                consumed[i] = true;
                d.widget_key = o.widget_key;
            }
            None => {
                d.widget_key = Some(*next_widget_key);
                *next_widget_key += 1;
            }
        }
    }
}

fn upsert<M>(
    registrations: &mut Vec<Registered<M>>,
    marker: M,
    id_of: impl Fn(&M) -> &str,
    next_seq: &mut u64,
) {
    let id = id_of(&marker).to_string();
    if let Some(existing) = registrations.iter_mut().find(|r| id_of(&r.marker) == id) {
        // Re-adding keeps the original registration position.
        existing.marker = marker;
    } else {
        registrations.push(Registered {
            seq: *next_seq,
            marker,
        });
        *next_seq += 1;
    }
    registrations.sort_by_key(|r| r.seq);
}

fn widgets_equal(
    old: &Decoration,
    new: &Decoration,
    data_eq: Option<&(dyn Fn(&str, &str) -> bool + Send + Sync)>,
) -> bool {
    if old.marker_id != new.marker_id {
        return false;
    }
    match (&old.kind, &new.kind) {
        (
            DecorationKind::LineWidget {
                line: a,
                value: av,
                as_block: ab,
            },
            DecorationKind::LineWidget {
                line: b,
                value: bv,
                as_block: bb,
            },
        ) => a == b && av == bv && ab == bb,
        (
            DecorationKind::PositionWidget {
                line: a,
                column: ac,
                data: ad,
                ..
            },
            DecorationKind::PositionWidget {
                line: b,
                column: bc,
                data: bd,
                ..
            },
        ) => {
            if a != b || ac != bc {
                return false;
            }
            match (ad, bd, data_eq) {
                (Some(x), Some(y), Some(eq)) => eq(x, y),
                _ => ad == bd,
            }
        }
        _ => false,
    }
}

/// Build one line-content marker's decorations against the context.
///
/// Lines outside the viewport's line range (or past the document end) are
/// skipped; class decorations anchor at line start, widgets at line end.
pub fn build_line_marker(marker: &LineContentMarker, ctx: &BuildContext<'_>) -> Vec<Decoration> {
    let (vstart, vend) = ctx.viewport.line_range(ctx.buffer);
    let line_count = ctx.buffer.line_count();
    let side = 0;

    let lines: Vec<(usize, Option<String>)> = if marker.mark_all_lines {
        (vstart..=vend.min(line_count.saturating_sub(1)))
            .map(|line| (line, None))
            .collect()
    } else {
        marker
            .lines
            .iter()
            .map(|spec| (spec.line, spec.value.clone()))
            .collect()
    };

    let mut out = Vec::new();
    for (line, value) in lines {
        if line < vstart || line > vend || line >= line_count {
            continue;
        }
        let Some(start) = ctx.buffer.line_start(line) else {
            continue;
        };
        match &marker.render {
            LineRender::Class(class) => out.push(Decoration {
                marker_id: marker.id.clone(),
                range: DecorationRange::point(start),
                kind: DecorationKind::LineClass {
                    class: class.clone(),
                },
                side,
                widget_key: None,
            }),
            LineRender::Widget { as_block } => {
                let end = start + ctx.buffer.line_len(line);
                out.push(Decoration {
                    marker_id: marker.id.clone(),
                    range: DecorationRange::point(end),
                    kind: DecorationKind::LineWidget {
                        line,
                        value,
                        as_block: *as_block,
                    },
                    side,
                    widget_key: None,
                });
            }
        }
    }
    out
}

/// Build one position-content marker's decorations against the context.
///
/// Span positions are included verbatim when fully inside the viewport (class
/// rendering only). Point positions clamp their column to at least the line's
/// leading indentation; class-rendered points extend over the token at the
/// anchor, skipped when no token starts exactly there or the token is empty
/// or an opening bracket.
pub fn build_position_marker(
    marker: &PositionContentMarker,
    ctx: &BuildContext<'_>,
) -> Vec<Decoration> {
    let (vstart, vend) = ctx.viewport.line_range(ctx.buffer);
    let line_count = ctx.buffer.line_count();
    let side = u8::from(marker.display_last);

    let mut out = Vec::new();
    for position in &marker.positions {
        match position {
            PositionSpec::Span { from, to } => {
                if *from >= *to || *from < ctx.viewport.from || *to > ctx.viewport.to {
                    continue;
                }
                // Widget rendering over spans is unsupported; spans only
                // carry classes.
                if let PositionRender::Class(class) = &marker.render {
                    out.push(Decoration {
                        marker_id: marker.id.clone(),
                        range: DecorationRange::new(*from, *to),
                        kind: DecorationKind::TokenClass {
                            class: class.clone(),
                        },
                        side,
                        widget_key: None,
                    });
                }
            }
            PositionSpec::Point { line, column, data } => {
                if *line < vstart || *line > vend || *line >= line_count {
                    continue;
                }
                let Some(line_start) = ctx.buffer.line_start(*line) else {
                    continue;
                };
                let indent = ctx.buffer.leading_indentation(*line);
                let col = (*column).max(indent).min(ctx.buffer.line_len(*line));
                let pos = line_start + col;

                match &marker.render {
                    PositionRender::Widget => {
                        let at_line_start = col <= indent;
                        out.push(Decoration {
                            marker_id: marker.id.clone(),
                            range: DecorationRange::point(pos),
                            kind: DecorationKind::PositionWidget {
                                line: *line,
                                column: *column,
                                at_line_start,
                                data: data.clone(),
                            },
                            side,
                            widget_key: None,
                        });
                    }
                    PositionRender::Class(class) => {
                        let Some(tokens) = ctx.tokens else {
                            continue;
                        };
                        let Some(token) = tokens.token_at(pos) else {
                            continue;
                        };
                        // The token must start exactly at the anchor.
                        if token.from != pos || token.to <= pos {
                            continue;
                        }
                        let text = ctx.buffer.slice(pos, token.to);
                        if text.is_empty() || text == "{" || text == "[" {
                            continue;
                        }
                        out.push(Decoration {
                            marker_id: marker.id.clone(),
                            range: DecorationRange::new(pos, token.to),
                            kind: DecorationKind::TokenClass {
                                class: class.clone(),
                            },
                            side,
                            widget_key: None,
                        });
                    }
                }
            }
        }
    }
    out
}

/// Run the gutter pass: every visible line crossed with every gutter marker.
pub fn build_gutter(markers: &[&GutterMarker], ctx: &BuildContext<'_>) -> Vec<GutterDecoration> {
    let (vstart, vend) = ctx.viewport.line_range(ctx.buffer);
    let line_count = ctx.buffer.line_count();

    let mut out = Vec::new();
    for line in vstart..=vend.min(line_count.saturating_sub(1)) {
        for marker in markers {
            let Some(value) = (marker.condition)(line) else {
                continue;
            };
            out.push(GutterDecoration {
                marker_id: marker.id.clone(),
                line,
                line_class: marker.line_class.clone(),
                value,
            });
        }
    }
    out
}
