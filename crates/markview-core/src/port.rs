//! Decoration ports: declarative render batches for the host.
//!
//! The engine never renders. A [`DecorationPort`] turns decoration state into
//! a [`RenderBatch`] the host's render layer consumes. Two backends exist and
//! are selected at session construction:
//!
//! - [`RangeSetPort`]: a flat, sorted list of decorated ranges, for hosts
//!   whose renderer works over offset ranges
//! - [`LineTablePort`]: a per-line table merging content and gutter state,
//!   for hosts with line-oriented (legacy) renderers
//!
//! Engine logic upstream of the port is identical for both.

use crate::buffer::TextBuffer;
use crate::decorations::{
    Decoration, DecorationKind, DecorationRange, DecorationSet, GutterDecoration,
};

/// A single item of a range-oriented render batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderItem {
    /// Anchor range in character offsets.
    pub range: DecorationRange,
    /// Owning marker id.
    pub marker_id: String,
    /// What to render.
    pub kind: DecorationKind,
    /// Stable widget identity, for widget kinds.
    pub widget_key: Option<u64>,
}

/// A widget cell of a line-table render batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWidgetCell {
    /// Owning marker id.
    pub marker_id: String,
    /// Anchor character offset.
    pub offset: usize,
    /// What to render.
    pub kind: DecorationKind,
    /// Stable widget identity.
    pub widget_key: Option<u64>,
}

/// A class span cell of a line-table render batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpanCell {
    /// Owning marker id.
    pub marker_id: String,
    /// Span start character offset.
    pub start: usize,
    /// Span end character offset (exclusive).
    pub end: usize,
    /// The class name.
    pub class: String,
}

/// A gutter cell of a line-table render batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterCell {
    /// Owning marker id.
    pub marker_id: String,
    /// Class applied to the element.
    pub line_class: Option<String>,
    /// Opaque payload from the marker's condition.
    pub value: String,
}

/// One line of a line-table render batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineEntry {
    /// 0-based line index.
    pub line: usize,
    /// Whole-line classes, in render order.
    pub line_classes: Vec<String>,
    /// Class spans on this line, in render order.
    pub spans: Vec<LineSpanCell>,
    /// Widgets anchored on this line, in render order.
    pub widgets: Vec<LineWidgetCell>,
    /// Gutter elements next to this line, in marker order.
    pub gutter: Vec<GutterCell>,
}

/// The declarative output handed to the render host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBatch {
    /// Flat sorted ranges plus the gutter pass output.
    Ranges {
        /// Content decorations in render order.
        items: Vec<RenderItem>,
        /// Gutter elements in line order.
        gutter: Vec<GutterDecoration>,
    },
    /// Per-line table of merged content and gutter state.
    Lines(Vec<LineEntry>),
}

/// Strategy turning decoration state into a render batch.
pub trait DecorationPort {
    /// Materialize the current decoration state.
    fn materialize(
        &self,
        buffer: &TextBuffer,
        content: &DecorationSet,
        gutter: &[GutterDecoration],
    ) -> RenderBatch;
}

/// Range-oriented port: passes the sorted decoration set through.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeSetPort;

impl DecorationPort for RangeSetPort {
    fn materialize(
        &self,
        _buffer: &TextBuffer,
        content: &DecorationSet,
        gutter: &[GutterDecoration],
    ) -> RenderBatch {
        let items = content
            .iter()
            .map(|d| RenderItem {
                range: d.range,
                marker_id: d.marker_id.clone(),
                kind: d.kind.clone(),
                widget_key: d.widget_key,
            })
            .collect();
        RenderBatch::Ranges {
            items,
            gutter: gutter.to_vec(),
        }
    }
}

/// Line-oriented port: groups decorations and gutter elements by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineTablePort;

impl DecorationPort for LineTablePort {
    fn materialize(
        &self,
        buffer: &TextBuffer,
        content: &DecorationSet,
        gutter: &[GutterDecoration],
    ) -> RenderBatch {
        let mut lines: Vec<LineEntry> = Vec::new();

        let mut entry_for = |lines: &mut Vec<LineEntry>, line: usize| -> usize {
            if let Some(i) = lines.iter().position(|e| e.line == line) {
                return i;
            }
            lines.push(LineEntry {
                line,
                ..Default::default()
            });
            lines.len() - 1
        };

        for d in content.iter() {
            let line = buffer.location_at(d.range.start).line;
            let i = entry_for(&mut lines, line);
            match &d.kind {
                DecorationKind::LineClass { class } => lines[i].line_classes.push(class.clone()),
                DecorationKind::TokenClass { class } => lines[i].spans.push(LineSpanCell {
                    marker_id: d.marker_id.clone(),
                    start: d.range.start,
                    end: d.range.end,
                    class: class.clone(),
                }),
                DecorationKind::LineWidget { .. } | DecorationKind::PositionWidget { .. } => {
                    lines[i].widgets.push(LineWidgetCell {
                        marker_id: d.marker_id.clone(),
                        offset: d.range.start,
                        kind: d.kind.clone(),
                        widget_key: d.widget_key,
                    });
                }
            }
        }

        for g in gutter {
            let i = entry_for(&mut lines, g.line);
            lines[i].gutter.push(GutterCell {
                marker_id: g.marker_id.clone(),
                line_class: g.line_class.clone(),
                value: g.value.clone(),
            });
        }

        lines.sort_by_key(|e| e.line);
        RenderBatch::Lines(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_state() -> (TextBuffer, DecorationSet, Vec<GutterDecoration>) {
        let buffer = TextBuffer::new("one\ntwo\nthree");
        let mut set = DecorationSet::new();
        set.insert_all(vec![
            Decoration {
                marker_id: "hl".to_string(),
                range: DecorationRange::point(4),
                kind: DecorationKind::LineClass {
                    class: "highlight".to_string(),
                },
                side: 0,
                widget_key: None,
            },
            Decoration {
                marker_id: "expr".to_string(),
                range: DecorationRange::new(4, 7),
                kind: DecorationKind::TokenClass {
                    class: "match".to_string(),
                },
                side: 0,
                widget_key: None,
            },
        ]);
        let gutter = vec![GutterDecoration {
            marker_id: "bp".to_string(),
            line: 2,
            line_class: None,
            value: "on".to_string(),
        }];
        (buffer, set, gutter)
    }

    #[test]
    fn test_range_set_port_is_order_preserving() {
        let (buffer, set, gutter) = sample_state();
        let batch = RangeSetPort.materialize(&buffer, &set, &gutter);
        let RenderBatch::Ranges { items, gutter } = batch else {
            panic!("expected a range batch");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].marker_id, "hl");
        assert_eq!(gutter.len(), 1);
    }

    #[test]
    fn test_line_table_port_groups_by_line() {
        let (buffer, set, gutter) = sample_state();
        let batch = LineTablePort.materialize(&buffer, &set, &gutter);
        let RenderBatch::Lines(lines) = batch else {
            panic!("expected a line batch");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 1);
        assert_eq!(lines[0].line_classes, vec!["highlight".to_string()]);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[1].line, 2);
        assert_eq!(lines[1].gutter[0].value, "on");
    }
}
