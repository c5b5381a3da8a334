//! Derived decoration data model.
//!
//! Decorations are UI-facing annotations anchored to document character
//! offsets, derived from registered markers against the current viewport.
//! They never modify document text; the host renders them. Between rebuilds
//! they are kept anchored by remapping through [`Transaction`]s.

use crate::transaction::{Assoc, Transaction};

/// A half-open character-offset range (`start..end`) in the document.
///
/// Point-anchored decorations use `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationRange {
    /// Range start offset (inclusive), in Unicode scalar values (`char`) from the start of the document.
    pub start: usize,
    /// Range end offset (exclusive), in Unicode scalar values (`char`) from the start of the document.
    pub end: usize,
}

impl DecorationRange {
    /// Create a new decoration range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a point range.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Returns `true` if the range is a point.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }
}

/// What a decoration renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    /// A class applied to a whole line, anchored at the line start.
    LineClass {
        /// The class name.
        class: String,
    },
    /// A widget anchored at the end of a line.
    LineWidget {
        /// The decorated line.
        line: usize,
        /// Opaque host payload from the marker's [`LineSpec`](crate::markers::LineSpec).
        value: Option<String>,
        /// Render as a block element below the line.
        as_block: bool,
    },
    /// A class applied over a token or span.
    TokenClass {
        /// The class name.
        class: String,
    },
    /// A widget anchored at an exact position.
    PositionWidget {
        /// The decorated line.
        line: usize,
        /// The marker-declared column (before indentation clamping).
        column: usize,
        /// Whether only whitespace precedes the anchor on its line.
        at_line_start: bool,
        /// Opaque host payload used for widget identity.
        data: Option<String>,
    },
}

impl DecorationKind {
    /// Returns `true` for widget kinds.
    pub fn is_widget(&self) -> bool {
        matches!(self, Self::LineWidget { .. } | Self::PositionWidget { .. })
    }
}

/// A single derived decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Id of the marker this decoration was built from.
    pub marker_id: String,
    /// Anchor range in character offsets.
    pub range: DecorationRange,
    /// What to render.
    pub kind: DecorationKind,
    /// Compositing side at equal ranges: 0 for normal markers, 1 for
    /// `display_last` markers (sorted after).
    pub side: u8,
    /// Stable identity for widget decorations, preserved across rebuilds when
    /// the old and new widgets compare equal. `None` for non-widget kinds.
    pub widget_key: Option<u64>,
}

impl Decoration {
    /// Returns `true` for widget decorations.
    pub fn is_widget(&self) -> bool {
        self.kind.is_widget()
    }
}

/// A sorted collection of decorations.
///
/// Ordering is `(range.start, range.end, side)`; insertion order breaks the
/// remaining ties (stable sort), so markers built later composite later.
#[derive(Debug, Clone, Default)]
pub struct DecorationSet {
    items: Vec<Decoration>,
}

impl DecorationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decorations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate decorations in render order.
    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.items.iter()
    }

    /// Decorations in render order.
    pub fn items(&self) -> &[Decoration] {
        &self.items
    }

    /// Remove all decorations owned by `marker_id`; returns the removed items.
    pub fn remove_marker(&mut self, marker_id: &str) -> Vec<Decoration> {
        let mut removed = Vec::new();
        self.items.retain(|d| {
            if d.marker_id == marker_id {
                removed.push(d.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Insert decorations and restore render order.
    pub fn insert_all(&mut self, decorations: Vec<Decoration>) {
        self.items.extend(decorations);
        self.items
            .sort_by_key(|d| (d.range.start, d.range.end, d.side));
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Remap every decoration through a transaction, dropping spans that
    /// collapse to nothing.
    ///
    /// Point anchors stick after insertions at their position; span starts
    /// exclude boundary insertions and span ends exclude trailing insertions
    /// (non-inclusive mark semantics).
    pub fn map(&mut self, tx: &Transaction) {
        if tx.is_empty() {
            return;
        }
        for d in &mut self.items {
            if d.range.is_point() {
                let mapped = tx.map_offset(d.range.start, Assoc::After);
                d.range = DecorationRange::point(mapped);
            } else {
                d.range = DecorationRange::new(
                    tx.map_offset(d.range.start, Assoc::After),
                    tx.map_offset(d.range.end, Assoc::Before),
                );
            }
        }
        self.items
            .retain(|d| d.range.is_point() || d.range.start < d.range.end);
        self.items
            .sort_by_key(|d| (d.range.start, d.range.end, d.side));
    }
}

/// A gutter element produced by the per-viewport gutter pass.
///
/// Gutter state is rebuilt wholesale each pass and is never remapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GutterDecoration {
    /// Id of the gutter marker that produced this element.
    pub marker_id: String,
    /// The decorated line.
    pub line: usize,
    /// Class applied to the element.
    pub line_class: Option<String>,
    /// Payload returned by the marker's condition (may be empty).
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionEdit;
    use pretty_assertions::assert_eq;

    fn deco(marker: &str, start: usize, end: usize, side: u8) -> Decoration {
        Decoration {
            marker_id: marker.to_string(),
            range: DecorationRange::new(start, end),
            kind: DecorationKind::TokenClass {
                class: "c".to_string(),
            },
            side,
            widget_key: None,
        }
    }

    #[test]
    fn test_insert_all_sorts_by_range_then_side() {
        let mut set = DecorationSet::new();
        set.insert_all(vec![deco("b", 5, 5, 1), deco("a", 5, 5, 0), deco("c", 2, 4, 0)]);
        let order: Vec<_> = set.iter().map(|d| d.marker_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_marker_filters_by_id() {
        let mut set = DecorationSet::new();
        set.insert_all(vec![deco("a", 0, 1, 0), deco("b", 2, 3, 0), deco("a", 4, 5, 0)]);
        let removed = set.remove_marker("a");
        assert_eq!(removed.len(), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].marker_id, "b");
    }

    #[test]
    fn test_map_shifts_ranges_and_drops_collapsed_spans() {
        let mut set = DecorationSet::new();
        set.insert_all(vec![deco("span", 4, 8, 0), deco("point", 10, 10, 0)]);

        // Delete the span's interior entirely.
        let tx = Transaction {
            before_char_count: 20,
            after_char_count: 16,
            edits: vec![TransactionEdit {
                start: 4,
                deleted_text: "xxxx".to_string(),
                inserted_text: String::new(),
            }],
        };
        set.map(&tx);
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].marker_id, "point");
        assert_eq!(set.items()[0].range, DecorationRange::point(6));
    }
}
