//! Marker families registered by the host.
//!
//! Markers are the persistent, host-owned declarations; decorations are the
//! derived, viewport-scoped state rebuilt from them. Three families exist:
//!
//! - [`LineContentMarker`]: whole-line classes or end-of-line widgets
//! - [`PositionContentMarker`]: token classes or point-anchored widgets
//! - [`GutterMarker`]: per-line gutter elements driven by a predicate
//!
//! Every marker has a unique id within its family; re-registering an id
//! replaces the previous marker. Markers survive document swaps and simply
//! stop producing decorations while their targets are out of range.

use std::sync::Arc;

/// Marker registration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerError {
    /// The marker id was empty.
    MissingId,
}

impl std::fmt::Display for MarkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "marker id must be a non-empty string"),
        }
    }
}

impl std::error::Error for MarkerError {}

/// A line targeted by a [`LineContentMarker`], with an optional opaque value
/// handed back to the host when the widget is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    /// 0-based line index.
    pub line: usize,
    /// Opaque host payload attached to this line's widget.
    pub value: Option<String>,
}

impl LineSpec {
    /// A line spec without a payload.
    pub fn at(line: usize) -> Self {
        Self { line, value: None }
    }

    /// A line spec with a payload.
    pub fn with_value(line: usize, value: impl Into<String>) -> Self {
        Self {
            line,
            value: Some(value.into()),
        }
    }
}

/// How a line-content marker renders on its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRender {
    /// Add a class to the whole line.
    Class(String),
    /// Materialize a widget at the end of the line.
    Widget {
        /// Render the widget as a block element below the line instead of
        /// inline after it.
        as_block: bool,
    },
}

/// A marker decorating whole lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContentMarker {
    /// Unique id within the line-content family.
    pub id: String,
    /// Targeted lines. Ignored when `mark_all_lines` is set.
    pub lines: Vec<LineSpec>,
    /// Rendering mode.
    pub render: LineRender,
    /// Decorate every visible line instead of the `lines` list.
    pub mark_all_lines: bool,
}

impl LineContentMarker {
    /// Create a class marker for the given lines.
    pub fn class(id: impl Into<String>, class: impl Into<String>, lines: Vec<LineSpec>) -> Self {
        Self {
            id: id.into(),
            lines,
            render: LineRender::Class(class.into()),
            mark_all_lines: false,
        }
    }

    /// Create an end-of-line widget marker for the given lines.
    pub fn widget(id: impl Into<String>, lines: Vec<LineSpec>) -> Self {
        Self {
            id: id.into(),
            lines,
            render: LineRender::Widget { as_block: false },
            mark_all_lines: false,
        }
    }

    /// Render widgets as block elements below their lines.
    pub fn with_block_widgets(mut self) -> Self {
        if let LineRender::Widget { as_block } = &mut self.render {
            *as_block = true;
        }
        self
    }

    /// Decorate every visible line.
    pub fn with_all_lines(mut self) -> Self {
        self.mark_all_lines = true;
        self
    }
}

/// A position targeted by a [`PositionContentMarker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionSpec {
    /// A half-open character range, decorated verbatim when fully inside the
    /// viewport.
    Span {
        /// Inclusive start character offset.
        from: usize,
        /// Exclusive end character offset.
        to: usize,
    },
    /// A line/column anchor. The column is clamped to at least the line's
    /// leading indentation before anchoring.
    Point {
        /// 0-based line index.
        line: usize,
        /// 0-based character column.
        column: usize,
        /// Opaque host payload, also used for widget identity comparison.
        data: Option<String>,
    },
}

/// How a position-content marker renders at its positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionRender {
    /// Add a class over the resolved token (point anchors) or the span.
    Class(String),
    /// Materialize a widget at the anchor.
    Widget,
}

/// Custom equality over two positions' `data` payloads, used to decide
/// whether a rebuilt widget is "the same widget" as before.
pub type PositionDataEq = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// A marker decorating exact document positions.
#[derive(Clone)]
pub struct PositionContentMarker {
    /// Unique id within the position-content family.
    pub id: String,
    /// Targeted positions.
    pub positions: Vec<PositionSpec>,
    /// Rendering mode.
    pub render: PositionRender,
    /// Build this marker's decorations after all non-`display_last` markers,
    /// so its widgets composite on top at shared positions. Multiple
    /// `display_last` markers tie-break by registration order.
    pub display_last: bool,
    /// Optional custom equality on point `data` payloads for widget identity.
    /// Defaults to string equality.
    pub data_eq: Option<PositionDataEq>,
}

impl std::fmt::Debug for PositionContentMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionContentMarker")
            .field("id", &self.id)
            .field("positions", &self.positions)
            .field("render", &self.render)
            .field("display_last", &self.display_last)
            .field("data_eq", &self.data_eq.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PositionContentMarker {
    /// Create a class marker for the given positions.
    pub fn class(
        id: impl Into<String>,
        class: impl Into<String>,
        positions: Vec<PositionSpec>,
    ) -> Self {
        Self {
            id: id.into(),
            positions,
            render: PositionRender::Class(class.into()),
            display_last: false,
            data_eq: None,
        }
    }

    /// Create a widget marker for the given positions.
    pub fn widget(id: impl Into<String>, positions: Vec<PositionSpec>) -> Self {
        Self {
            id: id.into(),
            positions,
            render: PositionRender::Widget,
            display_last: false,
            data_eq: None,
        }
    }

    /// Composite this marker's widgets on top at shared positions.
    pub fn with_display_last(mut self) -> Self {
        self.display_last = true;
        self
    }

    /// Install a custom equality on point `data` payloads.
    pub fn with_data_eq(mut self, eq: PositionDataEq) -> Self {
        self.data_eq = Some(eq);
        self
    }
}

/// Per-line gutter predicate. `None` suppresses the element for that line;
/// `Some(value)` renders it with the given opaque payload (which may be
/// empty: "defined but falsy" still renders).
pub type GutterPredicate = Arc<dyn Fn(usize) -> Option<String> + Send + Sync>;

/// A marker producing gutter elements next to visible lines.
#[derive(Clone)]
pub struct GutterMarker {
    /// Unique id within the gutter family.
    pub id: String,
    /// Optional class applied to the gutter element.
    pub line_class: Option<String>,
    /// Per-line predicate deciding whether (and with what payload) the
    /// element renders.
    pub condition: GutterPredicate,
}

impl std::fmt::Debug for GutterMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GutterMarker")
            .field("id", &self.id)
            .field("line_class", &self.line_class)
            .field("condition", &"<fn>")
            .finish()
    }
}

impl GutterMarker {
    /// Create a gutter marker from a predicate.
    pub fn new(
        id: impl Into<String>,
        condition: impl Fn(usize) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            line_class: None,
            condition: Arc::new(condition),
        }
    }

    /// Set the class applied to rendered gutter elements.
    pub fn with_line_class(mut self, class: impl Into<String>) -> Self {
        self.line_class = Some(class.into());
        self
    }
}

pub(crate) fn validate_id(id: &str) -> Result<(), MarkerError> {
    if id.is_empty() {
        return Err(MarkerError::MissingId);
    }
    Ok(())
}
