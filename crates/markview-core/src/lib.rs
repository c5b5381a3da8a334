#![warn(missing_docs)]
//! Markview Core - Headless Decoration & Viewport Engine
//!
//! # Overview
//!
//! `markview-core` is the headless core of a virtualized source viewer. It
//! maintains markers (line highlights, inline widgets, gutter annotations,
//! search highlights, position-anchored widgets) over a mutable text buffer,
//! keeps them consistent across edits and scrolling, and emits declarative
//! render batches. It never renders: the host owns layout and painting.
//!
//! # Core Features
//!
//! - **Position Mapping**: line/column ↔ character offset conversion over a
//!   rope-backed buffer, exact in both directions
//! - **Viewport Tracking**: visibility tests with horizontal bounds and
//!   Unicode-width column projection, edge-bounded scroll requests
//! - **Decoration Engine**: three marker families folded by an effect
//!   reducer; remap-then-rebuild across edits; stable widget identity
//! - **Search**: whole-document compilation, cyclic navigation, an
//!   independently keyed highlight overlay
//! - **Scroll Snapshots**: per-document positions restored atomically on swap
//! - **State Tracking**: version numbers and change notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Session Façade & Change Notifications      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Decoration Ports (RangeSet / LineTable)    │  ← Rendering Data
//! ├─────────────────────────────────────────────┤
//! │  Decoration Engine (markers → decorations)  │  ← Derived State
//! ├─────────────────────────────────────────────┤
//! │  Search / Scroll Snapshots / Viewport       │  ← Feature State
//! ├─────────────────────────────────────────────┤
//! │  Transactions (structured edits + mapping)  │  ← Change Flow
//! ├─────────────────────────────────────────────┤
//! │  Text Buffer (Rope-based)                   │  ← Document Access
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use markview_core::{
//!     LineContentMarker, LineSpec, SessionManager, SessionChangeType, Viewport,
//! };
//!
//! let mut session = SessionManager::new("fn main() {}\nlet x = 1;\n", Viewport::new(0, 24));
//!
//! session.subscribe(|change| {
//!     assert_eq!(change.change_type, SessionChangeType::MarkersChanged);
//! });
//!
//! session
//!     .add_line_marker(
//!         LineContentMarker::class("active-line", "highlight", vec![LineSpec::at(1)]),
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(session.engine().line_decorations().len(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - rope-backed text buffer and position conversion
//! - [`transaction`] - structured edits and offset remapping
//! - [`viewport`] - rendered-range tracking and scroll requests
//! - [`markers`] - host-registered marker families
//! - [`decorations`] - derived decoration data model
//! - [`engine`] - effect reducer deriving decorations from markers
//! - [`search`] - search compilation, navigation, highlight overlay
//! - [`scroll`] - per-document scroll snapshot cache
//! - [`port`] - render batch backends
//! - [`session`] - the session façade tying it all together
//!
//! # Coordinates
//!
//! All public offsets are **character offsets** (Unicode scalar values),
//! ranges are half-open, and lines/columns are 0-based. The one exception is
//! the viewport's `to` bound, which is inclusive (the end of the bottom
//! rendered line). Visual columns (tabs, CJK wide characters) appear only in
//! the viewport's projection.

pub mod buffer;
pub mod decorations;
pub mod engine;
pub mod markers;
pub mod port;
pub mod scroll;
pub mod search;
pub mod session;
pub mod transaction;
pub mod viewport;

pub use buffer::{Location, PositionError, TextBuffer};
pub use decorations::{
    Decoration, DecorationKind, DecorationRange, DecorationSet, GutterDecoration,
};
pub use engine::{BuildContext, DecorationEffect, DecorationEngine, TokenResolver, TokenSpan};
pub use markers::{
    GutterMarker, GutterPredicate, LineContentMarker, LineRender, LineSpec, MarkerError,
    PositionContentMarker, PositionDataEq, PositionRender, PositionSpec,
};
pub use port::{
    DecorationPort, GutterCell, LineEntry, LineSpanCell, LineTablePort, LineWidgetCell,
    RangeSetPort, RenderBatch, RenderItem,
};
pub use scroll::{DocumentId, ScrollSnapshot, ScrollSnapshotCache};
pub use search::{
    HighlightOverlay, SEARCH_OVERLAY_MARKER_ID, SearchError, SearchMatch, SearchOptions,
    SearchState, find_all,
};
pub use session::{
    AppliedScroll, SessionChange, SessionChangeCallback, SessionChangeType, SessionManager,
    parse_jump_target,
};
pub use transaction::{Assoc, Transaction, TransactionEdit};
pub use viewport::{Align, MAX_VERTICAL_OFFSET, ScrollRequest, Viewport, visual_column};
