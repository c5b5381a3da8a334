#![warn(missing_docs)]
//! `markview-treesitter` - Tree-sitter integration for `markview-core`.
//!
//! This crate provides an incremental parsing pipeline kept in sync with
//! buffer transactions, plus structural queries over the parsed tree:
//!
//! - [`SyntaxProcessor`]: incremental parse that follows
//!   `markview_core::Transaction` edits and implements the core crate's
//!   `TokenResolver` seam
//! - [`SymbolQuery`]: function/class listings, enclosing-function lookup,
//!   best-match expressions, in-scope lines, and binding references
//! - [`TreeWalk`] / [`BatchedWalk`]: pre-order traversal with byte-range
//!   clipping and cooperative yield points
//!
//! Grammar crates are supplied by the host; the queries target the
//! JavaScript grammar's node kinds.

mod processor;
mod symbols;
mod walk;

pub use processor::{SyntaxError, SyntaxProcessor, UpdateMode};
pub use symbols::{
    BindingRecord, BindingReference, ExpressionMatch, PropertyStep, ScopeKind, ScopeLevel,
    SymbolKind, SymbolQuery, SymbolRecord, SymbolSpan, CLASS_NODE_KINDS, EXPRESSION_NODE_KINDS,
    FUNCTION_NODE_KINDS,
};
pub use walk::{BatchedWalk, TreeWalk};
