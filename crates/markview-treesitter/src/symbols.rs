//! Symbol and scope queries over a parsed JavaScript document.
//!
//! [`SymbolQuery`] borrows a [`SyntaxProcessor`] and answers structural
//! questions about its current tree: function/class listings, the function
//! enclosing a location, candidate expressions on a line, which lines are in
//! scope at a paused location, and where a set of scope bindings is
//! referenced. All offsets in the returned records are character offsets.

use std::collections::BTreeMap;

use markview_core::Location;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, Tree};

use crate::processor::{SyntaxError, SyntaxProcessor};
use crate::walk::TreeWalk;

/// Node kinds that introduce a function scope.
pub const FUNCTION_NODE_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "generator_function",
    "generator_function_declaration",
    "arrow_function",
    "method_definition",
];

/// Node kinds that declare a class.
pub const CLASS_NODE_KINDS: &[&str] = &["class_declaration", "class"];

/// Node kinds eligible as best-match expressions (hover/preview targets).
pub const EXPRESSION_NODE_KINDS: &[&str] =
    &["member_expression", "identifier", "property_identifier", "this"];

const FUNCTIONS_QUERY: &str = "[
  (function_declaration)
  (function_expression)
  (generator_function)
  (generator_function_declaration)
  (arrow_function)
  (method_definition)
] @function";

const CLASSES_QUERY: &str = "[
  (class_declaration)
  (class)
] @class";

/// What a [`SymbolRecord`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A function, method, or arrow function.
    Function,
    /// A class declaration or expression.
    Class,
}

/// The extent of a symbol or reference, as both locations and char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSpan {
    /// Start location (0-based line/column).
    pub start: Location,
    /// End location (exclusive).
    pub end: Location,
    /// Start character offset.
    pub from: usize,
    /// End character offset (exclusive).
    pub to: usize,
}

/// A named function or class found by [`SymbolQuery::list_functions`] or
/// [`SymbolQuery::list_classes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    /// The symbol's name. Never empty: anonymous symbols are skipped.
    pub name: String,
    /// Function or class.
    pub kind: SymbolKind,
    /// Extent of the whole definition.
    pub span: SymbolSpan,
    /// Parameter names, in order. Empty for classes.
    pub parameters: Vec<String>,
    /// Name of the class this symbol is defined inside, if any.
    pub enclosing_class: Option<String>,
}

/// An expression node overlapping a queried position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionMatch {
    /// Source text of the expression.
    pub text: String,
    /// Tree-sitter node kind (`identifier`, `member_expression`, ...).
    pub node_kind: String,
    /// Extent of the expression.
    pub span: SymbolSpan,
}

/// Kind of a scope level handed to [`SymbolQuery::binding_references`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A function body. Reference search stops after the first one.
    Function,
    /// A lexical block (`{ ... }`).
    Block,
    /// Anything else (module, with, ...): resolved against the whole tree.
    Other,
}

/// One level of a scope chain, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeLevel {
    /// What kind of scope this level is.
    pub kind: ScopeKind,
    /// Names bound at this level.
    pub bindings: Vec<String>,
}

/// One property access applied to a referenced binding (`a.b.c` yields the
/// steps `b` then `c` on the reference `a`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyStep {
    /// The property name.
    pub property: String,
    /// Start character offset of the property token.
    pub from: usize,
    /// End character offset of the property token (exclusive).
    pub to: usize,
}

/// One occurrence of a binding, with its trailing member-access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingReference {
    /// Extent of the identifier itself.
    pub span: SymbolSpan,
    /// Property accesses chained onto this reference, outermost last.
    pub path: Vec<PropertyStep>,
}

/// All references to one binding within its scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRecord {
    /// Every occurrence, in tree order.
    pub refs: Vec<BindingReference>,
}

/// Structural queries over a [`SyntaxProcessor`]'s current tree.
pub struct SymbolQuery<'p> {
    processor: &'p SyntaxProcessor,
    functions: Query,
    classes: Query,
}

impl<'p> SymbolQuery<'p> {
    /// Compile the symbol queries against the processor's language.
    pub fn new(processor: &'p SyntaxProcessor) -> Result<Self, SyntaxError> {
        let functions = Query::new(processor.language(), FUNCTIONS_QUERY)
            .map_err(|e| SyntaxError::Query(e.to_string()))?;
        let classes = Query::new(processor.language(), CLASSES_QUERY)
            .map_err(|e| SyntaxError::Query(e.to_string()))?;
        Ok(Self {
            processor,
            functions,
            classes,
        })
    }

    /// List named functions in definition order.
    ///
    /// Anonymous functions without an assigned name are skipped. When
    /// `max_results` is non-zero the listing stops once it is reached.
    pub fn list_functions(&self, max_results: usize) -> Vec<SymbolRecord> {
        let Some(tree) = self.processor.tree() else {
            return Vec::new();
        };
        let text = self.processor.text();

        let mut out = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.functions, tree.root_node(), text.as_bytes());
        'collect: while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let Some(name) = function_name(node, text) else {
                    continue;
                };
                out.push(SymbolRecord {
                    name,
                    kind: SymbolKind::Function,
                    span: self.span_of(node),
                    parameters: parameter_names(node, text),
                    enclosing_class: enclosing_class_name(node, text),
                });
                if max_results != 0 && out.len() >= max_results {
                    break 'collect;
                }
            }
        }
        out
    }

    /// List named classes in definition order.
    pub fn list_classes(&self) -> Vec<SymbolRecord> {
        let Some(tree) = self.processor.tree() else {
            return Vec::new();
        };
        let text = self.processor.text();

        let mut out = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.classes, tree.root_node(), text.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let Some(name) = class_name(node, text) else {
                    continue;
                };
                out.push(SymbolRecord {
                    name,
                    kind: SymbolKind::Class,
                    span: self.span_of(node),
                    parameters: Vec::new(),
                    enclosing_class: node.parent().and_then(|p| enclosing_class_name(p, text)),
                });
            }
        }
        out
    }

    /// Name of the innermost function enclosing `location`.
    ///
    /// Returns `Some("")` when the enclosing function is anonymous and `None`
    /// when the location sits outside every function.
    pub fn closest_function_name(&self, location: Location) -> Option<String> {
        let tree = self.processor.tree()?;
        let byte = self
            .processor
            .char_to_byte(self.processor.offset_of(location)?);
        closest_function_name_in(tree, self.processor.text(), byte)
    }

    /// Like [`closest_function_name`](Self::closest_function_name), but over
    /// standalone source text that is not the tracked document.
    pub fn closest_function_name_in_source(
        &self,
        source: &str,
        location: Location,
    ) -> Result<Option<String>, SyntaxError> {
        let Some(tree) = self.processor.parse_source(source)? else {
            return Ok(None);
        };
        let Some(byte) = byte_offset_in(source, location) else {
            return Ok(None);
        };
        Ok(closest_function_name_in(&tree, source, byte))
    }

    /// Expression nodes on `location`'s line that span the location itself,
    /// sorted ascending by end offset.
    ///
    /// At a shared end offset the enclosing expression sorts first (stable
    /// sort over pre-order), so hovering the `value` of `c.value` yields the
    /// member expression before the bare property name.
    pub fn find_best_match_expressions(&self, location: Location) -> Vec<ExpressionMatch> {
        let Some(tree) = self.processor.tree() else {
            return Vec::new();
        };
        let Some(offset) = self.processor.offset_of(location) else {
            return Vec::new();
        };
        let Some((line_from, line_to)) = self.processor.line_byte_range(location.line) else {
            return Vec::new();
        };
        let byte = self.processor.char_to_byte(offset);
        let text = self.processor.text();

        let mut out: Vec<ExpressionMatch> = TreeWalk::clipped(tree.root_node(), line_from, line_to)
            .filter(|node| EXPRESSION_NODE_KINDS.contains(&node.kind()))
            .filter(|node| node.start_byte() <= byte && byte <= node.end_byte())
            .map(|node| ExpressionMatch {
                text: node_text(node, text).to_string(),
                node_kind: node.kind().to_string(),
                span: self.span_of(node),
            })
            .collect();
        out.sort_by_key(|m| m.span.to);
        out
    }

    /// Lines that are lexically in scope at `location`.
    ///
    /// The innermost function containing the location, plus everything it
    /// contains, stays in scope; every other function's lines are excluded.
    /// Without a parse tree every line is considered in scope.
    pub fn in_scope_lines(&self, location: Location) -> Vec<usize> {
        let line_count = self.processor.line_count();
        let Some(tree) = self.processor.tree() else {
            return (0..line_count).collect();
        };

        // All function extents, in tree (pre)order: outer before inner.
        let spans: Vec<SymbolSpan> = TreeWalk::new(tree.root_node())
            .filter(|node| FUNCTION_NODE_KINDS.contains(&node.kind()))
            .map(|node| self.span_of(node))
            .collect();

        let contains = |span: &SymbolSpan| span.start <= location && location <= span.end;

        // The last containing span in preorder is the innermost one.
        let innermost = spans.iter().rev().find(|span| contains(span)).copied();
        let in_inner = |span: &SymbolSpan| match innermost {
            Some(inner) => inner.start <= span.start && span.end <= inner.end,
            None => false,
        };

        let mut excluded: Vec<(usize, usize)> = spans
            .iter()
            .filter(|span| !contains(span) && !in_inner(span))
            .map(|span| (span.start.line, span.end.line))
            .collect();
        excluded.sort_unstable();

        // Merge overlapping excluded line ranges, then invert.
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in excluded {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let mut out = Vec::new();
        let mut next = 0usize;
        for (start, end) in merged {
            out.extend(next..start.min(line_count));
            next = next.max(end + 1);
        }
        out.extend(next..line_count);
        out
    }

    /// References to the given scope bindings, starting at `location`,
    /// grouped by lexical nesting level.
    ///
    /// `scopes` lists the scope chain innermost first; the result holds one
    /// map per processed level, in the same order. Each level is resolved
    /// independently against the nearest enclosing node of its kind, so the
    /// same name bound at several levels yields a record at each. The search
    /// stops after the first [`ScopeKind::Function`] level.
    pub fn binding_references(
        &self,
        location: Location,
        scopes: &[ScopeLevel],
    ) -> Vec<BTreeMap<String, BindingRecord>> {
        let mut out = Vec::new();
        let Some(tree) = self.processor.tree() else {
            return out;
        };
        let Some(offset) = self.processor.offset_of(location) else {
            return out;
        };
        let byte = self.processor.char_to_byte(offset);
        let text = self.processor.text();
        let root = tree.root_node();
        let Some(mut anchor) = root.descendant_for_byte_range(byte, byte) else {
            return out;
        };

        for scope in scopes {
            let scope_node = ancestor_scope(anchor, root, scope.kind);
            let mut level: BTreeMap<String, BindingRecord> = BTreeMap::new();
            for node in TreeWalk::new(scope_node) {
                if node.kind() != "identifier" && node.kind() != "shorthand_property_identifier" {
                    continue;
                }
                let name = node_text(node, text);
                if !scope.bindings.iter().any(|b| b == name) {
                    continue;
                }
                let record: &mut BindingRecord = level.entry(name.to_string()).or_default();
                record.refs.push(BindingReference {
                    span: self.span_of(node),
                    path: self.member_path(node),
                });
            }
            out.push(level);
            anchor = scope_node;
            if scope.kind == ScopeKind::Function {
                break;
            }
        }
        out
    }

    fn span_of(&self, node: Node<'_>) -> SymbolSpan {
        SymbolSpan {
            start: self.processor.location_of_byte(node.start_byte()),
            end: self.processor.location_of_byte(node.end_byte()),
            from: self.processor.byte_to_char(node.start_byte()),
            to: self.processor.byte_to_char(node.end_byte()),
        }
    }

    fn member_path(&self, node: Node<'_>) -> Vec<PropertyStep> {
        let text = self.processor.text();
        let mut path = Vec::new();
        let mut cur = node;
        while let Some(parent) = cur.parent() {
            if parent.kind() != "member_expression" {
                break;
            }
            // Only follow the chain while we are on the object side.
            if parent.child_by_field_name("object").map(|o| o.id()) != Some(cur.id()) {
                break;
            }
            if let Some(prop) = parent.child_by_field_name("property") {
                path.push(PropertyStep {
                    property: node_text(prop, text).to_string(),
                    from: self.processor.byte_to_char(prop.start_byte()),
                    to: self.processor.byte_to_char(prop.end_byte()),
                });
            }
            cur = parent;
        }
        path
    }
}

fn node_text<'a>(node: Node<'_>, text: &'a str) -> &'a str {
    text.get(node.byte_range()).unwrap_or_default()
}

/// Name of a function node: its `name` field, or the variable, property, or
/// field it is assigned to. `None` for a truly anonymous function.
fn function_name(node: Node<'_>, text: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, text).to_string());
    }
    let parent = node.parent()?;
    let named_by = match parent.kind() {
        "variable_declarator" => parent.child_by_field_name("name"),
        "pair" => parent.child_by_field_name("key"),
        "assignment_expression" => parent.child_by_field_name("left"),
        "field_definition" | "public_field_definition" => parent.child_by_field_name("property"),
        _ => None,
    }?;
    Some(node_text(named_by, text).to_string())
}

fn class_name(node: Node<'_>, text: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, text).to_string());
    }
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" => parent
            .child_by_field_name("name")
            .map(|n| node_text(n, text).to_string()),
        "assignment_expression" => parent
            .child_by_field_name("left")
            .map(|n| node_text(n, text).to_string()),
        _ => None,
    }
}

fn parameter_names(node: Node<'_>, text: &str) -> Vec<String> {
    let Some(params) = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
    else {
        return Vec::new();
    };
    if params.kind() == "formal_parameters" {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .map(|p| node_text(p, text).to_string())
            .collect()
    } else {
        // Arrow shorthand: a single bare parameter.
        vec![node_text(params, text).to_string()]
    }
}

fn enclosing_class_name(node: Node<'_>, text: &str) -> Option<String> {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if CLASS_NODE_KINDS.contains(&n.kind()) {
            return class_name(n, text);
        }
        cur = n.parent();
    }
    None
}

fn closest_function_name_in(tree: &Tree, text: &str, byte: usize) -> Option<String> {
    let node = tree.root_node().descendant_for_byte_range(byte, byte)?;
    let mut cur = Some(node);
    while let Some(n) = cur {
        if FUNCTION_NODE_KINDS.contains(&n.kind()) {
            return Some(function_name(n, text).unwrap_or_default());
        }
        cur = n.parent();
    }
    None
}

/// Nearest ancestor of `node` matching the scope kind, defaulting to `root`.
fn ancestor_scope<'t>(node: Node<'t>, root: Node<'t>, kind: ScopeKind) -> Node<'t> {
    let wanted: &[&str] = match kind {
        ScopeKind::Function => FUNCTION_NODE_KINDS,
        ScopeKind::Block => &["statement_block"],
        ScopeKind::Other => &[],
    };
    let mut cur = node.parent();
    while let Some(n) = cur {
        if wanted.contains(&n.kind()) {
            return n;
        }
        cur = n.parent();
    }
    root
}

fn byte_offset_in(source: &str, location: Location) -> Option<usize> {
    let mut offset = 0usize;
    for (i, line) in source.split('\n').enumerate() {
        if i == location.line {
            let column_byte = line
                .char_indices()
                .nth(location.column)
                .map(|(b, _)| b)
                .unwrap_or(line.len());
            return Some(offset + column_byte);
        }
        offset += line.len() + 1;
    }
    None
}
