//! Cursor-based pre-order tree traversal.
//!
//! Symbol queries walk whole subtrees, which can be large; [`TreeWalk`] is a
//! plain iterator so callers can process nodes in bounded batches (cooperative
//! scheduling) without changing the visit order, and [`BatchedWalk`] wraps it
//! with a yield hook invoked every `yield_every` nodes. The visited node
//! sequence is identical with or without yields.

use tree_sitter::Node;

/// Pre-order iterator over a subtree, optionally clipped to a byte range.
///
/// Clipping prunes descent: subtrees that do not intersect the range are
/// skipped entirely, and non-intersecting nodes are not yielded.
pub struct TreeWalk<'t> {
    cursor: tree_sitter::TreeCursor<'t>,
    done: bool,
    clip: Option<(usize, usize)>,
}

impl<'t> TreeWalk<'t> {
    /// Walk the whole subtree rooted at `node`.
    pub fn new(node: Node<'t>) -> Self {
        Self {
            cursor: node.walk(),
            done: false,
            clip: None,
        }
    }

    /// Walk only nodes intersecting the byte range `from..to`.
    pub fn clipped(node: Node<'t>, from_byte: usize, to_byte: usize) -> Self {
        Self {
            cursor: node.walk(),
            done: false,
            clip: Some((from_byte, to_byte)),
        }
    }

    fn intersects(&self, node: Node<'t>) -> bool {
        match self.clip {
            Some((from, to)) => node.start_byte() < to && node.end_byte() > from,
            None => true,
        }
    }

    /// Move the cursor past `current` without descending into it.
    fn skip_subtree(&mut self) -> bool {
        loop {
            if self.cursor.goto_next_sibling() {
                return true;
            }
            if !self.cursor.goto_parent() {
                self.done = true;
                return false;
            }
        }
    }
}

impl<'t> Iterator for TreeWalk<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        loop {
            if self.done {
                return None;
            }
            let node = self.cursor.node();
            let visit = self.intersects(node);

            // Advance: descend when the subtree may hold intersecting nodes,
            // otherwise skip over it.
            if visit {
                if !self.cursor.goto_first_child() {
                    self.skip_subtree();
                }
                return Some(node);
            }
            self.skip_subtree();
        }
    }
}

/// A [`TreeWalk`] that invokes a yield hook every `yield_every` nodes.
pub struct BatchedWalk<'t, F: FnMut()> {
    inner: TreeWalk<'t>,
    yield_every: usize,
    since_yield: usize,
    on_yield: F,
}

impl<'t, F: FnMut()> BatchedWalk<'t, F> {
    /// Wrap a walk with a cooperative yield hook.
    pub fn new(inner: TreeWalk<'t>, yield_every: usize, on_yield: F) -> Self {
        Self {
            inner,
            yield_every: yield_every.max(1),
            since_yield: 0,
            on_yield,
        }
    }
}

impl<'t, F: FnMut()> Iterator for BatchedWalk<'t, F> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let node = self.inner.next()?;
        self.since_yield += 1;
        if self.since_yield >= self.yield_every {
            self.since_yield = 0;
            (self.on_yield)();
        }
        Some(node)
    }
}
