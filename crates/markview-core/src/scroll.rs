//! Scroll snapshot cache.
//!
//! When the host scrolls, the current position is noted; once scrolling has
//! been quiet for the debounce window, the snapshot is committed against the
//! active document id. On a later swap back to that document, the session
//! restores the snapshot inside the same transaction that sets the text, so
//! the view never flashes at the origin first.
//!
//! The cache owns no timers: the host passes [`Instant`]s into
//! [`note_scroll`](ScrollSnapshotCache::note_scroll) and
//! [`settle`](ScrollSnapshotCache::settle), which gives trailing-edge
//! debounce semantics in a single-threaded, runtime-free engine.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A stable identifier for a document's content across swaps.
pub type DocumentId = String;

/// A captured scroll position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSnapshot {
    /// First visible line at capture time.
    pub top_line: usize,
    /// Character offset anchoring the restore.
    pub anchor_offset: usize,
}

#[derive(Debug)]
struct Pending {
    document_id: DocumentId,
    snapshot: ScrollSnapshot,
    noted_at: Instant,
}

/// Per-document-id scroll snapshot store with trailing-edge debounce.
#[derive(Debug)]
pub struct ScrollSnapshotCache {
    committed: HashMap<DocumentId, ScrollSnapshot>,
    pending: Option<Pending>,
    quiet: Duration,
}

impl ScrollSnapshotCache {
    /// Default quiescence window before a noted scroll commits.
    pub const DEFAULT_QUIET: Duration = Duration::from_millis(250);

    /// Create a cache with the default quiescence window.
    pub fn new() -> Self {
        Self::with_quiet_window(Self::DEFAULT_QUIET)
    }

    /// Create a cache with a custom quiescence window.
    pub fn with_quiet_window(quiet: Duration) -> Self {
        Self {
            committed: HashMap::new(),
            pending: None,
            quiet,
        }
    }

    /// Note a scroll position for `document_id` at time `now`.
    ///
    /// Repeated calls coalesce: only the latest position is kept, and the
    /// quiet window restarts (trailing edge).
    pub fn note_scroll(&mut self, document_id: &str, snapshot: ScrollSnapshot, now: Instant) {
        self.pending = Some(Pending {
            document_id: document_id.to_string(),
            snapshot,
            noted_at: now,
        });
    }

    /// Commit the pending snapshot if the quiet window has elapsed by `now`.
    ///
    /// Returns `true` when a snapshot was committed.
    pub fn settle(&mut self, now: Instant) -> bool {
        let elapsed = match self.pending.as_ref() {
            Some(p) => now.saturating_duration_since(p.noted_at),
            None => return false,
        };
        if elapsed < self.quiet {
            return false;
        }
        // Window elapsed; the checked pending entry is still there.
        if let Some(p) = self.pending.take() {
            self.committed.insert(p.document_id, p.snapshot);
        }
        true
    }

    /// Commit any pending snapshot immediately, bypassing the quiet window.
    ///
    /// Used on document swap so an in-flight scroll for the outgoing document
    /// is not lost.
    pub fn flush(&mut self) {
        if let Some(p) = self.pending.take() {
            self.committed.insert(p.document_id, p.snapshot);
        }
    }

    /// The committed snapshot for `document_id`, if any.
    pub fn get(&self, document_id: &str) -> Option<ScrollSnapshot> {
        self.committed.get(document_id).copied()
    }

    /// Drop the committed snapshot for `document_id`.
    pub fn remove(&mut self, document_id: &str) {
        self.committed.remove(document_id);
    }

    /// Drop everything, pending included.
    pub fn clear(&mut self) {
        self.committed.clear();
        self.pending = None;
    }

    /// Number of committed snapshots.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Returns `true` if no snapshots are committed.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

impl Default for ScrollSnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
