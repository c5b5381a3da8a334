//! Viewport tracking and visibility tests.
//!
//! A [`Viewport`] is the host-reported rendered range: an inclusive character
//! range plus a horizontal column window. It is ephemeral derived state; the
//! engine reads the current viewport on every recompute instead of subscribing
//! to scroll events (pull model).

use crate::buffer::{Location, TextBuffer};
use unicode_width::UnicodeWidthChar;

/// Lines within this distance of a viewport edge scroll with `Nearest`
/// alignment; farther targets are centered.
pub const MAX_VERTICAL_OFFSET: usize = 3;

/// Vertical alignment of a scroll target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Bring the target just inside the nearest edge.
    Nearest,
    /// Center the target line in the viewport.
    Center,
}

/// A request for the host to move the viewport.
///
/// The engine never scrolls; it hands the host an anchor plus a suggested
/// placement and lets the render layer apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Character offset of the scroll target.
    pub anchor: usize,
    /// Vertical alignment the host should apply.
    pub align: Align,
    /// Suggested new first visible line under `align`.
    pub top_line: usize,
    /// Suggested new first visible column, when the target is horizontally
    /// out of the window.
    pub left_column: Option<usize>,
}

/// The host-reported rendered range of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// First rendered character offset (inclusive).
    pub from: usize,
    /// Last rendered character offset (inclusive). [`Viewport::anchored`]
    /// sets this to the end-of-content offset of the bottom rendered line,
    /// so decorations anchored at that line's end stay in range.
    pub to: usize,
    /// First visible visual column.
    pub left_column: usize,
    /// Width of the visible window in visual columns. `0` disables the
    /// horizontal bound (nothing is horizontally clipped).
    pub width_columns: usize,
    /// Tab stop width used for visual column projection.
    pub tab_width: usize,
}

impl Viewport {
    /// Create a viewport covering `from..=to` with no horizontal clipping.
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            left_column: 0,
            width_columns: 0,
            tab_width: 4,
        }
    }

    /// Set the horizontal window.
    pub fn with_horizontal(mut self, left_column: usize, width_columns: usize) -> Self {
        self.left_column = left_column;
        self.width_columns = width_columns;
        self
    }

    /// Set the tab stop width for visual column projection.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Create a viewport whose first visible line is `top_line`, spanning
    /// `height_lines` lines, clamped to the document.
    pub fn anchored(buffer: &TextBuffer, top_line: usize, height_lines: usize) -> Self {
        let last_line = buffer.line_count().saturating_sub(1);
        let top = top_line.min(last_line);
        let bottom = top.saturating_add(height_lines.max(1) - 1).min(last_line);
        // Lines clamped to the document always resolve.
        let from = buffer.offset_at(top, 0).unwrap_or(0);
        let to = buffer
            .offset_at(bottom, buffer.line_len(bottom))
            .unwrap_or(buffer.len_chars());
        Self::new(from, to)
    }

    /// First fully or partially rendered line.
    pub fn start_line(&self, buffer: &TextBuffer) -> usize {
        buffer.location_at(self.from).line
    }

    /// Last rendered line (inclusive).
    pub fn end_line(&self, buffer: &TextBuffer) -> usize {
        buffer.location_at(self.to).line
    }

    /// Inclusive rendered line range.
    pub fn line_range(&self, buffer: &TextBuffer) -> (usize, usize) {
        (self.start_line(buffer), self.end_line(buffer))
    }

    /// Viewport height in lines.
    pub fn height_lines(&self, buffer: &TextBuffer) -> usize {
        let (start, end) = self.line_range(buffer);
        end - start + 1
    }

    /// Returns `true` if `offset` falls inside the rendered character range.
    /// Both bounds are inclusive.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.from && offset <= self.to
    }

    /// Returns `true` if the position is rendered **and** inside the
    /// horizontal window.
    ///
    /// A position on a loaded line that is horizontally scrolled out of the
    /// window counts as invisible.
    pub fn is_visible(&self, buffer: &TextBuffer, line: usize, column: usize) -> bool {
        let (start, end) = self.line_range(buffer);
        if line < start || line > end || line >= buffer.line_count() {
            return false;
        }
        if self.width_columns == 0 {
            return true;
        }
        let Some(text) = buffer.line_text(line) else {
            return false;
        };
        let x = visual_column(&text, column, self.tab_width);
        x >= self.left_column && x < self.left_column + self.width_columns
    }

    /// Compute the scroll needed to reveal `target`, or `None` when it is
    /// already visible.
    ///
    /// Targets within [`MAX_VERTICAL_OFFSET`] lines of the nearest rendered
    /// edge get `Nearest` alignment (the view slides just far enough);
    /// anything farther is centered.
    pub fn scroll_into_view(&self, buffer: &TextBuffer, target: Location) -> Option<ScrollRequest> {
        let line_count = buffer.line_count();
        let line = target.line.min(line_count.saturating_sub(1));
        let column = target.column.min(buffer.line_len(line));
        if self.is_visible(buffer, line, column) {
            return None;
        }

        // Clamped line always resolves.
        let anchor = buffer.offset_at(line, column).unwrap_or(buffer.len_chars());
        let (start, end) = self.line_range(buffer);
        let height = end - start + 1;

        let near = line + MAX_VERTICAL_OFFSET >= start && line <= end + MAX_VERTICAL_OFFSET;
        let (align, top_line) = if line >= start && line <= end {
            // Vertically visible already; only the horizontal window moves.
            (Align::Nearest, start)
        } else if near {
            let top = if line < start {
                line
            } else {
                (line + 1).saturating_sub(height)
            };
            (Align::Nearest, top)
        } else {
            (Align::Center, line.saturating_sub(height / 2))
        };

        let left_column = if self.width_columns == 0 {
            None
        } else {
            let text = buffer.line_text(line).unwrap_or_default();
            let x = visual_column(&text, column, self.tab_width);
            if x < self.left_column {
                Some(x)
            } else if x >= self.left_column + self.width_columns {
                Some((x + 1).saturating_sub(self.width_columns))
            } else {
                None
            }
        };

        Some(ScrollRequest {
            anchor,
            align,
            top_line,
            left_column,
        })
    }
}

/// Project a character column to a visual column.
///
/// Tabs advance to the next tab stop; other characters contribute their
/// Unicode display width (CJK and other wide characters count as 2 cells).
pub fn visual_column(line_text: &str, column: usize, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    let mut x = 0usize;
    for ch in line_text.chars().take(column) {
        if ch == '\t' {
            x = (x / tab_width + 1) * tab_width;
        } else {
            x += UnicodeWidthChar::width(ch).unwrap_or(0);
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ten_lines() -> TextBuffer {
        TextBuffer::new("l0\nl1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9")
    }

    fn viewport_lines(buffer: &TextBuffer, top: usize, height: usize) -> Viewport {
        Viewport::anchored(buffer, top, height)
    }

    #[test]
    fn test_visual_column_counts_wide_chars_and_tabs() {
        assert_eq!(visual_column("日本語", 2, 4), 4);
        assert_eq!(visual_column("\tx", 1, 4), 4);
        assert_eq!(visual_column("ab\tc", 3, 4), 4);
    }

    #[test]
    fn test_contains_offset_bounds_are_inclusive() {
        let buffer = ten_lines();
        let vp = viewport_lines(&buffer, 2, 3); // lines 2..=4
        // `from` is the start of line 2, `to` the end of line 4's content.
        assert_eq!(vp.from, buffer.offset_at(2, 0).unwrap());
        assert_eq!(vp.to, buffer.offset_at(4, 2).unwrap());
        assert!(!vp.contains_offset(vp.from - 1));
        assert!(vp.contains_offset(vp.from));
        assert!(vp.contains_offset(vp.to));
        assert!(!vp.contains_offset(vp.to + 1));
        assert_eq!(vp.end_line(&buffer), 4);
    }

    #[test]
    fn test_is_visible_vertical_bounds() {
        let buffer = ten_lines();
        let vp = viewport_lines(&buffer, 2, 4);
        assert!(!vp.is_visible(&buffer, 1, 0));
        assert!(vp.is_visible(&buffer, 2, 0));
        assert!(vp.is_visible(&buffer, 5, 0));
        assert!(!vp.is_visible(&buffer, 6, 0));
    }

    #[test]
    fn test_is_visible_horizontal_window() {
        let buffer = TextBuffer::new("abcdefghij\nshort");
        let vp = Viewport::new(0, buffer.len_chars()).with_horizontal(4, 4);
        assert!(!vp.is_visible(&buffer, 0, 3));
        assert!(vp.is_visible(&buffer, 0, 4));
        assert!(vp.is_visible(&buffer, 0, 7));
        assert!(!vp.is_visible(&buffer, 0, 8));
    }

    #[test]
    fn test_scroll_into_view_none_when_visible() {
        let buffer = ten_lines();
        let vp = viewport_lines(&buffer, 0, 5);
        assert_eq!(vp.scroll_into_view(&buffer, Location::new(3, 0)), None);
    }

    #[test]
    fn test_scroll_into_view_nearest_within_offset() {
        let buffer = ten_lines();
        let vp = viewport_lines(&buffer, 3, 3); // lines 3..=5
        // Line 7 is 2 past the bottom edge: nearest alignment.
        let req = vp.scroll_into_view(&buffer, Location::new(7, 0)).unwrap();
        assert_eq!(req.align, Align::Nearest);
        assert_eq!(req.top_line, 5);
        // Line 1 is 2 above the top edge: nearest alignment.
        let req = vp.scroll_into_view(&buffer, Location::new(1, 0)).unwrap();
        assert_eq!(req.align, Align::Nearest);
        assert_eq!(req.top_line, 1);
    }

    #[test]
    fn test_scroll_into_view_centers_far_targets() {
        let buffer = ten_lines();
        let vp = viewport_lines(&buffer, 0, 3); // lines 0..=2
        let req = vp.scroll_into_view(&buffer, Location::new(9, 0)).unwrap();
        assert_eq!(req.align, Align::Center);
        assert_eq!(req.top_line, 8);
    }

    #[test]
    fn test_scroll_into_view_horizontal_only() {
        let buffer = TextBuffer::new("abcdefghijklmnop");
        let vp = Viewport::new(0, buffer.len_chars()).with_horizontal(0, 4);
        let req = vp.scroll_into_view(&buffer, Location::new(0, 9)).unwrap();
        assert_eq!(req.align, Align::Nearest);
        assert_eq!(req.left_column, Some(6));
    }
}
