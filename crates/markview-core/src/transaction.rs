//! Structured document change transactions.
//!
//! A [`Transaction`] is the unit of change flowing out of
//! [`TextBuffer`](crate::TextBuffer) mutations and into every incremental
//! consumer: the decoration engine remaps anchors through it, the syntax
//! provider applies it as tree edits, and the session recompiles search state
//! after it. Edits are expressed in **character offsets** (Unicode scalar
//! values).

/// A single text edit expressed in character offsets.
///
/// Semantics:
/// - `start` is a character offset in the document **at the time this edit is applied**.
/// - The deleted range is defined by the length (in `char`s) of `deleted_text`.
/// - Edits inside a [`Transaction`] must be applied **in order** to transform
///   the "before" document into the "after" document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEdit {
    /// Start character offset of the edit.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TransactionEdit {
    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end character offset in the pre-edit document.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }
}

/// Which side a mapped position sticks to when text is inserted exactly at it,
/// or where it lands when its surrounding text is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before insertions at the position; collapse to the deletion start.
    Before,
    /// Move after insertions at the position; collapse to the deletion end
    /// (i.e. the start of the replacement text's end).
    After,
}

/// A structured description of a document text change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Character count before applying `edits`.
    pub before_char_count: usize,
    /// Character count after applying `edits`.
    pub after_char_count: usize,
    /// Ordered list of edits that transforms the "before" document into the
    /// "after" document.
    pub edits: Vec<TransactionEdit>,
}

impl Transaction {
    /// Returns `true` if this transaction contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Map a pre-transaction character offset to its post-transaction position.
    ///
    /// Positions strictly inside a deleted range collapse to the deletion
    /// boundary chosen by `assoc`. Positions exactly at an edit start follow
    /// `assoc` across the inserted text.
    pub fn map_offset(&self, offset: usize, assoc: Assoc) -> usize {
        let mut mapped = offset;
        for edit in &self.edits {
            mapped = map_through(mapped, edit, assoc);
        }
        mapped
    }
}

fn map_through(offset: usize, edit: &TransactionEdit, assoc: Assoc) -> usize {
    let deleted = edit.deleted_len();
    let inserted = edit.inserted_len();

    if offset < edit.start {
        return offset;
    }
    if offset == edit.start {
        return match assoc {
            Assoc::Before => edit.start,
            Assoc::After => edit.start + inserted,
        };
    }
    if offset >= edit.start + deleted {
        return offset - deleted + inserted;
    }
    // Strictly inside the deleted range.
    match assoc {
        Assoc::Before => edit.start,
        Assoc::After => edit.start + inserted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tx(start: usize, deleted: &str, inserted: &str, before: usize) -> Transaction {
        let deleted_len = deleted.chars().count();
        let inserted_len = inserted.chars().count();
        Transaction {
            before_char_count: before,
            after_char_count: before - deleted_len + inserted_len,
            edits: vec![TransactionEdit {
                start,
                deleted_text: deleted.to_string(),
                inserted_text: inserted.to_string(),
            }],
        }
    }

    #[test]
    fn test_map_offset_before_edit_unchanged() {
        let t = tx(5, "", "abc", 10);
        assert_eq!(t.map_offset(3, Assoc::Before), 3);
        assert_eq!(t.map_offset(3, Assoc::After), 3);
    }

    #[test]
    fn test_map_offset_after_edit_shifts() {
        let t = tx(2, "xy", "longer", 10);
        // Net change: -2 + 6 = +4.
        assert_eq!(t.map_offset(8, Assoc::Before), 12);
    }

    #[test]
    fn test_map_offset_at_insertion_point_follows_assoc() {
        let t = tx(4, "", "ins", 10);
        assert_eq!(t.map_offset(4, Assoc::Before), 4);
        assert_eq!(t.map_offset(4, Assoc::After), 7);
    }

    #[test]
    fn test_map_offset_inside_deletion_collapses() {
        let t = tx(2, "abcd", "", 10);
        assert_eq!(t.map_offset(4, Assoc::Before), 2);
        assert_eq!(t.map_offset(4, Assoc::After), 2);

        let t = tx(2, "abcd", "Z", 10);
        assert_eq!(t.map_offset(4, Assoc::Before), 2);
        assert_eq!(t.map_offset(4, Assoc::After), 3);
    }

    #[test]
    fn test_map_offset_through_multiple_edits() {
        let t = Transaction {
            before_char_count: 20,
            after_char_count: 22,
            edits: vec![
                TransactionEdit {
                    start: 0,
                    deleted_text: String::new(),
                    inserted_text: "ab".to_string(),
                },
                TransactionEdit {
                    start: 12,
                    deleted_text: "xx".to_string(),
                    inserted_text: "yy".to_string(),
                },
            ],
        };
        // 10 shifts by the first insert, lands at the second edit's start.
        assert_eq!(t.map_offset(10, Assoc::Before), 12);
        assert_eq!(t.map_offset(15, Assoc::Before), 17);
    }
}
