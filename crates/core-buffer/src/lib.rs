//! In-memory edit buffer for one edit cycle.
//!
//! A `LineBuffer` owns the input line, the cursor, an optional anchor
//! (selection), an undo-group stack, and a needs-redraw flag. Editing
//! operations outside an explicit undo group are atomic for undo.
//!
//! Invariants:
//! - `0 <= cursor <= len`, and cursor sits on a UTF-8 boundary.
//! - When an anchor is set, `0 <= anchor <= len` on a UTF-8 boundary.
//! - One snapshot is captured per top-level undo group, taken lazily at
//!   the first mutation inside the group.

use core_text::{next_char_boundary, prev_char_boundary};
use tracing::trace;

/// Maximum number of undo snapshots retained per edit cycle.
pub const UNDO_HISTORY_MAX: usize = 200;

#[derive(Clone)]
struct EditSnapshot {
    text: String,
    cursor: usize,
}

#[derive(Default)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
    anchor: Option<usize>,
    undo_stack: Vec<EditSnapshot>,
    group_depth: u32,
    group_snapshot_taken: bool,
    need_draw: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let cursor = text.len();
        Self {
            text: text.to_string(),
            cursor,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        let clamped = self.clamp_boundary(cursor);
        if clamped != self.cursor {
            self.cursor = clamped;
            self.need_draw = true;
        }
    }

    pub fn set_anchor(&mut self, anchor: usize) {
        self.anchor = Some(self.clamp_boundary(anchor));
        self.need_draw = true;
    }

    pub fn clear_anchor(&mut self) {
        if self.anchor.take().is_some() {
            self.need_draw = true;
        }
    }

    /// Insert `s` at the cursor; the cursor ends after the insertion.
    pub fn insert(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.capture_for_undo();
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        if let Some(a) = self.anchor
            && a > self.cursor - s.len()
        {
            self.anchor = Some(a + s.len());
        }
        self.need_draw = true;
    }

    /// Remove the byte range `[start, end)`, clamped to boundaries.
    pub fn remove(&mut self, start: usize, end: usize) {
        let start = self.clamp_boundary(start);
        let end = self.clamp_boundary(end);
        if start >= end {
            return;
        }
        self.capture_for_undo();
        self.text.replace_range(start..end, "");
        let removed = end - start;
        if self.cursor > end {
            self.cursor -= removed;
        } else if self.cursor > start {
            self.cursor = start;
        }
        if let Some(a) = self.anchor {
            self.anchor = Some(if a > end {
                a - removed
            } else {
                a.min(start)
            });
        }
        self.need_draw = true;
    }

    /// Replace the whole line, leaving the cursor at the end.
    pub fn replace_all(&mut self, s: &str) {
        self.capture_for_undo();
        self.text.clear();
        self.text.push_str(s);
        self.cursor = self.text.len();
        self.anchor = None;
        self.need_draw = true;
    }

    /// Reset for a fresh edit cycle, discarding text and undo history.
    pub fn reset(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.anchor = None;
        self.undo_stack.clear();
        self.group_depth = 0;
        self.group_snapshot_taken = false;
        self.need_draw = true;
    }

    pub fn begin_undo_group(&mut self) {
        if self.group_depth == 0 {
            self.group_snapshot_taken = false;
        }
        self.group_depth += 1;
    }

    pub fn end_undo_group(&mut self) {
        debug_assert!(self.group_depth > 0);
        self.group_depth = self.group_depth.saturating_sub(1);
        if self.group_depth == 0 {
            self.group_snapshot_taken = false;
        }
    }

    /// Pop the most recent snapshot, restoring text and cursor.
    pub fn undo(&mut self) -> bool {
        if let Some(snap) = self.undo_stack.pop() {
            trace!(target: "buffer", depth = self.undo_stack.len(), "undo_pop");
            self.text = snap.text;
            self.cursor = snap.cursor.min(self.text.len());
            self.anchor = None;
            self.need_draw = true;
            true
        } else {
            false
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn set_need_draw(&mut self) {
        self.need_draw = true;
    }

    /// Read and clear the redraw flag.
    pub fn take_need_draw(&mut self) -> bool {
        std::mem::replace(&mut self.need_draw, false)
    }

    /// Cursor motion helpers used by acceptance actions.
    pub fn next_boundary(&self, idx: usize) -> usize {
        next_char_boundary(self.text.as_bytes(), idx)
    }

    pub fn prev_boundary(&self, idx: usize) -> usize {
        prev_char_boundary(self.text.as_bytes(), idx)
    }

    fn clamp_boundary(&self, idx: usize) -> usize {
        let idx = idx.min(self.text.len());
        if self.text.is_char_boundary(idx) {
            idx
        } else {
            core_text::floor_char_boundary(self.text.as_bytes(), idx)
        }
    }

    fn capture_for_undo(&mut self) {
        if self.group_depth > 0 {
            if self.group_snapshot_taken {
                return;
            }
            self.group_snapshot_taken = true;
        }
        self.undo_stack.push(EditSnapshot {
            text: self.text.clone(),
            cursor: self.cursor,
        });
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            self.undo_stack.remove(0);
        }
        trace!(target: "buffer", depth = self.undo_stack.len(), "undo_snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_moves_cursor() {
        let mut b = LineBuffer::new();
        b.insert("echo");
        assert_eq!(b.text(), "echo");
        assert_eq!(b.cursor(), 4);
    }

    #[test]
    fn remove_adjusts_cursor_and_anchor() {
        let mut b = LineBuffer::from_text("abcdef");
        b.set_anchor(5);
        b.set_cursor(6);
        b.remove(1, 3);
        assert_eq!(b.text(), "adef");
        assert_eq!(b.cursor(), 4);
        assert_eq!(b.anchor(), Some(3));
    }

    #[test]
    fn ungrouped_edits_undo_individually() {
        let mut b = LineBuffer::new();
        b.insert("a");
        b.insert("b");
        assert!(b.undo());
        assert_eq!(b.text(), "a");
        assert!(b.undo());
        assert_eq!(b.text(), "");
        assert!(!b.undo());
    }

    #[test]
    fn grouped_edits_undo_atomically() {
        let mut b = LineBuffer::from_text("dir ");
        b.begin_undo_group();
        b.remove(0, 4);
        b.insert("pushd ");
        b.end_undo_group();
        assert_eq!(b.text(), "pushd ");
        assert!(b.undo());
        assert_eq!(b.text(), "dir ");
        assert_eq!(b.undo_depth(), 0);
    }

    #[test]
    fn nested_groups_take_one_snapshot() {
        let mut b = LineBuffer::new();
        b.begin_undo_group();
        b.insert("x");
        b.begin_undo_group();
        b.insert("y");
        b.end_undo_group();
        b.insert("z");
        b.end_undo_group();
        assert_eq!(b.undo_depth(), 1);
        assert!(b.undo());
        assert_eq!(b.text(), "");
    }

    #[test]
    fn cursor_clamps_to_boundary() {
        let mut b = LineBuffer::from_text("a漢b");
        b.set_cursor(2); // inside 漢
        assert_eq!(b.cursor(), 1);
        b.set_cursor(99);
        assert_eq!(b.cursor(), 5);
    }

    #[test]
    fn need_draw_latches() {
        let mut b = LineBuffer::new();
        assert!(!b.take_need_draw());
        b.insert("q");
        assert!(b.take_need_draw());
        assert!(!b.take_need_draw());
    }
}
