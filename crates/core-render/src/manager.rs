//! Frame assembly and reconciliation.
//!
//! Holds the (current, next) display-frame pair. Each redraw parses
//! the prompt + input (+ suggestion overlay) into the next frame,
//! chooses vertical or horizontal mode, computes the visible window
//! and its scroll markers, diffs against the current frame, and swaps.

use crate::diff::{CursorState, update_line};
use crate::display_line::DisplayLines;
use crate::faces::{
    FACE_HINT, FACE_INPUT, FACE_MODMARK, FACE_NORMAL, FACE_SELECTION, FACE_SUGGESTION,
};
use crate::writer::TermOp;
use core_text::str_cell_width;
use tracing::trace;

/// The usage hint appended after an active suggestion when it fits.
pub const SUGGESTION_HINT: &str = "[Right]-Accept Suggestion";

/// Everything one redraw needs to know.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput<'a> {
    /// The last line of the prompt (earlier lines scroll away
    /// naturally and are not repainted).
    pub prompt: &'a str,
    pub buffer: &'a str,
    /// Cursor byte offset into `buffer`.
    pub point: usize,
    /// Selection byte range within `buffer`, highlit with the
    /// selection face.
    pub selection: Option<(usize, usize)>,
    /// Ghost text appended after the input; display-only.
    pub suggestion_tail: Option<&'a str>,
    pub show_hint: bool,
    /// Prefix a `*` marker before the prompt.
    pub modified_mark: bool,
    pub force_horizontal: bool,
}

pub struct DisplayManager {
    curr: DisplayLines,
    next: DisplayLines,
    width: u32,
    /// Rows the input window may occupy (`terminal.max_input_rows`,
    /// resolved; scrolling with markers covers the overflow).
    max_rows: u32,
    /// Rows the screen has; needing more than this flips to the
    /// horizontal window.
    screen_rows: u32,
    can_cursor_up: bool,
    top: usize,
    visible_rows: usize,
    was_horizontal: bool,
    cursor: CursorState,
}

impl DisplayManager {
    pub fn new(width: u32, max_rows: u32, screen_rows: u32) -> Self {
        let screen_rows = screen_rows.max(1);
        Self {
            curr: DisplayLines::default(),
            next: DisplayLines::default(),
            width: width.max(2),
            max_rows: max_rows.clamp(1, screen_rows),
            screen_rows,
            can_cursor_up: true,
            top: 0,
            visible_rows: 0,
            was_horizontal: false,
            cursor: CursorState::default(),
        }
    }

    pub fn set_can_cursor_up(&mut self, can: bool) {
        self.can_cursor_up = can;
    }

    /// Forget everything drawn; the next render repaints from scratch.
    pub fn on_new_line(&mut self) {
        self.curr.clear();
        self.top = 0;
        self.visible_rows = 0;
        self.was_horizontal = false;
        self.cursor = CursorState::default();
    }

    pub fn resize(&mut self, width: u32, max_rows: u32, screen_rows: u32) {
        let screen_rows = screen_rows.max(1);
        let max_rows = max_rows.clamp(1, screen_rows);
        if width.max(2) != self.width || max_rows != self.max_rows || screen_rows != self.screen_rows
        {
            self.width = width.max(2);
            self.max_rows = max_rows;
            self.screen_rows = screen_rows;
            self.on_new_line();
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Produce the ops transforming the displayed frame into `input`.
    pub fn render(&mut self, input: &FrameInput<'_>, ops: &mut Vec<TermOp>) {
        // Compose the display string: marker + prompt + input +
        // suggestion overlay + hint. The overlay bytes never count as
        // input; faces are assigned by region.
        let mut display = String::new();
        if input.modified_mark {
            display.push('*');
        }
        let mark_len = display.len();
        display.push_str(input.prompt);
        let base = display.len();
        display.push_str(input.buffer);
        let input_end = display.len();

        let suggesting =
            input.suggestion_tail.is_some_and(|t| !t.is_empty()) && input.point == input.buffer.len();
        if !input.force_horizontal
            && suggesting
            && let Some(tail) = input.suggestion_tail
        {
            display.push_str(tail);
        }
        let sugg_end = display.len();

        let mut hint_text_start = display.len();
        if !input.force_horizontal && suggesting && input.show_hint {
            let col = (str_cell_width(&display) as u32) % self.width;
            let hint_cols = str_cell_width(SUGGESTION_HINT) as u32 + 1;
            if col + hint_cols < self.width {
                let pad = self.width - col - hint_cols;
                for _ in 0..pad {
                    display.push(' ');
                }
                hint_text_start = display.len();
                display.push_str(SUGGESTION_HINT);
            }
        }

        let selection = input
            .selection
            .map(|(a, b)| (base + a.min(b), base + a.max(b)));
        let face_at = move |idx: usize| -> u8 {
            if idx < mark_len {
                FACE_MODMARK
            } else if idx < base {
                FACE_NORMAL
            } else if idx < input_end {
                match selection {
                    Some((a, b)) if idx >= a && idx < b => FACE_SELECTION,
                    _ => FACE_INPUT,
                }
            } else if idx < sugg_end {
                FACE_SUGGESTION
            } else if idx < hint_text_start {
                FACE_NORMAL
            } else {
                FACE_HINT
            }
        };

        let point = base + input.point;

        // Vertical parse decides whether the frame fits; overflow (or
        // an explicit request, or a single-row window) flips to the
        // horizontal window.
        self.next.parse(
            0,
            0,
            &display,
            point,
            self.width,
            self.can_cursor_up,
            &face_at,
        );
        let horizontal = input.force_horizontal
            || self.max_rows == 1
            || self.next.count() > self.screen_rows as usize;
        if horizontal {
            let prev = if self.was_horizontal {
                self.curr.clone()
            } else {
                DisplayLines::default()
            };
            // The overlay is not shown in the single-line window.
            let display_h = &display[..input_end];
            self.next
                .horz_parse(0, 0, display_h, point, self.width, &prev, &face_at);
        }

        // Visible window and scroll markers (vertical only).
        let count = self.next.count();
        let rows = self.max_rows as usize;
        let mut top = self.top.min(count.saturating_sub(1));
        if horizontal || count <= rows {
            top = 0;
        } else {
            if self.next.vpos < top {
                top = self.next.vpos;
            }
            if self.next.vpos >= top + rows {
                top = self.next.vpos + 1 - rows;
            }
            top = top.min(count - rows);
        }
        let bottom = (top + rows).min(count) - 1;
        if !horizontal && count > rows {
            self.next.apply_scroll_markers(top, bottom, self.width);
        }

        // A mode flip or a shifted window invalidates row pairing;
        // repaint the whole window.
        if horizontal != self.was_horizontal || top != self.top {
            self.curr.clear();
        }

        // Reconcile overlapping rows, threading the autowrap latch.
        let mut wrapped = false;
        for i in top..=bottom {
            let row = (i - top) as i32;
            let old = self.curr.lines.get(i);
            let new = &self.next.lines[i];
            wrapped = update_line(
                old,
                new,
                row,
                self.width,
                wrapped,
                &mut self.cursor,
                ops,
            );
        }

        // Erase surplus rows left over from a taller frame.
        let new_visible = bottom + 1 - top;
        for row in new_visible..self.visible_rows {
            self.cursor.move_vert(row as i32, ops);
            self.cursor.move_col(0, ops);
            ops.push(TermOp::ClearToEol);
        }

        // Park the cursor at the input point.
        let crow = self.next.vpos.saturating_sub(top) as i32;
        self.cursor.move_vert(crow, ops);
        self.cursor.move_col(self.next.cpos, ops);

        trace!(
            target: "render",
            rows = new_visible,
            top,
            horizontal,
            ops = ops.len(),
            "frame_reconciled"
        );

        self.top = top;
        self.visible_rows = new_visible;
        self.was_horizontal = horizontal;
        std::mem::swap(&mut self.curr, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_once(mgr: &mut DisplayManager, prompt: &str, buffer: &str, point: usize) -> Vec<TermOp> {
        let mut ops = Vec::new();
        mgr.render(
            &FrameInput {
                prompt,
                buffer,
                point,
                ..Default::default()
            },
            &mut ops,
        );
        ops
    }

    fn printed(ops: &[TermOp]) -> Vec<u8> {
        let mut out = Vec::new();
        for op in ops {
            if let TermOp::Print { chars, .. } = op {
                out.extend_from_slice(chars);
            }
        }
        out
    }

    #[test]
    fn first_render_paints_prompt_and_input() {
        let mut mgr = DisplayManager::new(80, 10, 30);
        let ops = render_once(&mut mgr, "> ", "dir", 3);
        assert_eq!(printed(&ops), b"> dir");
    }

    #[test]
    fn minimal_diff_on_mid_line_insert() {
        let mut mgr = DisplayManager::new(80, 10, 30);
        render_once(&mut mgr, "> ", "abc def", 7);
        let ops = render_once(&mut mgr, "> ", "abc  def", 8);
        assert!(ops.contains(&TermOp::InsertChars(1)), "{ops:?}");
        assert_eq!(printed(&ops), b" ");
    }

    #[test]
    fn unchanged_frame_emits_no_prints() {
        let mut mgr = DisplayManager::new(80, 10, 30);
        render_once(&mut mgr, "> ", "dir", 3);
        let ops = render_once(&mut mgr, "> ", "dir", 3);
        assert_eq!(printed(&ops), b"");
    }

    #[test]
    fn suggestion_overlay_painted_with_suggestion_face() {
        let mut mgr = DisplayManager::new(80, 10, 30);
        let mut ops = Vec::new();
        mgr.render(
            &FrameInput {
                prompt: "> ",
                buffer: "git sta",
                point: 7,
                suggestion_tail: Some("tus"),
                ..Default::default()
            },
            &mut ops,
        );
        let all = printed(&ops);
        assert!(all.windows(10).any(|w| w == b"git status"));
        // Ghost bytes carry the suggestion face.
        let faces: Vec<u8> = ops
            .iter()
            .filter_map(|op| match op {
                TermOp::Print { faces, .. } => Some(faces.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert!(faces.contains(&FACE_SUGGESTION));
    }

    #[test]
    fn hint_is_right_aligned_when_it_fits() {
        let mut mgr = DisplayManager::new(60, 10, 30);
        let mut ops = Vec::new();
        mgr.render(
            &FrameInput {
                prompt: "> ",
                buffer: "gi",
                point: 2,
                suggestion_tail: Some("t status"),
                show_hint: true,
                ..Default::default()
            },
            &mut ops,
        );
        let all = printed(&ops);
        let text = String::from_utf8_lossy(&all);
        assert!(text.contains(SUGGESTION_HINT));
        // Right-aligned: the full row ends exactly at the margin.
        let row_width = str_cell_width(text.trim_end_matches('\n'));
        assert_eq!(row_width as u32, mgr.width() - 1);
    }

    #[test]
    fn cursor_parked_at_point_not_after_overlay() {
        let mut mgr = DisplayManager::new(80, 10, 30);
        let mut ops = Vec::new();
        mgr.render(
            &FrameInput {
                prompt: "> ",
                buffer: "gi",
                point: 2,
                suggestion_tail: Some("t status"),
                ..Default::default()
            },
            &mut ops,
        );
        // The last op parks the cursor at the end of the typed input
        // (column 4: two prompt cells + two input cells).
        assert_eq!(*ops.last().unwrap(), TermOp::MoveToCol(4));
    }

    #[test]
    fn long_input_scrolls_vertically_with_markers() {
        let mut mgr = DisplayManager::new(10, 2, 30);
        let buffer = "a".repeat(45);
        let ops = render_once(&mut mgr, "> ", &buffer, 45);
        // 47 cells over width 10 = 5 rows; only 2 visible. The top
        // visible row starts with the `<` marker.
        let all = printed(&ops);
        assert!(all.contains(&b'<'), "{:?}", String::from_utf8_lossy(&all));
        let _ = ops;
    }

    #[test]
    fn single_row_window_uses_horizontal_mode() {
        let mut mgr = DisplayManager::new(20, 1, 30);
        let buffer = "0123456789abcdefghij";
        let ops = render_once(&mut mgr, "> ", buffer, 20);
        let all = printed(&ops);
        // Scrolled left: the window starts with the `<` marker.
        assert_eq!(all[0], b'<');
    }

    #[test]
    fn shrinking_frame_erases_surplus_rows() {
        let mut mgr = DisplayManager::new(10, 5, 30);
        let long = "x".repeat(25);
        render_once(&mut mgr, "> ", &long, 25);
        let ops = render_once(&mut mgr, "> ", "x", 1);
        assert!(ops.contains(&TermOp::ClearToEol), "{ops:?}");
    }
}
