//! Display lines: the parsed form of prompt + input over a cell grid.
//!
//! Each display line owns its rendered bytes and a parallel face byte
//! per rendered byte, plus column bookkeeping:
//!
//! - `start`/`end`: the byte span of the input buffer covered;
//! - `x`/`lastcol`: starting and ending cell columns;
//! - `lead`: columns in the leading (continuation) region;
//! - `trail`: columns of pad spaces appended to reach the wrap margin;
//! - `newline`: the line ended at an explicit `\n`;
//! - `scroll_mark`: `+1` left marker, `-1` right marker, `0` none.

use crate::faces::{FACE_NORMAL, FACE_SCROLL};
use core_text::{cell_width, is_ctrl_display};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLine {
    pub chars: Vec<u8>,
    pub faces: Vec<u8>,
    pub start: usize,
    pub end: usize,
    pub x: u32,
    pub lastcol: u32,
    pub lead: u32,
    pub trail: u32,
    pub newline: bool,
    pub scroll_mark: i8,
}

impl DisplayLine {
    pub fn new(start: usize) -> Self {
        Self {
            start,
            end: start,
            ..Self::default()
        }
    }

    pub fn append(&mut self, c: u8, face: u8) {
        self.chars.push(c);
        self.faces.push(face);
        self.trail = 0;
    }

    pub fn append_str(&mut self, s: &[u8], face: u8) {
        for &c in s {
            self.append(c, face);
        }
    }

    /// A pad space column past `lastcol` (up to the wrap margin).
    pub fn append_space(&mut self) {
        self.chars.push(b' ');
        self.faces.push(FACE_NORMAL);
        self.trail += 1;
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Identical content check used by the diff to skip a line.
    pub fn same_as(&self, other: &DisplayLine) -> bool {
        self.x == other.x && self.chars == other.chars && self.faces == other.faces
    }
}

/// A parsed frame: one display line per output row, plus where the
/// cursor landed (`vpos` row, `cpos` column).
#[derive(Debug, Clone, Default)]
pub struct DisplayLines {
    pub lines: Vec<DisplayLine>,
    pub prompt_botlin: u32,
    pub vpos: usize,
    pub cpos: u32,
    pub horz_start: usize,
    pub horz_scroll: bool,
}

impl DisplayLines {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.prompt_botlin = 0;
        self.vpos = 0;
        self.cpos = 0;
        self.horz_start = 0;
        self.horz_scroll = false;
    }

    pub fn count(&self) -> usize {
        self.lines.len()
    }

    fn push_line(&mut self, start: usize) -> usize {
        self.lines.push(DisplayLine::new(start));
        self.lines.len() - 1
    }

    /// Lay the buffer onto a grid of `width` columns (vertical mode).
    ///
    /// `col` is the column after the prompt's last line; `face_at`
    /// supplies the face byte per input byte index. Newlines start a
    /// new display line only when the terminal can move the cursor up
    /// (otherwise they render as `^J`).
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        &mut self,
        prompt_botlin: u32,
        col: u32,
        buffer: &str,
        point: usize,
        width: u32,
        can_cursor_up: bool,
        face_at: &dyn Fn(usize) -> u8,
    ) {
        debug_assert!(col < width);
        self.clear();

        self.prompt_botlin = prompt_botlin;
        for _ in 0..prompt_botlin {
            self.push_line(0);
        }

        let mut col = col;
        let mut di = self.push_line(0);
        self.lines[di].x = col;
        self.vpos = prompt_botlin as usize;
        self.cpos = col;

        let bytes = buffer.as_bytes();

        for (index, c) in buffer.char_indices() {
            let char_len = c.len_utf8();
            let next_index = index + char_len;

            if c == '\n' && can_cursor_up {
                self.lines[di].lastcol = col;
                self.lines[di].end = index;
                self.lines[di].newline = true;

                if index == point {
                    self.vpos = di;
                    self.cpos = col;
                }

                di = self.push_line(next_index);
                col = 0;
                continue;
            }

            if char_len == 1 && is_ctrl_display(bytes[index]) {
                // Control characters render as the two-cell `^X` form.
                let face = face_at(index);
                let display = core_text::ctrl_display(bytes[index]);

                if index == point {
                    self.vpos = di;
                    self.cpos = col;
                }

                let mut wrapped = false;
                for (n, &add) in display.iter().enumerate() {
                    if col >= width {
                        self.lines[di].lastcol = col;
                        self.lines[di].end = index;
                        wrapped = true;
                        di = self.push_line(index);
                        col = 0;
                        if n == 0 && index == point {
                            self.vpos = di;
                            self.cpos = col;
                        }
                    }
                    self.lines[di].append(add, face);
                    col += 1;
                }
                if wrapped {
                    self.lines[di].lead = col;
                }
                continue;
            }

            let wc = cell_width(c) as u32;

            if col + wc > width {
                // Wrap: pad the current line to the margin and start a
                // fresh one at column 0.
                self.lines[di].lastcol = col;
                self.lines[di].end = index;
                while col < width {
                    self.lines[di].append_space();
                    col += 1;
                }
                debug_assert!(self.lines[di].lead <= self.lines[di].lastcol);
                debug_assert!(self.lines[di].lastcol + self.lines[di].trail == width);
                di = self.push_line(index);
                col = 0;
            }

            if index <= point && point < next_index {
                self.vpos = di;
                self.cpos = col;
            }

            for off in index..next_index {
                self.lines[di].append(bytes[off], face_at(index));
            }
            col += wc;
        }

        let index = buffer.len();
        self.lines[di].lastcol = col;
        self.lines[di].end = index;

        if self.lines[di].lastcol + self.lines[di].trail >= width {
            debug_assert!(self.lines[di].lastcol == width);
            debug_assert!(self.lines[di].trail == 0);
            di = self.push_line(index);
            self.lines[di].end = index;
            col = 0;
        }

        if index == point {
            self.vpos = di;
            self.cpos = col;
        }
    }

    /// Single-line windowed layout (horizontal mode). `prev` supplies
    /// the previous window so small cursor motions keep the view
    /// stable; the window scrolls by a stride of `width/3` left and
    /// two strides right.
    #[allow(clippy::too_many_arguments)]
    pub fn horz_parse(
        &mut self,
        prompt_botlin: u32,
        col: u32,
        buffer: &str,
        point: usize,
        width: u32,
        prev: &DisplayLines,
        face_at: &dyn Fn(usize) -> u8,
    ) {
        debug_assert!(col < width);
        self.clear();
        self.horz_start = prev.horz_start.min(buffer.len());
        while !buffer.is_char_boundary(self.horz_start) {
            self.horz_start -= 1;
        }

        self.prompt_botlin = prompt_botlin;
        for _ in 0..prompt_botlin {
            self.push_line(0);
        }

        let stride = ((width / 3) as i32).max(1);
        let limit = width.saturating_sub(2); // `>` marker plus a space

        // Scroll the window so the point stays visible.
        if point < self.horz_start {
            self.horz_start = point;
            adjust_columns(&mut self.horz_start, -stride, buffer);
        } else {
            let range = limit as i32 - if self.horz_start != 0 { 1 } else { col as i32 };
            let mut end = self.horz_start;
            if range > 0 && adjust_columns(&mut end, range, buffer) && point >= end {
                self.horz_start = point;
                if !adjust_columns(&mut self.horz_start, -stride * 2, buffer) {
                    self.horz_start = next_char(buffer, self.horz_start);
                }
            }
        }

        let mut col = col;
        let di = self.push_line(self.horz_start);
        self.horz_scroll = true;

        if self.horz_start > 0 {
            self.lines[di].x = 0;
            self.lines[di].lead = 1;
            self.lines[di].append(b'<', FACE_SCROLL);
            self.lines[di].scroll_mark = 1;
            col = 1;
        } else {
            self.lines[di].x = col;
        }
        self.vpos = prompt_botlin as usize;
        self.cpos = col;

        let bytes = buffer.as_bytes();
        let mut overflow = false;
        let mut last_index = self.horz_start;

        for (rel_index, c) in buffer[self.horz_start..].char_indices() {
            let index = self.horz_start + rel_index;
            let char_len = c.len_utf8();

            if char_len == 1 && is_ctrl_display(bytes[index]) {
                if index == point {
                    self.cpos = col;
                }
                let face = face_at(index);
                let display = core_text::ctrl_display(bytes[index]);
                let mut stop = false;
                for &add in &display {
                    if col >= limit {
                        stop = true;
                        break;
                    }
                    self.lines[di].append(add, face);
                    col += 1;
                }
                if stop {
                    overflow = true;
                    break;
                }
                last_index = index + 1;
                continue;
            }

            let wc = cell_width(c) as u32;
            if col + wc > limit {
                overflow = true;
                break;
            }

            if index == point {
                self.cpos = col;
            }

            for off in index..index + char_len {
                self.lines[di].append(bytes[off], face_at(index));
            }
            col += wc;
            last_index = index + char_len;
        }

        self.lines[di].lastcol = col;
        self.lines[di].end = last_index;

        if overflow || last_index < buffer.len() {
            self.lines[di].append(b'>', FACE_SCROLL);
            self.lines[di].scroll_mark = -1;
            self.lines[di].lastcol += 1;
        }

        if point >= last_index && point <= buffer.len() && !overflow {
            self.cpos = col;
        }
    }

    /// Replace edge cells of the visible window with `<`/`>` markers.
    /// Runs on the *next* frame before diffing so the diff emits them.
    pub fn apply_scroll_markers(&mut self, top: usize, bottom: usize, width: u32) {
        debug_assert!(top >= self.prompt_botlin as usize);
        debug_assert!(top <= bottom);
        debug_assert!(top < self.count());

        if top > self.prompt_botlin as usize {
            let d = &mut self.lines[top];
            if d.is_empty() {
                d.append(b'<', FACE_SCROLL);
                d.scroll_mark = 1;
            } else if let Some((char_start, char_len, wc)) = first_visible_char(&d.chars) {
                // Replace the first cluster with `<` plus pad spaces
                // for any extra columns it occupied.
                let mut rebuilt = Vec::with_capacity(d.chars.len());
                let mut faces = Vec::with_capacity(d.faces.len());
                rebuilt.push(b'<');
                faces.push(FACE_SCROLL);
                for _ in 1..wc {
                    rebuilt.push(b' ');
                    faces.push(FACE_NORMAL);
                }
                rebuilt.extend_from_slice(&d.chars[char_start + char_len..]);
                faces.extend_from_slice(&d.faces[char_start + char_len..]);
                d.chars = rebuilt;
                d.faces = faces;
                d.scroll_mark = 1;
            }
        }

        if bottom + 1 < self.count() {
            let d = &mut self.lines[bottom];
            if d.lastcol - d.x > 2 {
                // Truncate until `>` fits inside the right margin.
                for _ in 0..d.trail {
                    d.chars.pop();
                    d.faces.pop();
                }
                d.trail = 0;
                while d.x + d.lastcol >= width {
                    trim_last_cluster(d);
                }
                while d.x + d.lastcol + 2 < width {
                    d.append(b' ', FACE_NORMAL);
                    d.lastcol += 1;
                }
                d.append(b'>', FACE_SCROLL);
                d.scroll_mark = -1;
                d.lastcol += 1;
            }
        }
    }
}

fn next_char(buffer: &str, idx: usize) -> usize {
    core_text::next_char_boundary(buffer.as_bytes(), idx)
}

/// Move `index` by `delta` display columns over `buffer`. Returns true
/// when the full distance was available.
pub fn adjust_columns(index: &mut usize, delta: i32, buffer: &str) -> bool {
    debug_assert!(delta != 0);
    let mut remaining = delta.unsigned_abs();
    let mut moved_all = false;

    if delta < 0 {
        while remaining > 0 && *index > 0 {
            let prev = core_text::prev_char_boundary(buffer.as_bytes(), *index);
            let c = buffer[prev..].chars().next().unwrap_or(' ');
            let w = char_cells(c, buffer.as_bytes(), prev);
            *index = prev;
            if w >= remaining {
                moved_all = true;
                break;
            }
            remaining -= w;
        }
    } else {
        let len = buffer.len();
        while remaining > 0 && *index < len {
            let c = buffer[*index..].chars().next().unwrap_or(' ');
            let w = char_cells(c, buffer.as_bytes(), *index);
            *index += c.len_utf8();
            if w >= remaining {
                moved_all = true;
                break;
            }
            remaining -= w;
        }
    }

    moved_all
}

fn char_cells(c: char, bytes: &[u8], idx: usize) -> u32 {
    if c.len_utf8() == 1 && is_ctrl_display(bytes[idx]) {
        2
    } else {
        cell_width(c) as u32
    }
}

/// The first cluster with nonzero width: (byte start, byte len, width).
fn first_visible_char(chars: &[u8]) -> Option<(usize, usize, u32)> {
    let s = std::str::from_utf8(chars).ok()?;
    for (i, c) in s.char_indices() {
        let w = cell_width(c) as u32;
        if w > 0 {
            return Some((i, c.len_utf8(), w));
        }
    }
    None
}

fn trim_last_cluster(d: &mut DisplayLine) {
    let Ok(s) = std::str::from_utf8(&d.chars) else {
        d.chars.pop();
        d.faces.pop();
        d.lastcol = d.lastcol.saturating_sub(1);
        return;
    };
    if let Some((i, c)) = s.char_indices().next_back() {
        let w = cell_width(c) as u32;
        d.chars.truncate(i);
        d.faces.truncate(i);
        d.lastcol = d.lastcol.saturating_sub(w.max(1));
    }
}
