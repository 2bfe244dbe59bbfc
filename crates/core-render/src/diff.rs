//! Per-line differential update.
//!
//! Transforms one previously drawn display line into its replacement
//! with a minimal op sequence: skip identical lines, walk in from both
//! ends over characters and faces (on multibyte boundaries, ignoring
//! trailing default-face spaces), measure the column delta of the
//! middle segments, then open or delete cells and reprint only the
//! middle.

use crate::display_line::DisplayLine;
use crate::faces::FACE_NORMAL;
use crate::writer::TermOp;
use core_text::str_cell_width;

/// On-screen cursor tracking across update calls. Rows are relative to
/// the top of the edit area.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorState {
    pub v_pos: i32,
    pub c_pos: u32,
}

impl CursorState {
    pub fn move_vert(&mut self, row: i32, ops: &mut Vec<TermOp>) {
        if row > self.v_pos {
            ops.push(TermOp::MoveDown((row - self.v_pos) as u32));
        } else if row < self.v_pos {
            ops.push(TermOp::MoveUp((self.v_pos - row) as u32));
        }
        self.v_pos = row;
    }

    pub fn move_col(&mut self, col: u32, ops: &mut Vec<TermOp>) {
        if col == self.c_pos {
            return;
        }
        if col == 0 {
            ops.push(TermOp::CarriageReturn);
        } else {
            ops.push(TermOp::MoveToCol(col));
        }
        self.c_pos = col;
    }
}

fn measure_cols(bytes: &[u8]) -> u32 {
    match std::str::from_utf8(bytes) {
        Ok(s) => str_cell_width(s) as u32,
        Err(_) => bytes.len() as u32,
    }
}

/// Open (`delta > 0`) or close (`delta < 0`) cells at the cursor.
fn shift_cols(delta: i32, ops: &mut Vec<TermOp>) {
    if delta > 0 {
        ops.push(TermOp::InsertChars(delta as u32));
    } else if delta < 0 {
        ops.push(TermOp::DeleteChars((-delta) as u32));
    }
}

/// Update one display row from `old` to `new`.
///
/// `row` is the absolute display row of the line; `wrapped` reports
/// whether the previous row ended exactly at the right margin (the
/// pending autowrap latch). Returns the latch for the next row.
pub fn update_line(
    old: Option<&DisplayLine>,
    new: &DisplayLine,
    row: i32,
    width: u32,
    wrapped: bool,
    cursor: &mut CursorState,
    ops: &mut Vec<TermOp>,
) -> bool {
    let mut lcol = new.x;
    let mut lind = 0usize;
    let mut rind = new.len();
    let mut delta = 0i32;

    if let Some(o) = old
        && o.same_as(new)
    {
        return false;
    }

    if let Some(o) = old
        && new.x <= o.x
    {
        // Left walk: advance while characters and faces agree, on
        // multibyte boundaries.
        let stop = o.len().min(new.len());
        let mut p = 0usize;
        if let Ok(s) = std::str::from_utf8(&new.chars[..stop]) {
            for c in s.chars() {
                let q = p + c.len_utf8();
                if new.chars[p..q] != o.chars[p..q] || new.faces[p..q] != o.faces[p..q] {
                    break;
                }
                lcol += str_cell_width(&s[p..q]) as u32;
                p = q;
            }
        }
        lind = p;

        // Ignore trailing spaces in the normal face.
        let mut oc2 = o.len();
        while oc2 > lind && o.chars[oc2 - 1] == b' ' && o.faces[oc2 - 1] == FACE_NORMAL {
            oc2 -= 1;
        }
        let mut dc2 = new.len();
        while dc2 > lind && new.chars[dc2 - 1] == b' ' && new.faces[dc2 - 1] == FACE_NORMAL {
            dc2 -= 1;
        }

        // Right walk: peel equal clusters from the tail.
        while oc2 > lind && dc2 > lind {
            let oback = core_text::prev_char_boundary(&o.chars[..oc2], oc2);
            let dback = core_text::prev_char_boundary(&new.chars[..dc2], dc2);
            if oc2 - oback != dc2 - dback {
                break;
            }
            if o.chars[oback..oc2] != new.chars[dback..dc2]
                || o.faces[oback..oc2] != new.faces[dback..dc2]
            {
                break;
            }
            oc2 = oback;
            dc2 = dback;
        }

        let olen = oc2 - lind;
        rind = dc2;

        // Column delta decides between opening cells and deleting.
        let dcols = measure_cols(&new.chars[lind..dc2]);
        if oc2 < o.len() {
            let ocols = measure_cols(&o.chars[lind..lind + olen]);
            delta = dcols as i32 - ocols as i32;
        }
    }

    if wrapped && delta == 0 && lcol == 0 && new.x == 0 && row == cursor.v_pos + 1 {
        // Commit the pending autowrap: print one space and return to
        // column 0 so the terminal's wrap latch is cleared.
        ops.push(TermOp::Pad(1));
        ops.push(TermOp::CarriageReturn);
        cursor.v_pos += 1;
        cursor.c_pos = 0;
    } else {
        cursor.move_vert(row, ops);

        if let Some(o) = old
            && o.x > new.x
        {
            cursor.move_col(new.x, ops);
            shift_cols(new.x as i32 - o.x as i32, ops);
        }

        cursor.move_col(lcol, ops);
        shift_cols(delta, ops);
    }

    if rind > lind {
        ops.push(TermOp::Print {
            chars: new.chars[lind..rind].to_vec(),
            faces: new.faces[lind..rind].to_vec(),
        });
    }
    cursor.c_pos = lcol + measure_cols(&new.chars[lind..rind]);

    // Clear anything left over from the old line. Pad spaces carry the
    // normal face, so plain spaces suffice.
    if let Some(o) = old
        && rind == new.len()
        && new.lastcol < o.lastcol
    {
        let erase = o.lastcol - new.lastcol;
        ops.push(TermOp::Pad(erase));
        cursor.c_pos += erase;
    }

    // A fresh line (no old content) may sit on top of stale cells.
    if old.is_none() {
        ops.push(TermOp::ClearToEol);
    }

    if cursor.c_pos == width && new.scroll_mark < 0 {
        ops.push(TermOp::CarriageReturn);
        cursor.c_pos = 0;
    }

    cursor.c_pos == width
}
