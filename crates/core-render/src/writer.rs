//! Terminal command abstraction and the display accumulator.
//!
//! The diff emits [`TermOp`] values; the accumulator renders them into
//! one byte buffer and hands it to the output writer in a single call,
//! so a whole redraw reaches the terminal in one OS write (no visible
//! tearing mid-frame).

use crate::faces::{FACE_NORMAL, FacePalette};
use anyhow::Result;
use crossterm::{
    cursor::{MoveDown, MoveToColumn, MoveUp},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::Write;

/// One terminal operation produced by the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOp {
    MoveUp(u32),
    MoveDown(u32),
    MoveToCol(u32),
    CarriageReturn,
    /// Styled text: rendered bytes with a parallel face byte each.
    Print { chars: Vec<u8>, faces: Vec<u8> },
    /// `n` spaces in the normal face.
    Pad(u32),
    /// Open `n` blank cells at the cursor (ICH).
    InsertChars(u32),
    /// Delete `n` cells at the cursor (DCH).
    DeleteChars(u32),
    ClearToEol,
}

/// Collects ops for one redraw and writes them in a single call.
pub struct DisplayAccumulator {
    ops: Vec<TermOp>,
}

impl Default for DisplayAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayAccumulator {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: TermOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[TermOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<TermOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render all queued ops into `out` and flush once.
    pub fn flush_to<W: Write>(&mut self, out: &mut W, palette: &FacePalette) -> Result<()> {
        let mut buf: Vec<u8> = Vec::with_capacity(256);
        for op in self.ops.drain(..) {
            emit(&mut buf, &op, palette)?;
        }
        out.write_all(&buf)?;
        out.flush()?;
        Ok(())
    }
}

fn emit(buf: &mut Vec<u8>, op: &TermOp, palette: &FacePalette) -> Result<()> {
    match op {
        TermOp::MoveUp(n) => queue!(buf, MoveUp(*n as u16))?,
        TermOp::MoveDown(n) => queue!(buf, MoveDown(*n as u16))?,
        TermOp::MoveToCol(n) => queue!(buf, MoveToColumn(*n as u16))?,
        TermOp::CarriageReturn => queue!(buf, Print('\r'))?,
        TermOp::Print { chars, faces } => {
            emit_faced(buf, chars, faces, palette)?;
        }
        TermOp::Pad(n) => {
            for _ in 0..*n {
                buf.push(b' ');
            }
        }
        TermOp::InsertChars(n) => {
            buf.extend_from_slice(format!("\x1b[{n}@").as_bytes());
        }
        TermOp::DeleteChars(n) => {
            buf.extend_from_slice(format!("\x1b[{n}P").as_bytes());
        }
        TermOp::ClearToEol => queue!(buf, Clear(ClearType::UntilNewLine))?,
    }
    Ok(())
}

/// Write the bytes as runs of equal face, switching SGR per run and
/// resetting afterwards.
fn emit_faced(buf: &mut Vec<u8>, chars: &[u8], faces: &[u8], palette: &FacePalette) -> Result<()> {
    debug_assert_eq!(chars.len(), faces.len());
    let mut i = 0;
    let mut styled = false;
    while i < chars.len() {
        let face = faces[i];
        let mut j = i + 1;
        while j < chars.len() && faces[j] == face {
            j += 1;
        }
        if face == FACE_NORMAL {
            if styled {
                buf.extend_from_slice(b"\x1b[m");
                styled = false;
            }
        } else {
            buf.extend_from_slice(format!("\x1b[{}m", palette.sgr_params(face)).as_bytes());
            styled = true;
        }
        buf.extend_from_slice(&chars[i..j]);
        i = j;
    }
    if styled {
        buf.extend_from_slice(b"\x1b[m");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faces::{FACE_INPUT, FACE_SUGGESTION};
    use core_config::ColourSettings;

    #[test]
    fn single_write_per_flush() {
        struct CountingWriter {
            writes: usize,
            bytes: Vec<u8>,
        }
        impl Write for CountingWriter {
            fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
                self.writes += 1;
                self.bytes.extend_from_slice(data);
                Ok(data.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut acc = DisplayAccumulator::new();
        acc.push(TermOp::CarriageReturn);
        acc.push(TermOp::Print {
            chars: b"dir".to_vec(),
            faces: vec![FACE_INPUT; 3],
        });
        acc.push(TermOp::ClearToEol);

        let mut out = CountingWriter {
            writes: 0,
            bytes: Vec::new(),
        };
        let palette = FacePalette::from_settings(&ColourSettings::default());
        acc.flush_to(&mut out, &palette).unwrap();
        assert_eq!(out.writes, 1);
        assert!(out.bytes.windows(3).any(|w| w == b"dir"));
        assert!(acc.is_empty());
    }

    #[test]
    fn face_runs_emit_sgr_switches() {
        let mut buf = Vec::new();
        let palette = FacePalette::from_settings(&ColourSettings::default());
        emit_faced(
            &mut buf,
            b"abXY",
            &[FACE_INPUT, FACE_INPUT, FACE_SUGGESTION, FACE_SUGGESTION],
            &palette,
        )
        .unwrap();
        let s = String::from_utf8(buf).unwrap();
        // Two SGR switches plus the trailing reset.
        assert_eq!(s.matches("\x1b[").count(), 3);
        assert!(s.ends_with("\x1b[m"));
        assert!(s.contains("ab"));
        assert!(s.contains("XY"));
    }

    #[test]
    fn insert_and_delete_sequences() {
        let mut buf = Vec::new();
        let palette = FacePalette::from_settings(&ColourSettings::default());
        emit(&mut buf, &TermOp::InsertChars(3), &palette).unwrap();
        emit(&mut buf, &TermOp::DeleteChars(2), &palette).unwrap();
        assert_eq!(buf, b"\x1b[3@\x1b[2P");
    }
}
