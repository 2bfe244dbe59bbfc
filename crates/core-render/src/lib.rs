//! The display engine: a two-buffer differential renderer for the
//! prompt plus input line over a fixed-width cell grid.
//!
//! - [`display_line`]: parsing input into display lines (vertical wrap
//!   or a horizontal window), scroll markers, column bookkeeping.
//! - [`diff`]: the minimal per-line update between the previous and
//!   the next frame.
//! - [`manager`]: frame pair ownership, mode selection, the visible
//!   window, the suggestion overlay, and cursor parking.
//! - [`writer`]: the terminal op model and the display accumulator
//!   that emits a whole redraw in one write.
//! - [`faces`]: face bytes and the SGR palette.

pub mod diff;
pub mod display_line;
pub mod faces;
pub mod manager;
pub mod writer;

pub use diff::{CursorState, update_line};
pub use display_line::{DisplayLine, DisplayLines, adjust_columns};
pub use faces::{
    FACE_HINT, FACE_INPUT, FACE_MODMARK, FACE_NORMAL, FACE_SCROLL, FACE_SELECTION,
    FACE_SUGGESTION, FacePalette,
};
pub use manager::{DisplayManager, FrameInput, SUGGESTION_HINT};
pub use writer::{DisplayAccumulator, TermOp};
