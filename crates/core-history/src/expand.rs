//! History-designator expansion seam.
//!
//! Expansion of `!`-style designators is delegated to a collaborator;
//! the database only exposes the "given a line, return the expanded
//! line plus a status" operation, and the quote-aware inhibition rule
//! driven by `history.expand_mode`.

pub use core_config::ExpandMode;

/// Outcome of expanding a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandResult {
    /// No designators found; the line is unchanged.
    Unchanged,
    /// Designators were expanded.
    Expanded,
    /// A designator failed to resolve.
    Error,
    /// The expansion should be displayed and re-edited, not executed.
    DisplayOnly,
}

pub trait Expander {
    fn expand(&self, line: &str) -> (ExpandResult, String);
}

/// Expander that performs no expansion.
pub struct NoExpansion;

impl Expander for NoExpansion {
    fn expand(&self, line: &str) -> (ExpandResult, String) {
        (ExpandResult::Unchanged, line.to_string())
    }
}

/// Whether expansion of the designator at `marker_pos` is inhibited by
/// the `history.expand_mode` quote rules.
pub fn expansion_inhibited(line: &str, marker_pos: usize, mode: ExpandMode) -> bool {
    match mode {
        ExpandMode::Off => return true,
        ExpandMode::On => return false,
        _ => {}
    }

    // Which kind of quote is the marker inside of, if any?
    let mut in_quote = 0u8;
    for (i, b) in line.bytes().enumerate() {
        if i >= marker_pos {
            break;
        }
        if b == b'\'' || b == b'"' {
            in_quote = if in_quote == b { 0 } else { b };
        }
    }

    match mode {
        ExpandMode::NotSquoted => in_quote == b'\'',
        ExpandMode::NotDquoted => in_quote == b'"',
        ExpandMode::NotQuoted => in_quote == b'\'' || in_quote == b'"',
        ExpandMode::Off | ExpandMode::On => unreachable!(),
    }
}
