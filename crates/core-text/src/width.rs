//! Code-point display width.
//!
//! A single authoritative function `cell_width` returns the terminal
//! column width (0, 1, or 2) for a code point. The table is the
//! `unicode-width` baseline plus explicit override ranges:
//!
//! Width precedence order:
//! 1. Combining marks in the known ranges report 0.
//! 2. Regional indicators and the primary pictographic blocks report 2
//!    (the baseline under-reports some of these on older terminals;
//!    over-estimation costs a blank cell, under-estimation causes
//!    rendering drift).
//! 3. `unicode-width` baseline.
//!
//! Table version: Unicode 15.1 ranges. Update procedure: adjust the
//! range constants below, extend `width_table_consistency`, and re-run
//! the conformance tests.

use unicode_width::UnicodeWidthChar;

/// Terminal column width of one code point: 0, 1, or 2.
pub fn cell_width(c: char) -> u8 {
    if is_combining_mark(c) {
        return 0;
    }
    if is_regional_indicator(c) || is_wide_pictographic(c) {
        return 2;
    }
    UnicodeWidthChar::width(c).unwrap_or(0).min(2) as u8
}

/// Sum of `cell_width` over a string slice.
pub fn str_cell_width(s: &str) -> usize {
    s.chars().map(|c| cell_width(c) as usize).sum()
}

// Combining mark ranges commonly encountered (subset).
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{1AB0}'..='\u{1AFF}').contains(&c)
        || ('\u{1DC0}'..='\u{1DFF}').contains(&c)
        || ('\u{20D0}'..='\u{20FF}').contains(&c)
        || ('\u{FE20}'..='\u{FE2F}').contains(&c)
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

// Primary emoji blocks; Misc Symbols / Dingbats stay at baseline width
// because many of those render narrow in Windows consoles.
fn is_wide_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicode_segmentation::UnicodeSegmentation;

    #[test]
    fn ascii_is_single() {
        for c in ' '..='~' {
            assert_eq!(cell_width(c), 1, "{c:?}");
        }
    }

    #[test]
    fn cjk_is_double() {
        assert_eq!(cell_width('漢'), 2);
        assert_eq!(cell_width('カ'), 2);
    }

    #[test]
    fn combining_is_zero() {
        assert_eq!(cell_width('\u{0301}'), 0);
        assert_eq!(str_cell_width("e\u{0301}"), 1);
    }

    #[test]
    fn pictographic_is_double() {
        assert_eq!(cell_width('\u{1F600}'), 2);
        assert_eq!(cell_width('\u{1F1E6}'), 2);
    }

    #[test]
    fn width_table_consistency() {
        // Override ranges must never yield a width above 2 and must be
        // disjoint from each other.
        for c in ['\u{0300}', '\u{20D0}', '\u{1F300}', '\u{1F1FF}'] {
            assert!(cell_width(c) <= 2);
        }
        assert!(!is_combining_mark('\u{1F300}'));
        assert!(!is_wide_pictographic('\u{0300}'));
    }

    #[test]
    fn grapheme_sum_matches_char_sum() {
        let s = "ab漢e\u{0301}";
        let by_char = str_cell_width(s);
        let by_grapheme: usize = s.graphemes(true).map(str_cell_width).sum();
        assert_eq!(by_char, by_grapheme);
    }
}
