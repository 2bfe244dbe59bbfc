//! Needle/match comparison under the configured case mode.
//!
//! `relaxed` additionally treats `-` and `_` as equal; the rule is
//! exactly that (ASCII case folding plus the dash/underscore
//! equivalence), with no wider Unicode folding.

use core_config::CaseMode;

#[inline]
fn fold(c: char, mode: CaseMode) -> char {
    match mode {
        CaseMode::Off => c,
        CaseMode::On => c.to_ascii_lowercase(),
        CaseMode::Relaxed => {
            if c == '-' {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        }
    }
}

/// Whether two strings compare equal under `mode`.
pub fn compare_eq(a: &str, b: &str, mode: CaseMode) -> bool {
    a.len() == b.len()
        && a.chars()
            .zip(b.chars())
            .all(|(x, y)| fold(x, mode) == fold(y, mode))
}

/// Byte length of the leading part of `candidate` that matches the
/// whole `needle` under `mode`; None when the needle does not prefix
/// the candidate. Path separators compare exactly.
pub fn match_prefix_len(needle: &str, candidate: &str, mode: CaseMode) -> Option<usize> {
    let mut cand = candidate.char_indices();
    for nc in needle.chars() {
        let (_, cc) = cand.next()?;
        if fold(nc, mode) != fold(cc, mode) {
            return None;
        }
    }
    Some(cand.next().map(|(i, _)| i).unwrap_or(candidate.len()))
}

/// Wildcard match of `pattern` (with `*` and `?`) against `text`.
pub fn wildcard_match(pattern: &str, text: &str, mode: CaseMode) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    wild(&pat, &txt, mode)
}

fn wild(pat: &[char], txt: &[char], mode: CaseMode) -> bool {
    match pat.first() {
        None => txt.is_empty(),
        Some('*') => {
            (0..=txt.len()).any(|skip| wild(&pat[1..], &txt[skip..], mode))
        }
        Some('?') => !txt.is_empty() && wild(&pat[1..], &txt[1..], mode),
        Some(&c) => {
            txt.first()
                .is_some_and(|&t| fold(c, mode) == fold(t, mode))
                && wild(&pat[1..], &txt[1..], mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mode_is_exact() {
        assert!(match_prefix_len("ec", "echo", CaseMode::Off).is_some());
        assert!(match_prefix_len("EC", "echo", CaseMode::Off).is_none());
    }

    #[test]
    fn caseless_mode_folds_ascii() {
        assert_eq!(match_prefix_len("EC", "echo", CaseMode::On), Some(2));
    }

    #[test]
    fn relaxed_equates_dash_and_underscore() {
        assert_eq!(
            match_prefix_len("my-f", "my_file.txt", CaseMode::Relaxed),
            Some(4)
        );
        assert!(match_prefix_len("my-f", "my_file.txt", CaseMode::On).is_none());
    }

    #[test]
    fn prefix_len_is_bytes_of_candidate() {
        // Needle chars may differ in byte length from candidate chars.
        assert_eq!(match_prefix_len("ab", "abc", CaseMode::Off), Some(2));
        assert_eq!(match_prefix_len("abc", "abc", CaseMode::Off), Some(3));
        assert!(match_prefix_len("abcd", "abc", CaseMode::Off).is_none());
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("a*o", "alpha.o", CaseMode::Off));
        assert!(wildcard_match("s*main*", "src/main.rs", CaseMode::Off));
        assert!(!wildcard_match("a?c", "abbc", CaseMode::Off));
        assert!(wildcard_match("A?C", "abc", CaseMode::On));
    }

    #[test]
    fn compare_eq_modes() {
        assert!(compare_eq("Read-Me", "read_me", CaseMode::Relaxed));
        assert!(!compare_eq("Read-Me", "read_me", CaseMode::On));
        assert!(compare_eq("Read", "READ", CaseMode::On));
    }
}
