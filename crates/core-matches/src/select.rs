//! Needle selection: prefix filter with optional substring retry.

use crate::builder::MatchSet;
use crate::compare::{match_prefix_len, wildcard_match};
use crate::is_path_separator;
use core_config::CaseMode;
use tracing::trace;

fn has_wildcard(needle: &str) -> bool {
    needle.contains(['*', '?'])
}

/// Whether a failed prefix pass may retry the needle as a substring
/// pattern: only when the setting is on and the needle carries no
/// wildcards of its own.
pub fn can_try_substring_pattern(needle: &str, substring_setting: bool) -> bool {
    substring_setting && !needle.is_empty() && !has_wildcard(needle)
}

/// Rewrite the needle as `<prefix>*<rest>` where `<prefix>` runs up to
/// and including the last path separator.
fn substring_pattern(needle: &str) -> String {
    let split = needle
        .bytes()
        .rposition(is_path_separator)
        .map(|i| i + 1)
        .unwrap_or(0);
    format!("{}*{}*", &needle[..split], &needle[split..])
}

impl MatchSet {
    /// Mark matches passing the needle filter and drop the rest. The
    /// first pass that yields at least one survivor wins.
    pub fn select(&mut self, needle: &str, case: CaseMode, substring_setting: bool) {
        let mut selected = 0usize;
        for m in self.matches_mut() {
            m.selected = needle.is_empty()
                || if has_wildcard(needle) {
                    wildcard_match(&format!("{needle}*"), &m.text, case)
                } else {
                    match_prefix_len(needle, &m.text, case).is_some()
                };
            if m.selected {
                selected += 1;
            }
        }

        if selected == 0 && can_try_substring_pattern(needle, substring_setting) {
            let pattern = substring_pattern(needle);
            for m in self.matches_mut() {
                m.selected = wildcard_match(&pattern, &m.text, case);
                if m.selected {
                    selected += 1;
                }
            }
            trace!(target: "matches", %pattern, selected, "substring_retry");
        }

        self.coalesce();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchDesc, MatchKind};
    use core_config::SlashTranslation;

    fn set_with(texts: &[(&str, MatchKind)]) -> MatchSet {
        let mut s = MatchSet::new(SlashTranslation::Off, None, "");
        for (t, k) in texts {
            s.add_match(MatchDesc::new(*t, *k));
        }
        s
    }

    #[test]
    fn prefix_filter_keeps_matches() {
        let mut s = set_with(&[
            ("echo", MatchKind::Command),
            ("exit", MatchKind::Command),
            ("dir", MatchKind::Command),
        ]);
        s.select("e", CaseMode::On, false);
        let texts: Vec<_> = s.matches().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["echo", "exit"]);
    }

    #[test]
    fn empty_needle_keeps_all() {
        let mut s = set_with(&[("a", MatchKind::Word), ("b", MatchKind::Word)]);
        s.select("", CaseMode::On, false);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn substring_retry_after_failed_prefix() {
        let mut s = set_with(&[
            ("my_notes.txt", MatchKind::File),
            ("readme.md", MatchKind::File),
        ]);
        s.select("notes", CaseMode::On, true);
        let texts: Vec<_> = s.matches().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["my_notes.txt"]);
    }

    #[test]
    fn substring_respects_path_prefix() {
        let mut s = set_with(&[
            ("src/my_notes.txt", MatchKind::File),
            ("other/notes.txt", MatchKind::File),
        ]);
        s.select("src/notes", CaseMode::On, true);
        let texts: Vec<_> = s.matches().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["src/my_notes.txt"]);
    }

    #[test]
    fn no_substring_retry_when_needle_has_wildcards() {
        let mut s = set_with(&[("my_notes.txt", MatchKind::File)]);
        s.select("x*notes", CaseMode::On, true);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn wildcard_needle_filters_directly() {
        let mut s = set_with(&[
            ("alpha.obj", MatchKind::File),
            ("alpha.rs", MatchKind::File),
        ]);
        s.select("a*.rs", CaseMode::On, false);
        let texts: Vec<_> = s.matches().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha.rs"]);
    }

    #[test]
    fn pathish_shadows_after_selection() {
        let mut s = set_with(&[
            ("file.txt", MatchKind::File),
            ("word", MatchKind::Word),
        ]);
        s.select("", CaseMode::On, false);
        assert!(s.any_pathish());
        assert!(!s.all_pathish());
        assert!(s.filename_completion_desired());
        assert!(!s.filename_display_desired());
    }
}
