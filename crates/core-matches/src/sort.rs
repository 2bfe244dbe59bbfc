//! Match ordering: configurable directory placement with caseless
//! text as the secondary key.

use crate::builder::MatchSet;
use crate::is_path_separator;
use core_config::SortDirs;
use std::cmp::Ordering;

fn is_dirlike(text: &str) -> bool {
    text.bytes().last().is_some_and(is_path_separator)
}

fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.chars().map(|c| c.to_ascii_lowercase()))
}

impl MatchSet {
    /// Order matches unless the set is marked `nosort` (insertion
    /// order preserved then).
    pub fn sort(&mut self, dirs: SortDirs) {
        if self.nosort() || self.is_empty() {
            return;
        }
        self.sort_matches(|lhs, rhs| {
            if dirs != SortDirs::With {
                let l_dir = is_dirlike(&lhs.text);
                let r_dir = is_dirlike(&rhs.text);
                if l_dir != r_dir {
                    let dir_first = dirs == SortDirs::Before;
                    return if l_dir == dir_first {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    };
                }
            }
            caseless_cmp(&lhs.text, &rhs.text)
        });
    }
}
