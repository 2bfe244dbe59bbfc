//! The doskey alias-expansion contract.
//!
//! The resolver produces a byte stream whose internal command
//! separators are encoded as `\x01`; the hook converts those to NUL
//! and feeds the host one segment per console read. `\x01` is
//! reserved in history and input for exactly this reason.

/// External string-expansion service (the doskey macro store).
pub trait DoskeyResolver {
    /// Expand a whole accepted line. None when no alias applies; Some
    /// carries the expansion, with `\x01` between commands.
    fn resolve(&self, line: &str) -> Option<String>;

    /// Look up a bare alias name (feeds the tokenizer).
    fn lookup(&self, name: &str) -> Option<String>;
}

pub struct NoDoskey;

impl DoskeyResolver for NoDoskey {
    fn resolve(&self, _line: &str) -> Option<String> {
        None
    }

    fn lookup(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Split a resolved expansion on the `\x01` separator into the
/// segments successive console reads will return.
pub fn segment_expansion(expansion: &str) -> Vec<String> {
    expansion
        .split('\u{1}')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_separator() {
        let segs = segment_expansion("cd src\u{1}dir /w");
        assert_eq!(segs, vec!["cd src", "dir /w"]);
    }

    #[test]
    fn single_segment_without_separator() {
        assert_eq!(segment_expansion("dir"), vec!["dir"]);
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(segment_expansion("a\u{1}\u{1}b"), vec!["a", "b"]);
        assert!(segment_expansion("").is_empty());
    }
}
