//! The match pipeline: generate, dedupe, select, sort.
//!
//! Generators push candidates into a [`MatchSet`] through a
//! [`MatchBuilder`]; the pipeline then filters by the needle, resolves
//! untyped matches against the file system, and orders the survivors.
//!
//! Pipeline stages:
//! 1. [`MatchPipeline::generate`] runs generators until one reports it
//!    handled the line.
//! 2. [`MatchSet::done_building`] promotes `none`-typed matches to
//!    file/dir by probing the file system.
//! 3. [`MatchPipeline::select`] keeps matches passing the needle
//!    filter (prefix, optionally substring retry).
//! 4. [`MatchPipeline::sort`] applies the directory-order policy
//!    unless the set is marked `nosort`.

mod builder;
mod compare;
mod file_gen;
mod fs;
mod pipeline;
mod select;
mod sort;
mod translate;

pub use builder::{Match, MatchBuilder, MatchDesc, MatchSet};
pub use compare::{compare_eq, match_prefix_len};
pub use file_gen::FileMatchGenerator;
pub use fs::{FsAttrs, FsProber, NoFs, RealFs};
pub use pipeline::{MatchGenerator, MatchPipeline};
pub use select::can_try_substring_pattern;
pub use translate::{normalize_separators, translate_slashes};

use bitflags::bitflags;

/// The primary classification of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchKind {
    /// Unclassified; resolved to file/dir at end-of-build when
    /// completion treats matches as paths.
    #[default]
    None,
    Word,
    Arg,
    Command,
    Alias,
    File,
    Dir,
}

bitflags! {
    /// Orthogonal modifier bits carried alongside [`MatchKind`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MatchFlags: u8 {
        const LINK     = 0b0000_0001;
        const ORPHANED = 0b0000_0010;
        const HIDDEN   = 0b0000_0100;
        const SYSTEM   = 0b0000_1000;
        const READONLY = 0b0001_0000;
    }
}

/// A match's full type: kind tag plus modifier bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchType {
    pub kind: MatchKind,
    pub flags: MatchFlags,
}

impl MatchType {
    pub const fn new(kind: MatchKind) -> Self {
        Self {
            kind,
            flags: MatchFlags::empty(),
        }
    }

    pub const fn with_flags(kind: MatchKind, flags: MatchFlags) -> Self {
        Self { kind, flags }
    }

    pub fn is_pathish(&self) -> bool {
        matches!(self.kind, MatchKind::File | MatchKind::Dir | MatchKind::None)
    }
}

impl From<MatchKind> for MatchType {
    fn from(kind: MatchKind) -> Self {
        MatchType::new(kind)
    }
}

#[inline]
pub fn is_path_separator(c: u8) -> bool {
    c == b'\\' || c == b'/'
}

/// The platform path separator the pipeline normalizes to.
#[cfg(windows)]
pub const SYSTEM_SEPARATOR: u8 = b'\\';
#[cfg(not(windows))]
pub const SYSTEM_SEPARATOR: u8 = b'/';

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pathish_kinds() {
        assert!(MatchType::new(MatchKind::File).is_pathish());
        assert!(MatchType::new(MatchKind::Dir).is_pathish());
        assert!(MatchType::new(MatchKind::None).is_pathish());
        assert!(!MatchType::new(MatchKind::Command).is_pathish());
        assert!(!MatchType::new(MatchKind::Word).is_pathish());
    }

    #[test]
    fn flags_compose() {
        let t = MatchType::with_flags(MatchKind::File, MatchFlags::HIDDEN | MatchFlags::READONLY);
        assert!(t.flags.contains(MatchFlags::HIDDEN));
        assert!(!t.flags.contains(MatchFlags::LINK));
    }
}
