//! The match set and its builder-side interface.

use crate::fs::FsProber;
use crate::translate::{normalize_separators, translation_separator};
use crate::{MatchKind, MatchType, SYSTEM_SEPARATOR, is_path_separator};
use ahash::AHashSet;
use core_config::SlashTranslation;
use tracing::trace;

/// A candidate passed to [`MatchSet::add_match`] by a generator.
#[derive(Debug, Clone, Default)]
pub struct MatchDesc {
    pub text: String,
    pub mtype: MatchType,
    pub display: Option<String>,
    pub description: Option<String>,
    pub append_char: Option<char>,
    pub suppress_append: bool,
    pub append_display: bool,
}

impl MatchDesc {
    pub fn new(text: impl Into<String>, kind: MatchKind) -> Self {
        Self {
            text: text.into(),
            mtype: MatchType::new(kind),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, mtype: MatchType) -> Self {
        self.mtype = mtype;
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_append_char(mut self, c: char) -> Self {
        self.append_char = Some(c);
        self
    }

    pub fn suppress_append(mut self) -> Self {
        self.suppress_append = true;
        self
    }
}

/// One accepted candidate.
#[derive(Debug, Clone)]
pub struct Match {
    pub text: String,
    pub mtype: MatchType,
    pub display: Option<String>,
    pub description: Option<String>,
    pub append_char: Option<char>,
    pub suppress_append: bool,
    pub append_display: bool,
    pub(crate) ordinal: u32,
    pub(crate) selected: bool,
}

impl Match {
    pub fn is_dir(&self) -> bool {
        self.mtype.kind == MatchKind::Dir
    }

    /// The character to append after accepting this match, or None
    /// when nothing should be appended (directories keep the cursor
    /// after their separator).
    pub fn append_after_accept(&self, default_append: char) -> Option<char> {
        if self.suppress_append || self.is_dir() {
            None
        } else {
            Some(self.append_char.unwrap_or(default_append))
        }
    }
}

/// A boolean whose explicit setting shadows the inferred one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shadowed {
    explicit: Option<bool>,
    implicit: bool,
}

impl Shadowed {
    pub fn get(&self) -> bool {
        self.explicit.unwrap_or(self.implicit)
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    pub fn set_explicit(&mut self, value: bool) {
        self.explicit = Some(value);
    }

    pub fn set_implicit(&mut self, value: bool) {
        self.implicit = value;
    }
}

#[derive(Hash, PartialEq, Eq)]
struct DedupKey(String, MatchType);

/// An insertion-ordered deduplicated set of matches plus the metadata
/// the host consumes when inserting or displaying them.
pub struct MatchSet {
    matches: Vec<Match>,
    dedup: Option<AHashSet<DedupKey>>,
    coalesced: bool,
    any_none_type: bool,

    append_char: char,
    suppress_append: bool,
    force_quoting: bool,
    has_descriptions: bool,
    nosort: bool,
    volatile: bool,
    fully_qualify: bool,
    filename_completion_desired: Shadowed,
    filename_display_desired: Shadowed,
    word_break_override: Option<usize>,

    input_line: String,
    translate: SlashTranslation,
    /// The separator the user typed last, feeding `automatic` mode.
    typed_separator: Option<u8>,

    any_pathish: bool,
    all_pathish: bool,
}

impl MatchSet {
    pub fn new(translate: SlashTranslation, typed_separator: Option<u8>, input_line: &str) -> Self {
        Self {
            matches: Vec::new(),
            dedup: Some(AHashSet::new()),
            coalesced: false,
            any_none_type: false,
            append_char: ' ',
            suppress_append: false,
            force_quoting: false,
            has_descriptions: false,
            nosort: false,
            volatile: false,
            fully_qualify: false,
            filename_completion_desired: Shadowed::default(),
            filename_display_desired: Shadowed::default(),
            word_break_override: None,
            input_line: input_line.to_string(),
            translate,
            typed_separator,
            any_pathish: false,
            all_pathish: false,
        }
    }

    pub fn reset(&mut self) {
        let translate = self.translate;
        let typed = self.typed_separator;
        let line = std::mem::take(&mut self.input_line);
        *self = MatchSet::new(translate, typed, &line);
    }

    /// Add one candidate. Returns false when it was dropped (empty,
    /// duplicate, or the set is already coalesced).
    pub fn add_match(&mut self, desc: MatchDesc) -> bool {
        if self.coalesced || desc.text.is_empty() {
            return false;
        }

        let mut text = desc.text;
        let mut mtype = desc.mtype;

        let ends_with_sep = text.bytes().last().is_some_and(is_path_separator);
        if mtype.kind == MatchKind::None && ends_with_sep {
            mtype.kind = MatchKind::Dir;
        }

        // Slash translation applies only to dir/file/none matches, the
        // last only when file completion is desired.
        let translate = self.translate != SlashTranslation::Off
            && (mtype.kind == MatchKind::Dir
                || mtype.kind == MatchKind::File
                || (mtype.kind == MatchKind::None && self.filename_completion_desired.get()));

        // Directory matches always carry a trailing separator.
        if mtype.kind == MatchKind::Dir && !ends_with_sep {
            text.push(SYSTEM_SEPARATOR as char);
        }

        if translate
            && let Some(sep) = translation_separator(self.translate, self.typed_separator)
        {
            normalize_separators(&mut text, sep);
        }

        let dedup = self.dedup.get_or_insert_with(AHashSet::new);
        if dedup.contains(&DedupKey(text.clone(), mtype)) {
            return false;
        }
        dedup.insert(DedupKey(text.clone(), mtype));

        if mtype.kind == MatchKind::None {
            self.any_none_type = true;
        }
        if desc.description.is_some() {
            self.has_descriptions = true;
        }

        let ordinal = self.matches.len() as u32;
        self.matches.push(Match {
            text,
            mtype,
            display: desc.display.filter(|d| !d.is_empty()),
            description: desc.description.filter(|d| !d.is_empty()),
            append_char: desc.append_char,
            suppress_append: desc.suppress_append,
            append_display: desc.append_display,
            ordinal,
            selected: false,
        });
        true
    }

    /// Resolve `none`-typed matches into file/dir by probing the file
    /// system, unless completion explicitly declined filenames. A
    /// promotion that collides with an existing `(text, type)` entry
    /// discards the duplicate.
    pub fn done_building(&mut self, prober: &dyn FsProber) {
        let interested = self.filename_completion_desired.get()
            || !self.filename_completion_desired.is_explicit();
        if self.any_none_type && interested {
            let sep = translation_separator(self.translate, self.typed_separator)
                .unwrap_or(SYSTEM_SEPARATOR);

            let mut i = self.matches.len();
            while i > 0 {
                i -= 1;
                if self.matches[i].mtype.kind != MatchKind::None {
                    continue;
                }
                let Some(attrs) = prober.probe(&self.matches[i].text) else {
                    continue;
                };

                let old_key = DedupKey(self.matches[i].text.clone(), self.matches[i].mtype);
                let new_type = attrs.to_match_type();
                let mut new_text = self.matches[i].text.clone();
                if new_type.kind == MatchKind::Dir
                    && !new_text.bytes().last().is_some_and(is_path_separator)
                {
                    new_text.push(sep as char);
                }

                if let Some(dedup) = self.dedup.as_mut() {
                    dedup.remove(&old_key);
                    let new_key = DedupKey(new_text.clone(), new_type);
                    if dedup.contains(&new_key) {
                        self.matches.remove(i);
                        continue;
                    }
                    dedup.insert(new_key);
                }

                self.matches[i].mtype = new_type;
                self.matches[i].text = new_text;
            }
        }

        self.dedup = None;
        trace!(target: "matches", count = self.matches.len(), "done_building");
    }

    /// Drop unselected matches and compute the pathish shadows.
    pub(crate) fn coalesce(&mut self) {
        let mut any_pathish = false;
        let mut all_pathish = true;

        self.matches.retain(|m| {
            if !m.selected {
                return false;
            }
            if m.mtype.is_pathish() {
                any_pathish = true;
            } else {
                all_pathish = false;
            }
            true
        });

        self.any_pathish = any_pathish;
        self.all_pathish = any_pathish && all_pathish;
        self.filename_completion_desired.set_implicit(self.any_pathish);
        self.filename_display_desired.set_implicit(self.all_pathish);
        self.coalesced = true;
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub(crate) fn matches_mut(&mut self) -> &mut [Match] {
        &mut self.matches
    }

    pub(crate) fn sort_matches<F>(&mut self, cmp: F)
    where
        F: FnMut(&Match, &Match) -> std::cmp::Ordering,
    {
        self.matches.sort_by(cmp);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Whether any surviving match is path-like.
    pub fn any_pathish(&self) -> bool {
        self.any_pathish
    }

    /// Whether every surviving match is path-like.
    pub fn all_pathish(&self) -> bool {
        self.all_pathish
    }

    pub fn append_char(&self) -> char {
        self.append_char
    }

    pub fn suppress_append(&self) -> bool {
        self.suppress_append
    }

    pub fn force_quoting(&self) -> bool {
        self.force_quoting
    }

    pub fn has_descriptions(&self) -> bool {
        self.has_descriptions
    }

    pub fn nosort(&self) -> bool {
        self.nosort
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn fully_qualify(&self) -> bool {
        self.fully_qualify
    }

    pub fn word_break_override(&self) -> Option<usize> {
        self.word_break_override
    }

    pub fn input_line(&self) -> &str {
        &self.input_line
    }

    pub fn filename_completion_desired(&self) -> bool {
        self.filename_completion_desired.get()
    }

    pub fn filename_display_desired(&self) -> bool {
        self.filename_display_desired.get()
    }

    /// Whether the set was generated from the given live input line.
    pub fn is_from_input_line(&self, line: &str) -> bool {
        self.input_line == line
    }
}

/// The generator-facing interface over a [`MatchSet`].
pub struct MatchBuilder<'a> {
    set: &'a mut MatchSet,
}

impl<'a> MatchBuilder<'a> {
    pub fn new(set: &'a mut MatchSet) -> Self {
        Self { set }
    }

    pub fn add_match(&mut self, desc: MatchDesc) -> bool {
        self.set.add_match(desc)
    }

    pub fn add_text(&mut self, text: impl Into<String>, kind: MatchKind) -> bool {
        self.set.add_match(MatchDesc::new(text, kind))
    }

    pub fn set_append_char(&mut self, c: char) {
        self.set.append_char = c;
    }

    pub fn set_suppress_append(&mut self, on: bool) {
        self.set.suppress_append = on;
    }

    pub fn set_force_quoting(&mut self) {
        self.set.force_quoting = true;
    }

    pub fn set_no_sort(&mut self) {
        self.set.nosort = true;
    }

    pub fn set_volatile(&mut self) {
        self.set.volatile = true;
    }

    pub fn set_fully_qualify(&mut self) {
        self.set.fully_qualify = true;
    }

    pub fn set_word_break_position(&mut self, pos: usize) {
        self.set.word_break_override = Some(pos);
    }

    pub fn set_filename_completion_desired(&mut self, desired: bool) {
        self.set.filename_completion_desired.set_explicit(desired);
    }

    pub fn set_filename_display_desired(&mut self, desired: bool) {
        self.set.filename_display_desired.set_explicit(desired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoFs;

    fn set() -> MatchSet {
        MatchSet::new(SlashTranslation::Off, None, "")
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut s = set();
        assert!(s.add_match(MatchDesc::new("echo", MatchKind::Command)));
        assert!(!s.add_match(MatchDesc::new("echo", MatchKind::Command)));
        // Same text with a different type is a distinct entry.
        assert!(s.add_match(MatchDesc::new("echo", MatchKind::File)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn dir_matches_get_trailing_separator() {
        let mut s = set();
        s.add_match(MatchDesc::new("src", MatchKind::Dir));
        assert!(is_path_separator(*s.matches()[0].text.as_bytes().last().unwrap()));
    }

    #[test]
    fn none_with_separator_becomes_dir() {
        let mut s = set();
        s.add_match(MatchDesc::new("src/", MatchKind::None));
        assert_eq!(s.matches()[0].mtype.kind, MatchKind::Dir);
    }

    #[test]
    fn promotion_respects_collisions() {
        let prober = |path: &str| {
            (path == "build").then(|| crate::FsAttrs {
                dir: true,
                ..Default::default()
            })
        };
        let mut s = set();
        s.add_match(MatchDesc::new("build/", MatchKind::Dir));
        s.add_match(MatchDesc::new("build", MatchKind::None));
        s.done_building(&prober);
        // The promoted `build` became `build/` dir, colliding with the
        // existing entry; the duplicate is discarded.
        assert_eq!(s.len(), 1);
        assert_eq!(s.matches()[0].mtype.kind, MatchKind::Dir);
    }

    #[test]
    fn promotion_types_files() {
        let prober = |path: &str| {
            (path == "notes.txt").then(crate::FsAttrs::default)
        };
        let mut s = set();
        s.add_match(MatchDesc::new("notes.txt", MatchKind::None));
        s.add_match(MatchDesc::new("missing", MatchKind::None));
        s.done_building(&prober);
        assert_eq!(s.matches()[0].mtype.kind, MatchKind::File);
        assert_eq!(s.matches()[1].mtype.kind, MatchKind::None);
    }

    #[test]
    fn explicit_decline_skips_promotion() {
        let mut s = set();
        {
            let mut b = MatchBuilder::new(&mut s);
            b.add_text("anything", MatchKind::None);
            b.set_filename_completion_desired(false);
        }
        s.done_building(&NoFs);
        assert_eq!(s.matches()[0].mtype.kind, MatchKind::None);
    }

    #[test]
    fn accept_append_semantics() {
        let mut s = set();
        s.add_match(MatchDesc::new("echo", MatchKind::Command));
        s.add_match(MatchDesc::new("src", MatchKind::Dir));
        let cmd = &s.matches()[0];
        let dir = &s.matches()[1];
        assert_eq!(cmd.append_after_accept(' '), Some(' '));
        assert_eq!(dir.append_after_accept(' '), None);
    }
}
