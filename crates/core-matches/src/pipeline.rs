//! The builder-consumer pipeline over a match set.

use crate::builder::{MatchBuilder, MatchSet};
use crate::fs::FsProber;
use core_config::{CaseMode, SortDirs};
use core_tokenize::LineState;
use tracing::debug;

/// A match source. Generators run in order until one reports it
/// handled the line state.
pub trait MatchGenerator {
    /// Add matches for `state`. Return true to short-circuit the
    /// remaining generators.
    fn generate(&self, state: &LineState, builder: &mut MatchBuilder<'_>) -> bool;
}

impl<F> MatchGenerator for F
where
    F: Fn(&LineState, &mut MatchBuilder<'_>) -> bool,
{
    fn generate(&self, state: &LineState, builder: &mut MatchBuilder<'_>) -> bool {
        self(state, builder)
    }
}

/// Drives generate → resolve → select → sort over one [`MatchSet`].
pub struct MatchPipeline<'a> {
    set: &'a mut MatchSet,
    case: CaseMode,
    substring: bool,
    sort_dirs: SortDirs,
}

impl<'a> MatchPipeline<'a> {
    pub fn new(set: &'a mut MatchSet, case: CaseMode, substring: bool, sort_dirs: SortDirs) -> Self {
        Self {
            set,
            case,
            substring,
            sort_dirs,
        }
    }

    pub fn reset(&mut self) {
        self.set.reset();
    }

    /// Run the generators; the first to report "handled" wins.
    pub fn generate(
        &mut self,
        state: &LineState,
        generators: &[&dyn MatchGenerator],
        prober: &dyn FsProber,
    ) {
        for generator in generators {
            let mut builder = MatchBuilder::new(self.set);
            if generator.generate(state, &mut builder) {
                break;
            }
        }
        self.set.done_building(prober);
        debug!(target: "matches", count = self.set.len(), "generated");
    }

    pub fn select(&mut self, needle: &str) {
        self.set.select(needle, self.case, self.substring);
        debug!(target: "matches", needle, count = self.set.len(), "selected");
    }

    pub fn sort(&mut self) {
        self.set.sort(self.sort_dirs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchDesc, MatchKind, NoFs};
    use core_config::SlashTranslation;
    use core_tokenize::{CollectMode, NoAliases, NoArgmatchers, WordCollector};

    fn line_state(line: &str) -> LineState {
        let collected = WordCollector::new(&NoAliases, &NoArgmatchers).collect_words(
            line,
            line.len(),
            CollectMode::StopAtCursor,
        );
        LineState::from_collected(line, line.len(), &collected)
    }

    #[test]
    fn first_handling_generator_short_circuits() {
        let g1 = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("from_g1", MatchKind::Word);
            true
        };
        let g2 = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("from_g2", MatchKind::Word);
            false
        };

        let mut set = MatchSet::new(SlashTranslation::Off, None, "x");
        let mut pipeline = MatchPipeline::new(&mut set, CaseMode::On, false, SortDirs::With);
        pipeline.generate(&line_state("x"), &[&g1, &g2], &NoFs);
        assert_eq!(set.len(), 1);
        assert_eq!(set.matches()[0].text, "from_g1");
    }

    #[test]
    fn non_handling_generators_accumulate() {
        let g1 = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("one", MatchKind::Word);
            false
        };
        let g2 = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("two", MatchKind::Word);
            false
        };

        let mut set = MatchSet::new(SlashTranslation::Off, None, "x");
        let mut pipeline = MatchPipeline::new(&mut set, CaseMode::On, false, SortDirs::With);
        pipeline.generate(&line_state("x"), &[&g1, &g2], &NoFs);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let mut set = MatchSet::new(SlashTranslation::Off, None, "");
        set.add_match(MatchDesc::new("a", MatchKind::Word));
        set.add_match(MatchDesc::new("b", MatchKind::Word));
        set.add_match(MatchDesc::new("a", MatchKind::Word));
        let before: Vec<String> = set.matches().iter().map(|m| m.text.clone()).collect();
        set.add_match(MatchDesc::new("a", MatchKind::Word));
        let after: Vec<String> = set.matches().iter().map(|m| m.text.clone()).collect();
        assert_eq!(before, after);
    }
}
