//! Pluggable suggestion sources.
//!
//! Sources are tried in the order named by `autosuggest.strategy`
//! until one yields a suggestion. The three built-ins: `history`
//! (most recent matching history entry), `completion` (first match of
//! the completion pipeline), `match_prev_cmd` (most recent matching
//! entry whose predecessor equals the previously executed command).

use crate::Suggestion;
use core_config::CaseMode;
use core_matches::match_prefix_len;
use core_tokenize::LineState;

pub trait SuggestionStrategy {
    fn name(&self) -> &'static str;
    fn suggest(&self, state: &LineState) -> Option<Suggestion>;
}

/// Read access to history lines, newest last. The callback returns
/// false to stop the walk.
pub trait HistoryWalk {
    /// Visit entries newest-first as `(entry, previous_entry)`.
    fn walk_rev(&self, visit: &mut dyn FnMut(&str, Option<&str>) -> bool);
}

impl HistoryWalk for Vec<String> {
    fn walk_rev(&self, visit: &mut dyn FnMut(&str, Option<&str>) -> bool) {
        for i in (0..self.len()).rev() {
            let prev = if i > 0 { Some(self[i - 1].as_str()) } else { None };
            if !visit(&self[i], prev) {
                break;
            }
        }
    }
}

/// Most recent history entry the typed line prefixes.
pub struct HistoryStrategy<'a> {
    pub history: &'a dyn HistoryWalk,
    pub case: CaseMode,
}

impl SuggestionStrategy for HistoryStrategy<'_> {
    fn name(&self) -> &'static str {
        "history"
    }

    fn suggest(&self, state: &LineState) -> Option<Suggestion> {
        let line = state.line();
        if line.is_empty() {
            return None;
        }
        let mut found = None;
        self.history.walk_rev(&mut |entry, _| {
            if entry.len() > line.len() && match_prefix_len(line, entry, self.case).is_some() {
                found = Some(Suggestion::new(entry, 0));
                false
            } else {
                true
            }
        });
        found
    }
}

/// Most recent matching entry whose preceding history entry matches
/// the most recently invoked command. Only meaningful when duplicates
/// are kept (`history.dupe_mode=add`).
pub struct MatchPrevCmdStrategy<'a> {
    pub history: &'a dyn HistoryWalk,
    pub previous_command: Option<&'a str>,
    pub case: CaseMode,
    pub dupe_mode_is_add: bool,
}

impl SuggestionStrategy for MatchPrevCmdStrategy<'_> {
    fn name(&self) -> &'static str {
        "match_prev_cmd"
    }

    fn suggest(&self, state: &LineState) -> Option<Suggestion> {
        if !self.dupe_mode_is_add {
            return None;
        }
        let prev_cmd = self.previous_command?;
        let line = state.line();
        if line.is_empty() {
            return None;
        }
        let mut found = None;
        self.history.walk_rev(&mut |entry, prev| {
            if prev == Some(prev_cmd)
                && entry.len() > line.len()
                && match_prefix_len(line, entry, self.case).is_some()
            {
                found = Some(Suggestion::new(entry, 0));
                false
            } else {
                true
            }
        });
        found
    }
}

/// Supplies the first completion match for the end word. The closure
/// seam keeps the pipeline wiring (generators, settings, prober) in
/// the host layer.
pub struct CompletionSource<F>
where
    F: Fn(&LineState) -> Option<String>,
{
    pub first_match: F,
}

impl<F> SuggestionStrategy for CompletionSource<F>
where
    F: Fn(&LineState) -> Option<String>,
{
    fn name(&self) -> &'static str {
        "completion"
    }

    fn suggest(&self, state: &LineState) -> Option<Suggestion> {
        let text = (self.first_match)(state)?;
        let offset = state.end_word_offset();
        Some(Suggestion::new(text, offset))
    }
}

/// Try the strategies in the order named by the `order` list; the
/// first to produce a suggestion wins.
pub fn pick_suggestion(
    order: &[&str],
    strategies: &[&dyn SuggestionStrategy],
    state: &LineState,
) -> Option<Suggestion> {
    for name in order {
        for strategy in strategies {
            if strategy.name() == *name
                && let Some(s) = strategy.suggest(state)
            {
                return Some(s);
            }
        }
    }
    None
}
