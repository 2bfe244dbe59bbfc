//! Ghost-text suggestions for the end of the input line.
//!
//! One suggestion is held at a time. It is displayed only while the
//! cursor sits at end-of-line with no selection anchor, and only while
//! the live buffer remains a case-aware prefix of it; any divergence
//! clears it. Malformed suggestions from a source are cleared silently
//! without touching the line.

mod manager;
mod strategy;
mod worker;

pub use manager::{SuggestionAction, SuggestionManager};
pub use strategy::{
    CompletionSource, HistoryStrategy, HistoryWalk, MatchPrevCmdStrategy, SuggestionStrategy,
    pick_suggestion,
};
pub use worker::{SuggestionRequest, SuggestionResult, SuggestionWorker};

/// A proposed completion of the line from `offset` onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    /// Byte offset into the line where the suggestion text begins.
    pub offset: usize,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            offset,
        }
    }
}
