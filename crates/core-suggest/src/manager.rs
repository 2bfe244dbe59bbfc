//! The suggestion holder and its acceptance actions.

use crate::Suggestion;
use core_buffer::LineBuffer;
use core_config::CaseMode;
use tracing::trace;

/// How much of the held suggestion to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionAction {
    /// Replace to the end of the line with the whole suggestion.
    InsertToEnd,
    /// Accept forward one word boundary inside the suggestion.
    InsertNextWord,
    /// Accept through the next run of non-spaces (respecting quotes).
    InsertNextFullWord,
}

/// Suggestion-comparison case: relaxed is never used here (respecting
/// original case makes the dash/underscore equivalence too confusing),
/// so the mode degrades to caseless or exact.
fn suggest_case(mode: CaseMode) -> CaseMode {
    match mode {
        CaseMode::Off => CaseMode::Off,
        CaseMode::On | CaseMode::Relaxed => CaseMode::On,
    }
}

fn chars_eq(a: char, b: char, mode: CaseMode) -> bool {
    match mode {
        CaseMode::Off => a == b,
        _ => a.eq_ignore_ascii_case(&b),
    }
}

/// Length in bytes of the prefix of `sugg` corresponding to all of
/// `lead` under a case-aware comparison; None when `lead` diverges.
fn agreeing_prefix(lead: &str, sugg: &str, mode: CaseMode) -> Option<usize> {
    let mut si = sugg.char_indices();
    for lc in lead.chars() {
        let (_, sc) = si.next()?;
        if !chars_eq(lc, sc, mode) {
            return None;
        }
    }
    Some(si.next().map(|(i, _)| i).unwrap_or(sugg.len()))
}

#[derive(Default)]
pub struct SuggestionManager {
    /// The line the held suggestion was computed against.
    line: String,
    /// The line a generation pass was last started for.
    started: String,
    suggestion: String,
    suggestion_offset: usize,
    endword_offset: usize,
    suppress: bool,
    paused: bool,
    active: bool,
}

impl SuggestionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_suggestion(&self) -> bool {
        self.active && !self.suggestion.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause suppresses recomputation while code mutates the buffer;
    /// returns the previous state so callers can restore it.
    pub fn pause(&mut self, pause: bool) -> bool {
        std::mem::replace(&mut self.paused, pause)
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.suggestion.clear();
        self.line.clear();
        self.started.clear();
        self.suggestion_offset = 0;
        self.endword_offset = 0;
        self.suppress = false;
    }

    /// Suppress suggestions until the next non-destructive edit.
    pub fn suppress_until_next_edit(&mut self, buffer: &LineBuffer) {
        self.clear();
        self.line = buffer.text().to_string();
        self.started = buffer.text().to_string();
        self.suppress = true;
    }

    /// The ghost tail to display after the input, when the live buffer
    /// still agrees with the held suggestion.
    pub fn visible_tail(&self, buffer: &LineBuffer, case: CaseMode) -> Option<String> {
        if !self.has_suggestion()
            || buffer.cursor() != buffer.len()
            || buffer.anchor().is_some()
        {
            return None;
        }
        let lead = buffer.text().get(self.suggestion_offset..)?;
        let consumed = agreeing_prefix(lead, &self.suggestion, suggest_case(case))?;
        let tail = &self.suggestion[consumed..];
        if tail.is_empty() {
            None
        } else {
            Some(tail.to_string())
        }
    }

    /// Whether the editor should ask sources for a new suggestion.
    /// Destructive edits keep suppressing; a cursor away from the end
    /// or an active anchor displays nothing and generates nothing.
    pub fn can_suggest(
        &mut self,
        buffer: &LineBuffer,
        endword_offset: usize,
        last_edit_destructive: bool,
    ) -> bool {
        if self.paused {
            return false;
        }
        if buffer.cursor() != buffer.len() {
            self.clear();
            return false;
        }
        if buffer.anchor().is_some() {
            return false;
        }

        let diff = self.line != buffer.text();

        if self.suppress {
            if last_edit_destructive {
                // Refresh the suppression against the new line.
                let text = buffer.text().to_string();
                self.clear();
                self.line = text.clone();
                self.started = text;
                self.suppress = true;
                return false;
            }
            if diff {
                self.clear();
            } else {
                return false;
            }
        }

        self.endword_offset = endword_offset;
        diff
    }

    /// Whether a generation pass for the current line is already
    /// underway.
    pub fn can_start_generation(&self, buffer: &LineBuffer) -> bool {
        self.started != buffer.text()
    }

    pub fn mark_started(&mut self, line: &str) {
        self.started = line.to_string();
    }

    /// Install a new suggestion. A malformed one (offset out of range,
    /// or disagreeing with the line it claims to extend) clears the
    /// held suggestion without touching the line.
    pub fn set(&mut self, line: &str, endword_offset: usize, suggestion: Option<Suggestion>, case: CaseMode) {
        let Some(sugg) = suggestion.filter(|s| !s.text.is_empty()) else {
            self.clear();
            self.line = line.to_string();
            self.started = line.to_string();
            return;
        };

        if sugg.offset > line.len()
            || agreeing_prefix(&line[sugg.offset..], &sugg.text, suggest_case(case)).is_none()
        {
            trace!(target: "suggest", "malformed_suggestion_discarded");
            self.clear();
            self.line = line.to_string();
            self.started = line.to_string();
            return;
        }

        self.suggestion = sugg.text;
        self.suggestion_offset = sugg.offset;
        self.endword_offset = endword_offset.min(line.len());
        self.line = line.to_string();
        self.started = line.to_string();
        self.active = true;
        self.suppress = false;
    }

    /// Accept part or all of the suggestion into the buffer. Returns
    /// false when there is nothing to accept.
    pub fn insert(
        &mut self,
        buffer: &mut LineBuffer,
        action: SuggestionAction,
        case: CaseMode,
        original_case: bool,
    ) -> bool {
        if !self.has_suggestion() || buffer.cursor() != buffer.len() {
            return false;
        }
        let case = suggest_case(case);

        // Whole-line adoption: when the suggestion covers the entire
        // line, accepting to the end rewrites the line to take the
        // suggestion's original capitalization.
        if original_case && action == SuggestionAction::InsertToEnd && self.suggestion_offset == 0 {
            let Some(consumed) = agreeing_prefix(buffer.text(), &self.suggestion, case) else {
                self.clear();
                return false;
            };
            if consumed < self.suggestion.len() || buffer.text() != self.suggestion {
                let text = self.suggestion.clone();
                buffer.begin_undo_group();
                buffer.replace_all(&text);
                buffer.end_undo_group();
            }
            self.suppress_until_next_edit(buffer);
            return true;
        }

        // Agreement through the end of the line.
        let lead = match buffer.text().get(self.suggestion_offset..) {
            Some(l) => l,
            None => {
                self.clear();
                return false;
            }
        };
        let Some(consumed) = agreeing_prefix(lead, &self.suggestion, case) else {
            self.clear();
            return false;
        };

        // Track quoting between the end word and the cursor so a word
        // acceptance can honor quoted spans.
        let endword = self.endword_offset.min(buffer.len());
        let mut quote = endword > 0 && buffer.text().as_bytes()[endword - 1] == b'"';
        for b in buffer.text()[endword..].bytes() {
            if b == b'"' {
                quote = !quote;
            }
        }

        let (replace_offset, insert_from, end_offset) = if original_case {
            // Replace from the end word so its capitalization also
            // adopts the suggestion's.
            let lead_to_endword = &buffer.text()[self.suggestion_offset..endword];
            let Some(sugg_at_endword) = agreeing_prefix(lead_to_endword, &self.suggestion, case)
            else {
                self.clear();
                return false;
            };
            (
                endword,
                sugg_at_endword,
                self.suggestion_offset + consumed,
            )
        } else {
            (buffer.len(), consumed, buffer.len())
        };

        let insert_text = self.suggestion[insert_from..].to_string();
        buffer.begin_undo_group();
        let len = buffer.len();
        buffer.remove(replace_offset, len);
        buffer.insert(&insert_text);

        let mut truncated = false;
        if action != SuggestionAction::InsertToEnd {
            buffer.set_cursor(end_offset.min(buffer.len()));

            match action {
                SuggestionAction::InsertNextFullWord => {
                    let text = buffer.text();
                    let mut idx = buffer.cursor();
                    let bytes = text.as_bytes();
                    while idx < bytes.len() && matches!(bytes[idx], b' ' | b'\t') {
                        idx += 1;
                    }
                    while idx < bytes.len() {
                        let b = bytes[idx];
                        if b == b'"' {
                            quote = !quote;
                        } else if !quote && matches!(b, b' ' | b'\t') {
                            break;
                        }
                        idx += 1;
                    }
                    buffer.set_cursor(idx);
                }
                SuggestionAction::InsertNextWord => {
                    // Forward one word: skip to the next alphanumeric
                    // run and pass over it.
                    let text = buffer.text().to_string();
                    let mut idx = buffer.cursor();
                    let mut it = text[idx..].char_indices().peekable();
                    while let Some(&(_, c)) = it.peek() {
                        if c.is_alphanumeric() {
                            break;
                        }
                        it.next();
                    }
                    while let Some(&(i, c)) = it.peek() {
                        if !c.is_alphanumeric() {
                            idx += i;
                            buffer.set_cursor(idx);
                            break;
                        }
                        it.next();
                    }
                    if it.peek().is_none() {
                        buffer.set_cursor(text.len());
                    }
                }
                SuggestionAction::InsertToEnd => unreachable!(),
            }

            truncated = buffer.cursor() < buffer.len();
            if truncated {
                let (cur, len) = (buffer.cursor(), buffer.len());
                buffer.remove(cur, len);
            }
        }
        buffer.end_undo_group();

        if truncated {
            self.line = buffer.text().to_string();
            self.started = buffer.text().to_string();
        } else {
            self.suppress_until_next_edit(buffer);
        }

        true
    }
}
