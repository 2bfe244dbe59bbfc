//! The edit cycle: a state machine driven by keypress events.
//!
//! Key bindings return a small result (`Continue`, `Accept`, `Abort`,
//! `Reload`, `Exit`) and the loop drives redisplay accordingly. One
//! [`EditSession`] value is constructed per edit cycle and threads the
//! line buffer, tokenizer, suggestion engine, and display engine
//! explicitly; there are no editor singletons.

use crate::prompt::filter_prompt_backspaces;
use crate::signal::is_signaled;
use core_buffer::LineBuffer;
use core_config::Settings;
use core_render::{DisplayManager, FrameInput, TermOp};
use core_suggest::{
    Suggestion, SuggestionAction, SuggestionManager, SuggestionRequest, SuggestionWorker,
};
use core_tokenize::{
    AliasResolver, ArgmatcherLookup, CollectMode, Collected, LineState, WordCollector,
};
use tracing::{debug, trace};

/// What a key binding asked the loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditResult {
    Continue,
    Accept,
    Abort,
    Reload,
    Exit,
}

/// Keys the core bindings understand. The macro/keymap infrastructure
/// supplies richer events upstream; these cover the editing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    CtrlC,
    CtrlD,
    CtrlZ,
    CtrlRight,
    ShiftRight,
    CtrlBackspace,
    CtrlHome,
}

/// A blocking key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRead {
    Key(KeyEvent),
    Interrupted,
    Eof,
}

pub trait KeySource {
    fn next_key(&mut self) -> KeyRead;
}

impl KeySource for Vec<KeyEvent> {
    fn next_key(&mut self) -> KeyRead {
        if self.is_empty() {
            KeyRead::Eof
        } else {
            KeyRead::Key(self.remove(0))
        }
    }
}

/// The binding collaborator: maps a key to edits on the session.
pub trait KeyBindings {
    fn dispatch(&mut self, key: KeyEvent, session: &mut EditSession<'_>) -> EditResult;
}

/// How one edit cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Accepted(String),
    Canceled,
    /// The key source ended without accepting a line.
    Eof,
    Reload,
    Exit,
}

/// Per-cycle editor state, threaded explicitly through the
/// subsystems.
pub struct EditSession<'a> {
    pub buffer: LineBuffer,
    pub suggest: SuggestionManager,
    prompt: String,
    settings: &'a Settings,
    aliases: &'a dyn AliasResolver,
    argmatchers: &'a dyn ArgmatcherLookup,
    last_edit_destructive: bool,
}

impl<'a> EditSession<'a> {
    pub fn new(
        prompt: &str,
        settings: &'a Settings,
        aliases: &'a dyn AliasResolver,
        argmatchers: &'a dyn ArgmatcherLookup,
    ) -> Self {
        Self {
            buffer: LineBuffer::new(),
            suggest: SuggestionManager::new(),
            prompt: filter_prompt_backspaces(prompt),
            settings,
            aliases,
            argmatchers,
            last_edit_destructive: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    fn collector(&self) -> WordCollector<'a> {
        WordCollector::new(self.aliases, self.argmatchers)
            .with_enhanced_doskey(self.settings.doskey.enhanced)
            .with_merge_dot_slash(matches!(
                self.settings.matching.translate_slashes,
                core_config::SlashTranslation::System | core_config::SlashTranslation::Backslash
            ))
    }

    pub fn collect(&self) -> Collected {
        self.collector()
            .collect_words(self.buffer.text(), self.buffer.cursor(), CollectMode::StopAtCursor)
    }

    pub fn line_state(&self) -> LineState {
        LineState::from_collected(self.buffer.text(), self.buffer.cursor(), &self.collect())
    }

    pub fn insert_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.buffer.insert(c.encode_utf8(&mut tmp));
        self.last_edit_destructive = false;
    }

    pub fn insert_str(&mut self, s: &str) {
        self.buffer.insert(s);
        self.last_edit_destructive = false;
    }

    /// Backward delete: a destructive edit that suppresses suggestions
    /// until the next non-destructive edit.
    pub fn backspace(&mut self) {
        let cursor = self.buffer.cursor();
        if cursor == 0 {
            return;
        }
        let prev = self.buffer.prev_boundary(cursor);
        self.buffer.remove(prev, cursor);
        self.last_edit_destructive = true;
        self.suggest.suppress_until_next_edit(&self.buffer);
    }

    /// Backward kill-word: destructive.
    pub fn backward_kill_word(&mut self) {
        let cursor = self.buffer.cursor();
        if cursor == 0 {
            return;
        }
        let text = self.buffer.text();
        let mut idx = cursor;
        while idx > 0 && text.as_bytes()[idx - 1] == b' ' {
            idx -= 1;
        }
        while idx > 0 && text.as_bytes()[idx - 1] != b' ' {
            idx -= 1;
        }
        self.buffer.remove(idx, cursor);
        self.last_edit_destructive = true;
        self.suggest.suppress_until_next_edit(&self.buffer);
    }

    /// Backward kill-line: destructive.
    pub fn backward_kill_line(&mut self) {
        let cursor = self.buffer.cursor();
        if cursor > 0 {
            self.buffer.remove(0, cursor);
            self.last_edit_destructive = true;
            self.suggest.suppress_until_next_edit(&self.buffer);
        }
    }

    pub fn delete_forward(&mut self) {
        let cursor = self.buffer.cursor();
        if cursor < self.buffer.len() {
            let next = self.buffer.next_boundary(cursor);
            self.buffer.remove(cursor, next);
            self.last_edit_destructive = false;
        }
    }

    /// Run the completion pipeline against the end word. A single
    /// surviving match is inserted (replacing the needle), with its
    /// append character unless suppressed or a directory. Returns the
    /// surviving match count.
    pub fn complete(
        &mut self,
        generators: &[&dyn core_matches::MatchGenerator],
        prober: &dyn core_matches::FsProber,
    ) -> usize {
        use core_matches::{MatchPipeline, MatchSet};

        let state = self.line_state();
        let typed_sep = state
            .needle()
            .bytes()
            .rev()
            .find(|&b| b == b'/' || b == b'\\');
        let mut set = MatchSet::new(
            self.settings.matching.translate_slashes,
            typed_sep,
            state.line(),
        );
        let mut pipeline = MatchPipeline::new(
            &mut set,
            self.settings.matching.ignore_case,
            self.settings.matching.substring,
            self.settings.matching.sort_dirs,
        );
        pipeline.generate(&state, generators, prober);
        pipeline.select(state.needle());
        pipeline.sort();

        let count = set.len();
        if count == 1 {
            let m = &set.matches()[0];
            let start = state.end_word_offset().min(self.buffer.cursor());
            let cursor = self.buffer.cursor();
            self.buffer.begin_undo_group();
            self.buffer.remove(start, cursor);
            self.buffer.insert(&m.text);
            if let Some(c) = m.append_after_accept(set.append_char()) {
                let mut tmp = [0u8; 4];
                self.buffer.insert(c.encode_utf8(&mut tmp));
            }
            self.buffer.end_undo_group();
            self.last_edit_destructive = false;
        }
        count
    }

    pub fn accept_suggestion(&mut self, action: SuggestionAction) -> bool {
        let case = self.settings.matching.ignore_case;
        let original_case = self.settings.autosuggest.original_case;
        self.suggest
            .insert(&mut self.buffer, action, case, original_case)
    }

    /// At end-of-line with a visible suggestion, Right/End accept it.
    pub fn cursor_at_end_with_suggestion(&self) -> bool {
        self.buffer.cursor() == self.buffer.len()
            && self
                .suggest
                .visible_tail(&self.buffer, self.settings.matching.ignore_case)
                .is_some()
    }

    fn frame_tail(&self) -> Option<String> {
        self.suggest
            .visible_tail(&self.buffer, self.settings.matching.ignore_case)
    }

    /// Ask for a fresh suggestion when the line changed; sync path
    /// computes inline, async path posts a request.
    fn refresh_suggestion(
        &mut self,
        suggest_fn: Option<&dyn Fn(&LineState) -> Option<Suggestion>>,
        worker: Option<&SuggestionWorker>,
    ) {
        if !self.settings.autosuggest.enable {
            return;
        }
        let state = self.line_state();
        let endword = state.end_word_offset();
        if !self
            .suggest
            .can_suggest(&self.buffer, endword, self.last_edit_destructive)
        {
            return;
        }
        if !self.suggest.can_start_generation(&self.buffer) {
            return;
        }

        if self.settings.autosuggest.r#async
            && let Some(worker) = worker
        {
            self.suggest.mark_started(self.buffer.text());
            worker.request(SuggestionRequest {
                line: self.buffer.text().to_string(),
                cursor: self.buffer.cursor(),
                endword_offset: endword,
            });
            return;
        }

        if let Some(f) = suggest_fn {
            let suggestion = f(&state);
            let line = self.buffer.text().to_string();
            self.suggest.set(
                &line,
                endword,
                suggestion,
                self.settings.matching.ignore_case,
            );
        }
    }

    /// Fold in an async result unless the line has moved on.
    fn apply_async_result(&mut self, result: core_suggest::SuggestionResult) {
        if result.line != self.buffer.text() {
            trace!(target: "hook", "stale_async_suggestion_discarded");
            return;
        }
        self.suggest.set(
            &result.line,
            result.endword_offset,
            result.suggestion,
            self.settings.matching.ignore_case,
        );
    }
}

/// Run one edit cycle to completion.
#[allow(clippy::too_many_arguments)]
pub fn run_edit(
    session: &mut EditSession<'_>,
    keys: &mut dyn KeySource,
    bindings: &mut dyn KeyBindings,
    display: &mut DisplayManager,
    emit: &mut dyn FnMut(Vec<TermOp>),
    suggest_fn: Option<&dyn Fn(&LineState) -> Option<Suggestion>>,
    worker: Option<&SuggestionWorker>,
) -> EditOutcome {
    display.on_new_line();
    session.refresh_suggestion(suggest_fn, worker);

    loop {
        // Async results land at the start of each redraw.
        if let Some(w) = worker {
            while let Some(result) = w.poll() {
                session.apply_async_result(result);
            }
        }

        redraw(session, display, emit);

        if is_signaled() {
            debug!(target: "hook", "edit_interrupted_by_signal");
            return EditOutcome::Canceled;
        }

        let key = match keys.next_key() {
            KeyRead::Key(k) => k,
            KeyRead::Interrupted => return EditOutcome::Canceled,
            KeyRead::Eof => return EditOutcome::Eof,
        };

        let result = bindings.dispatch(key, session);

        // And again after each key dispatch.
        if let Some(w) = worker {
            while let Some(posted) = w.poll() {
                session.apply_async_result(posted);
            }
        }
        session.refresh_suggestion(suggest_fn, worker);

        match result {
            EditResult::Continue => {}
            EditResult::Accept => {
                redraw(session, display, emit);
                return EditOutcome::Accepted(session.buffer.text().to_string());
            }
            EditResult::Abort => return EditOutcome::Canceled,
            EditResult::Reload => return EditOutcome::Reload,
            EditResult::Exit => return EditOutcome::Exit,
        }
    }
}

fn redraw(session: &EditSession<'_>, display: &mut DisplayManager, emit: &mut dyn FnMut(Vec<TermOp>)) {
    let tail = session.frame_tail();
    let selection = session
        .buffer
        .anchor()
        .map(|a| (a.min(session.buffer.cursor()), a.max(session.buffer.cursor())));
    let mut ops = Vec::new();
    display.render(
        &FrameInput {
            prompt: session.prompt(),
            buffer: session.buffer.text(),
            point: session.buffer.cursor(),
            selection,
            suggestion_tail: tail.as_deref(),
            show_hint: session.settings().autosuggest.hint,
            modified_mark: false,
            force_horizontal: false,
        },
        &mut ops,
    );
    if !ops.is_empty() {
        emit(ops);
    }
}

/// The built-in binding set covering the editing core. Richer keymaps
/// come from the host's binding infrastructure.
pub struct DefaultBindings {
    pub ctrl_d_exits: bool,
}

impl KeyBindings for DefaultBindings {
    fn dispatch(&mut self, key: KeyEvent, s: &mut EditSession<'_>) -> EditResult {
        match key {
            KeyEvent::Char(c) => s.insert_char(c),
            KeyEvent::Enter => return EditResult::Accept,
            KeyEvent::Backspace => s.backspace(),
            KeyEvent::Delete => s.delete_forward(),
            KeyEvent::CtrlBackspace => s.backward_kill_word(),
            KeyEvent::CtrlHome => s.backward_kill_line(),
            KeyEvent::CtrlC => return EditResult::Abort,
            KeyEvent::CtrlD => {
                if s.buffer.is_empty() && self.ctrl_d_exits {
                    return EditResult::Exit;
                }
                s.delete_forward();
            }
            KeyEvent::CtrlZ => {
                s.buffer.undo();
            }
            KeyEvent::Left => {
                let cursor = s.buffer.cursor();
                let prev = s.buffer.prev_boundary(cursor);
                s.buffer.set_cursor(prev);
            }
            KeyEvent::Right | KeyEvent::End => {
                if s.cursor_at_end_with_suggestion() {
                    s.accept_suggestion(SuggestionAction::InsertToEnd);
                } else if key == KeyEvent::End {
                    let len = s.buffer.len();
                    s.buffer.set_cursor(len);
                } else {
                    let cursor = s.buffer.cursor();
                    let next = s.buffer.next_boundary(cursor);
                    s.buffer.set_cursor(next);
                }
            }
            KeyEvent::CtrlRight => {
                if s.cursor_at_end_with_suggestion() {
                    s.accept_suggestion(SuggestionAction::InsertNextWord);
                }
            }
            KeyEvent::ShiftRight => {
                if s.cursor_at_end_with_suggestion() {
                    s.accept_suggestion(SuggestionAction::InsertNextFullWord);
                }
            }
            KeyEvent::Home => s.buffer.set_cursor(0),
            KeyEvent::Tab | KeyEvent::Up | KeyEvent::Down => {}
        }
        EditResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_tokenize::{NoAliases, NoArgmatchers};

    fn settings() -> Settings {
        Settings::default()
    }

    fn type_line(text: &str) -> Vec<KeyEvent> {
        let mut keys: Vec<KeyEvent> = text.chars().map(KeyEvent::Char).collect();
        keys.push(KeyEvent::Enter);
        keys
    }

    fn run(keys: Vec<KeyEvent>, settings: &Settings) -> (EditOutcome, usize) {
        let mut session = EditSession::new("> ", settings, &NoAliases, &NoArgmatchers);
        let mut keys = keys;
        let mut bindings = DefaultBindings { ctrl_d_exits: true };
        let mut display = DisplayManager::new(80, 10, 25);
        let mut frames = 0usize;
        let outcome = run_edit(
            &mut session,
            &mut keys,
            &mut bindings,
            &mut display,
            &mut |_ops| frames += 1,
            None,
            None,
        );
        (outcome, frames)
    }

    #[test]
    fn typing_and_enter_accepts_line() {
        crate::signal::clear_signaled();
        let (outcome, frames) = run(type_line("dir /w"), &settings());
        assert_eq!(outcome, EditOutcome::Accepted("dir /w".to_string()));
        assert!(frames > 0);
    }

    #[test]
    fn backspace_edits_line() {
        crate::signal::clear_signaled();
        let mut keys = type_line("dirx");
        // Insert a backspace before the Enter.
        keys.insert(keys.len() - 1, KeyEvent::Backspace);
        let (outcome, _) = run(keys, &settings());
        assert_eq!(outcome, EditOutcome::Accepted("dir".to_string()));
    }

    #[test]
    fn ctrl_c_cancels() {
        crate::signal::clear_signaled();
        let keys = vec![KeyEvent::Char('d'), KeyEvent::CtrlC];
        let (outcome, _) = run(keys, &settings());
        assert_eq!(outcome, EditOutcome::Canceled);
    }

    #[test]
    fn ctrl_d_on_empty_line_exits() {
        crate::signal::clear_signaled();
        let keys = vec![KeyEvent::CtrlD];
        let (outcome, _) = run(keys, &settings());
        assert_eq!(outcome, EditOutcome::Exit);
    }

    #[test]
    fn right_at_eol_accepts_suggestion() {
        crate::signal::clear_signaled();
        let s = settings();
        let mut session = EditSession::new("> ", &s, &NoAliases, &NoArgmatchers);
        let mut keys: Vec<KeyEvent> = vec![
            KeyEvent::Char('g'),
            KeyEvent::Char('i'),
            KeyEvent::Right,
            KeyEvent::Enter,
        ];
        let mut bindings = DefaultBindings { ctrl_d_exits: true };
        let mut display = DisplayManager::new(80, 10, 25);
        let suggest = |state: &LineState| {
            state
                .line()
                .starts_with("gi")
                .then(|| Suggestion::new("git status", 0))
        };
        let outcome = run_edit(
            &mut session,
            &mut keys,
            &mut bindings,
            &mut display,
            &mut |_| {},
            Some(&suggest),
            None,
        );
        assert_eq!(outcome, EditOutcome::Accepted("git status".to_string()));
    }

    #[test]
    fn undo_reverts_insertion() {
        crate::signal::clear_signaled();
        let keys = vec![
            KeyEvent::Char('a'),
            KeyEvent::Char('b'),
            KeyEvent::CtrlZ,
            KeyEvent::Enter,
        ];
        let (outcome, _) = run(keys, &settings());
        assert_eq!(outcome, EditOutcome::Accepted("a".to_string()));
    }

    #[test]
    fn single_match_completion_inserts_with_append() {
        use core_matches::{MatchBuilder, MatchKind, NoFs};

        let s = settings();
        let mut session = EditSession::new("> ", &s, &NoAliases, &NoArgmatchers);
        session.insert_str("ec");

        let generator = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("echo", MatchKind::Command);
            b.add_text("dir", MatchKind::Command);
            true
        };
        let count = session.complete(&[&generator], &NoFs);
        assert_eq!(count, 1);
        assert_eq!(session.buffer.text(), "echo ");
        assert_eq!(session.buffer.cursor(), 5);
    }

    #[test]
    fn ambiguous_completion_leaves_buffer_alone() {
        use core_matches::{MatchBuilder, MatchKind, NoFs};

        let s = settings();
        let mut session = EditSession::new("> ", &s, &NoAliases, &NoArgmatchers);
        session.insert_str("e");

        let generator = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_text("echo", MatchKind::Command);
            b.add_text("exit", MatchKind::Command);
            true
        };
        let count = session.complete(&[&generator], &NoFs);
        assert_eq!(count, 2);
        assert_eq!(session.buffer.text(), "e");
    }

    #[test]
    fn directory_completion_leaves_cursor_after_separator() {
        use core_matches::{MatchBuilder, MatchDesc, MatchKind, NoFs};

        let mut s = settings();
        s.matching.translate_slashes = core_config::SlashTranslation::Slash;
        let mut session = EditSession::new("> ", &s, &NoAliases, &NoArgmatchers);
        session.insert_str("cd s");

        let generator = |_: &LineState, b: &mut MatchBuilder<'_>| {
            b.add_match(MatchDesc::new("src\\", MatchKind::Dir));
            true
        };
        let count = session.complete(&[&generator], &NoFs);
        assert_eq!(count, 1);
        assert_eq!(session.buffer.text(), "cd src/");
        assert_eq!(session.buffer.cursor(), 7);
    }

    #[test]
    fn signal_flag_cancels_cycle() {
        crate::signal::clear_signaled();
        crate::signal::set_signaled();
        let (outcome, _) = run(type_line("never"), &settings());
        assert_eq!(outcome, EditOutcome::Canceled);
        crate::signal::clear_signaled();
    }
}
