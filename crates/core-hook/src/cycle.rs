//! One hooked console read, served end to end.
//!
//! Routes the read through the dispatch layer; when the outcome is
//! "edit a line", runs edit cycles until one produces a line: a
//! cancelled edit emits a newline and re-enters, Ctrl+D (when
//! configured) turns into `exit`, and a script reload bubbles out so
//! the caller can re-initialize and reopen the read.

use crate::console::{ConsoleApi, ConsoleRead};
use crate::dispatch::{HostHooks, ReadOutcome};
use crate::doskey::DoskeyResolver;
use crate::edit::{EditOutcome, EditSession, KeyBindings, KeySource, run_edit};
use crate::signal::{clear_signaled, is_signaled};
use core_config::Settings;
use core_history::HistoryDb;
use core_render::{DisplayManager, TermOp};
use core_suggest::{Suggestion, SuggestionWorker};
use core_tokenize::{AliasResolver, ArgmatcherLookup, LineState};
use tracing::{debug, warn};

/// The collaborators an edit cycle needs, bundled.
pub struct EditHost<'a> {
    pub console: &'a dyn ConsoleApi,
    pub settings: &'a Settings,
    pub aliases: &'a dyn AliasResolver,
    pub argmatchers: &'a dyn ArgmatcherLookup,
    pub doskey: &'a dyn DoskeyResolver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Hand this to the host as the read result.
    Read(ConsoleRead),
    /// Scripts were asked to reload; re-initialize and read again.
    Reload,
}

/// Build a display manager sized to the console, honoring
/// `terminal.max_input_rows` (0 means the whole screen height).
pub fn display_for(console: &dyn ConsoleApi, settings: &Settings) -> DisplayManager {
    let (cols, rows) = console.screen_size();
    let max_rows = match settings.terminal.max_input_rows {
        0 => rows,
        n => (n as u32).min(rows),
    };
    DisplayManager::new(cols, max_rows, rows)
}

/// Serve one hooked console read.
#[allow(clippy::too_many_arguments)]
pub fn serve_read(
    host: &EditHost<'_>,
    hooks: &mut HostHooks<'_>,
    mut history: Option<&mut HistoryDb>,
    max_chars: usize,
    keys: &mut dyn KeySource,
    bindings: &mut dyn KeyBindings,
    display: &mut DisplayManager,
    emit: &mut dyn FnMut(Vec<TermOp>),
    suggest_fn: Option<&dyn Fn(&LineState) -> Option<Suggestion>>,
    worker: Option<&SuggestionWorker>,
) -> ServeOutcome {
    match hooks.hook_read(max_chars) {
        ReadOutcome::Answered(text) => ServeOutcome::Read(ConsoleRead::Text(text)),
        ReadOutcome::QueuedLine(line) => ServeOutcome::Read(ConsoleRead::Text(line)),
        ReadOutcome::Passthrough => ServeOutcome::Read(host.console.read_console(max_chars)),
        ReadOutcome::EditLine { prompt } => {
            loop {
                let mut session =
                    EditSession::new(&prompt, host.settings, host.aliases, host.argmatchers);
                let outcome = run_edit(
                    &mut session,
                    keys,
                    bindings,
                    display,
                    emit,
                    suggest_fn,
                    worker,
                );

                match outcome {
                    EditOutcome::Accepted(line) => {
                        if let Some(db) = history.as_deref_mut()
                            && let Err(e) = db.add(&line)
                        {
                            // The edit still works when history is
                            // unavailable; the line is just not
                            // persisted.
                            warn!(target: "hook", error = %e, "history_add_failed");
                        }
                        let first = hooks.accept_line(&line, host.doskey);
                        return ServeOutcome::Read(ConsoleRead::Text(first));
                    }
                    EditOutcome::Canceled => {
                        if is_signaled() {
                            clear_signaled();
                        }
                        debug!(target: "hook", "edit_canceled_reentering");
                        host.console.write_console("\r\n");
                        continue;
                    }
                    EditOutcome::Eof => return ServeOutcome::Read(ConsoleRead::Eof),
                    EditOutcome::Reload => return ServeOutcome::Reload,
                    EditOutcome::Exit => {
                        let first = hooks.accept_line("exit", host.doskey);
                        return ServeOutcome::Read(ConsoleRead::Text(first));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::FakeConsole;
    use crate::dispatch::WriteOutcome;
    use crate::doskey::NoDoskey;
    use crate::edit::{DefaultBindings, KeyEvent};
    use crate::prompt::PROMPT_TAG_HIDDEN;
    use core_config::DupeMode;
    use core_tokenize::{NoAliases, NoArgmatchers};

    fn type_line(text: &str) -> Vec<KeyEvent> {
        let mut keys: Vec<KeyEvent> = text.chars().map(KeyEvent::Char).collect();
        keys.push(KeyEvent::Enter);
        keys
    }

    fn serve(
        keys: Vec<KeyEvent>,
        history: Option<&mut HistoryDb>,
        console: &FakeConsole,
    ) -> ServeOutcome {
        crate::signal::clear_signaled();
        let settings = Settings::default();
        let host = EditHost {
            console,
            settings: &settings,
            aliases: &NoAliases,
            argmatchers: &NoArgmatchers,
            doskey: &NoDoskey,
        };
        let mut hooks = HostHooks::new(console, settings.cmd.auto_answer);
        assert_eq!(
            hooks.hook_write(&format!("{PROMPT_TAG_HIDDEN}C:\\>")),
            WriteOutcome::Swallowed
        );
        let mut keys = keys;
        let mut bindings = DefaultBindings { ctrl_d_exits: true };
        let mut display = DisplayManager::new(80, 10, 25);
        serve_read(
            &host,
            &mut hooks,
            history,
            1024,
            &mut keys,
            &mut bindings,
            &mut display,
            &mut |_| {},
            None,
            None,
        )
    }

    #[test]
    fn accepted_line_returns_with_crlf_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let settings = core_config::HistorySettings {
            dupe_mode: DupeMode::Add,
            ..Default::default()
        };
        let mut db = HistoryDb::open(dir.path(), 1, &settings).unwrap();
        let console = FakeConsole::new();
        let outcome = serve(type_line("dir /w"), Some(&mut db), &console);
        assert_eq!(
            outcome,
            ServeOutcome::Read(ConsoleRead::Text("dir /w\r\n".to_string()))
        );
        assert_eq!(db.entries().len(), 1);
        assert_eq!(db.entries()[0].text, "dir /w");
    }

    #[test]
    fn canceled_edit_emits_newline_and_reenters() {
        let console = FakeConsole::new();
        let mut keys = vec![KeyEvent::Char('x'), KeyEvent::CtrlC];
        keys.extend(type_line("dir"));
        let outcome = serve(keys, None, &console);
        assert_eq!(
            outcome,
            ServeOutcome::Read(ConsoleRead::Text("dir\r\n".to_string()))
        );
        assert!(console.written_text().contains("\r\n"));
    }

    #[test]
    fn ctrl_d_on_empty_line_becomes_exit() {
        let console = FakeConsole::new();
        let outcome = serve(vec![KeyEvent::CtrlD], None, &console);
        assert_eq!(
            outcome,
            ServeOutcome::Read(ConsoleRead::Text("exit\r\n".to_string()))
        );
    }

    #[test]
    fn display_sizing_honors_max_input_rows() {
        let console = FakeConsole::new();
        let mut settings = Settings::default();
        settings.terminal.max_input_rows = 0;
        let _full = display_for(&console, &settings);
        settings.terminal.max_input_rows = 4;
        let _limited = display_for(&console, &settings);
    }

    #[test]
    fn edit_still_works_when_history_is_unavailable() {
        let console = FakeConsole::new();
        let outcome = serve(type_line("no history"), None, &console);
        assert_eq!(
            outcome,
            ServeOutcome::Read(ConsoleRead::Text("no history\r\n".to_string()))
        );
    }
}
