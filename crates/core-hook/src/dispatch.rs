//! Read/write/environment dispatch.
//!
//! The hooked console write recognizes tagged prompt writes (swallowed
//! and captured) and the pager's continuation prompt; the hooked read
//! distinguishes the single-character Y/N path, queued-line playback
//! of multi-command doskey expansions, and the line-editor path.

use crate::console::ConsoleApi;
use crate::doskey::{DoskeyResolver, segment_expansion};
use crate::prompt::{strip_prompt_tag, tag_prompt_value};
use core_config::AutoAnswer;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// The host's batch-termination prompt (fallback wording; localized
/// variants come from the host's message table when available).
pub const TERMINATE_PROMPT: &str = "Terminate batch job (Y/N)? ";
/// The pager's continuation prompt.
pub const MORE_PROMPT: &str = "More? ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A tagged prompt write: captured, not forwarded.
    Swallowed,
    /// Forward to the real console write.
    Forwarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Return this text to the caller directly (auto-answer or queued
    /// character); it has been echoed already.
    Answered(String),
    /// Return this queued segment (CRLF included).
    QueuedLine(String),
    /// Run the line editor against the captured prompt.
    EditLine { prompt: String },
    /// Fall through to the real console read.
    Passthrough,
}

pub struct HostHooks<'a> {
    console: &'a dyn ConsoleApi,
    auto_answer: AutoAnswer,
    captured_prompt: Option<String>,
    last_forwarded: Option<String>,
    more_continuation: bool,
    queued_lines: VecDeque<String>,
    queued_chars: VecDeque<char>,
    answered: u8,
}

impl<'a> HostHooks<'a> {
    pub fn new(console: &'a dyn ConsoleApi, auto_answer: AutoAnswer) -> Self {
        Self {
            console,
            auto_answer,
            captured_prompt: None,
            last_forwarded: None,
            more_continuation: false,
            queued_lines: VecDeque::new(),
            queued_chars: VecDeque::new(),
            answered: 0,
        }
    }

    pub fn captured_prompt(&self) -> Option<&str> {
        self.captured_prompt.as_deref()
    }

    pub fn queued_line_count(&self) -> usize {
        self.queued_lines.len()
    }

    pub fn queue_char(&mut self, c: char) {
        self.queued_chars.push_back(c);
    }

    /// The hooked console write.
    pub fn hook_write(&mut self, text: &str) -> WriteOutcome {
        self.more_continuation = text == MORE_PROMPT;

        if let Some(prompt) = strip_prompt_tag(text) {
            trace!(target: "hook", len = prompt.len(), "prompt_captured");
            self.captured_prompt = Some(text.to_string());
            return WriteOutcome::Swallowed;
        }

        self.last_forwarded = Some(text.to_string());
        WriteOutcome::Forwarded
    }

    /// The hooked console-title set: forwarded as-is (interception
    /// point for title decoration).
    pub fn hook_set_title(&self, title: &str) {
        self.console.set_title(title);
    }

    /// The hooked environment set: any `PROMPT` update is rewritten on
    /// the fly to carry the tag.
    pub fn hook_set_env(&self, name: &str, value: Option<&str>) {
        if let Some(value) = value
            && name.eq_ignore_ascii_case("prompt")
        {
            self.console.set_env(name, Some(&tag_prompt_value(value)));
            return;
        }
        self.console.set_env(name, value);
    }

    /// The hooked console read.
    pub fn hook_read(&mut self, max_chars: usize) -> ReadOutcome {
        let more_continuation = std::mem::take(&mut self.more_continuation);

        // Single characters serve Y/N/All prompts.
        if max_chars == 1 {
            if let Some(reply) = self.check_auto_answer() {
                let s = reply.to_string();
                self.console.write_console(&s);
                return ReadOutcome::Answered(s);
            }
            if let Some(c) = self.queued_chars.pop_front() {
                return ReadOutcome::Answered(c.to_string());
            }
            return ReadOutcome::Passthrough;
        }

        self.answered = 0;

        let have_prompt = self
            .captured_prompt
            .as_deref()
            .is_some_and(|p| !p.is_empty());

        if more_continuation || !have_prompt {
            // The host wants line input for reasons other than command
            // entry; feed it the next queued expansion segment if one
            // is pending.
            if let Some(line) = self.queued_lines.pop_front() {
                if more_continuation {
                    self.console.write_console(&line);
                    self.console.write_console("\r\n");
                }
                return ReadOutcome::QueuedLine(format!("{line}\r\n"));
            }
            return ReadOutcome::Passthrough;
        }

        if let Some(line) = self.queued_lines.pop_front() {
            return ReadOutcome::QueuedLine(format!("{line}\r\n"));
        }

        let prompt = self.captured_prompt.clone().unwrap_or_default();
        ReadOutcome::EditLine { prompt }
    }

    /// Accept an edited line: resolve doskey expansion, queue the
    /// trailing command segments, and return the first segment as the
    /// host sees it (CRLF appended). Resets the captured prompt so a
    /// follow-on `set /p` read is not mistaken for command entry.
    pub fn accept_line(&mut self, line: &str, resolver: &dyn DoskeyResolver) -> String {
        let mut segments = match resolver.resolve(line) {
            Some(expansion) => segment_expansion(&expansion),
            None => vec![line.to_string()],
        };
        if segments.is_empty() {
            segments.push(String::new());
        }
        let first = segments.remove(0);
        for segment in segments {
            self.queued_lines.push_back(segment);
        }
        self.captured_prompt = None;
        debug!(
            target: "hook",
            queued = self.queued_lines.len(),
            "line_accepted"
        );
        format!("{first}\r\n")
    }

    /// Reset state after a signal interrupted the edit.
    pub fn cleanup_after_signal(&mut self) {
        self.queued_lines.clear();
        self.queued_chars.clear();
        self.captured_prompt = None;
    }

    fn check_auto_answer(&mut self) -> Option<char> {
        // Don't loop forever if the host ignores the answer.
        if self.answered >= 2 {
            return None;
        }
        let answer = match self.auto_answer {
            AutoAnswer::Off => return None,
            AutoAnswer::AnswerYes => 'y',
            AutoAnswer::AnswerNo => 'n',
        };
        let prompt = self.last_forwarded.as_deref().unwrap_or("");
        if !prompt.contains(TERMINATE_PROMPT) {
            return None;
        }
        // The host reads one character at a time until `\n`.
        self.answered += 1;
        if self.answered >= 2 {
            return Some('\n');
        }
        Some(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::FakeConsole;
    use crate::doskey::NoDoskey;
    use crate::prompt::PROMPT_TAG_HIDDEN;

    fn tagged(prompt: &str) -> String {
        format!("{PROMPT_TAG_HIDDEN}{prompt}")
    }

    #[test]
    fn tagged_prompt_write_is_swallowed_and_captured() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        assert_eq!(hooks.hook_write(&tagged("C:\\>")), WriteOutcome::Swallowed);
        assert!(hooks.captured_prompt().is_some());
    }

    #[test]
    fn ordinary_writes_forward() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        assert_eq!(hooks.hook_write("build output\n"), WriteOutcome::Forwarded);
        assert!(hooks.captured_prompt().is_none());
    }

    #[test]
    fn prompt_env_updates_get_tagged() {
        let console = FakeConsole::new();
        let hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.hook_set_env("PROMPT", Some("$p$g"));
        let stored = console.get_env("prompt").unwrap();
        assert!(stored.starts_with(PROMPT_TAG_HIDDEN));
        hooks.hook_set_env("PATH", Some("C:\\bin"));
        assert_eq!(console.get_env("path").as_deref(), Some("C:\\bin"));
    }

    #[test]
    fn read_with_captured_prompt_runs_editor() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.hook_write(&tagged("C:\\>"));
        match hooks.hook_read(1024) {
            ReadOutcome::EditLine { prompt } => assert!(prompt.contains("C:\\>")),
            other => panic!("expected edit line, got {other:?}"),
        }
    }

    #[test]
    fn read_without_prompt_passes_through() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        assert_eq!(hooks.hook_read(1024), ReadOutcome::Passthrough);
    }

    #[test]
    fn multi_command_expansion_drains_across_reads() {
        let console = FakeConsole::new();
        struct Macro;
        impl DoskeyResolver for Macro {
            fn resolve(&self, line: &str) -> Option<String> {
                (line == "gg").then(|| "git fetch\u{1}git status".to_string())
            }
            fn lookup(&self, name: &str) -> Option<String> {
                (name == "gg").then(String::new)
            }
        }

        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.hook_write(&tagged("C:\\>"));
        assert!(matches!(hooks.hook_read(1024), ReadOutcome::EditLine { .. }));

        let first = hooks.accept_line("gg", &Macro);
        assert_eq!(first, "git fetch\r\n");
        assert_eq!(hooks.queued_line_count(), 1);

        // The next read (no captured prompt now) drains the queue.
        assert_eq!(
            hooks.hook_read(1024),
            ReadOutcome::QueuedLine("git status\r\n".to_string())
        );
        assert_eq!(hooks.hook_read(1024), ReadOutcome::Passthrough);
    }

    #[test]
    fn plain_accept_returns_line_with_crlf() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.hook_write(&tagged("C:\\>"));
        assert_eq!(hooks.accept_line("dir", &NoDoskey), "dir\r\n");
        assert_eq!(hooks.queued_line_count(), 0);
        // Prompt reset: `set /p` style reads fall through.
        assert_eq!(hooks.hook_read(1024), ReadOutcome::Passthrough);
    }

    #[test]
    fn auto_answer_injects_answer_then_newline() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::AnswerYes);
        hooks.hook_write(TERMINATE_PROMPT);
        assert_eq!(hooks.hook_read(1), ReadOutcome::Answered("y".to_string()));
        assert_eq!(hooks.hook_read(1), ReadOutcome::Answered("\n".to_string()));
        // No infinite loop: the third read falls through.
        assert_eq!(hooks.hook_read(1), ReadOutcome::Passthrough);
        // The answer was echoed.
        assert!(console.written_text().contains('y'));
    }

    #[test]
    fn auto_answer_ignores_other_prompts() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::AnswerNo);
        hooks.hook_write("Delete all files (Y/N)? ");
        assert_eq!(hooks.hook_read(1), ReadOutcome::Passthrough);
    }

    #[test]
    fn more_continuation_echoes_queued_segment() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.hook_write(&tagged("C:\\>"));
        assert!(matches!(hooks.hook_read(1024), ReadOutcome::EditLine { .. }));
        let _ = hooks.accept_line("multi", &SplitTwo);
        hooks.hook_write(MORE_PROMPT);
        match hooks.hook_read(1024) {
            ReadOutcome::QueuedLine(line) => assert_eq!(line, "part2\r\n"),
            other => panic!("expected queued line, got {other:?}"),
        }
        assert!(console.written_text().contains("part2"));
    }

    struct SplitTwo;
    impl DoskeyResolver for SplitTwo {
        fn resolve(&self, _line: &str) -> Option<String> {
            Some("part1\u{1}part2".to_string())
        }
        fn lookup(&self, _name: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn queued_chars_serve_single_char_reads() {
        let console = FakeConsole::new();
        let mut hooks = HostHooks::new(&console, AutoAnswer::Off);
        hooks.queue_char('a');
        assert_eq!(hooks.hook_read(1), ReadOutcome::Answered("a".to_string()));
        assert_eq!(hooks.hook_read(1), ReadOutcome::Passthrough);
    }
}
