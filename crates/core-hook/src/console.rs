//! The console API seam.
//!
//! Everything the hook layer needs from the OS console: read a line or
//! a character, write text, get/set environment variables, set the
//! title. The real implementation binds the Windows console; tests use
//! [`FakeConsole`].

use std::collections::HashMap;
use std::sync::Mutex;

/// What a (non-hooked) console read returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleRead {
    Text(String),
    Interrupted,
    Eof,
}

pub trait ConsoleApi {
    /// Blocking read of up to `max_chars` UTF-16 units, as the host's
    /// own console read would behave.
    fn read_console(&self, max_chars: usize) -> ConsoleRead;
    fn write_console(&self, text: &str);
    fn get_env(&self, name: &str) -> Option<String>;
    fn set_env(&self, name: &str, value: Option<&str>);
    fn set_title(&self, title: &str);
    /// (columns, rows) of the screen buffer.
    fn screen_size(&self) -> (u32, u32);
}

/// In-memory console for tests: scripted reads, recorded writes.
#[derive(Default)]
pub struct FakeConsole {
    pub reads: Mutex<Vec<ConsoleRead>>,
    pub written: Mutex<Vec<String>>,
    pub env: Mutex<HashMap<String, String>>,
    pub title: Mutex<Option<String>>,
}

impl FakeConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_read(&self, read: ConsoleRead) {
        self.reads.lock().expect("fake console").push(read);
    }

    pub fn written_text(&self) -> String {
        self.written.lock().expect("fake console").join("")
    }
}

impl ConsoleApi for FakeConsole {
    fn read_console(&self, _max_chars: usize) -> ConsoleRead {
        let mut reads = self.reads.lock().expect("fake console");
        if reads.is_empty() {
            ConsoleRead::Eof
        } else {
            reads.remove(0)
        }
    }

    fn write_console(&self, text: &str) {
        self.written
            .lock()
            .expect("fake console")
            .push(text.to_string());
    }

    fn get_env(&self, name: &str) -> Option<String> {
        self.env
            .lock()
            .expect("fake console")
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    fn set_env(&self, name: &str, value: Option<&str>) {
        let mut env = self.env.lock().expect("fake console");
        match value {
            Some(v) => {
                env.insert(name.to_ascii_lowercase(), v.to_string());
            }
            None => {
                env.remove(&name.to_ascii_lowercase());
            }
        }
    }

    fn set_title(&self, title: &str) {
        *self.title.lock().expect("fake console") = Some(title.to_string());
    }

    fn screen_size(&self) -> (u32, u32) {
        (80, 25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_scripts_reads_in_order() {
        let fake = FakeConsole::new();
        fake.push_read(ConsoleRead::Text("a".into()));
        fake.push_read(ConsoleRead::Interrupted);
        assert_eq!(fake.read_console(1), ConsoleRead::Text("a".into()));
        assert_eq!(fake.read_console(1), ConsoleRead::Interrupted);
        assert_eq!(fake.read_console(1), ConsoleRead::Eof);
    }

    #[test]
    fn env_is_case_insensitive() {
        let fake = FakeConsole::new();
        fake.set_env("PROMPT", Some("$p$g"));
        assert_eq!(fake.get_env("prompt").as_deref(), Some("$p$g"));
        fake.set_env("Prompt", None);
        assert_eq!(fake.get_env("PROMPT"), None);
    }
}
