//! Shell-aware tokenization of a command line.
//!
//! Splits a buffer into commands and words under the host command
//! interpreter's quoting, caret-escape, redirection, and
//! special-command rules. Two layers:
//!
//! - [`CommandTokenizer`] yields command spans (split on unquoted `&`
//!   and `|` that are not part of a redirection) with an
//!   `alias_allowed` flag per span.
//! - [`WordTokenizer`] yields words inside one command region, each
//!   carrying its preceding delimiter byte and redirection-argument
//!   flag.
//!
//! [`WordCollector`] drives both and applies the post passes (alias
//!   first words, flag splitting, end-word synthesis, quote
//!   stripping).
//!
//! The tokenizer never fails: malformed input produces best-effort
//! words, and an unterminated quote extends the final word to the end
//! of the input.

mod alias;
mod collect;
mod command;
mod cmd_state;
mod cursor;
mod state;
mod word;

pub use alias::{AliasCache, AliasResolver, NoAliases};
pub use cmd_state::{CmdState, SpecialKind, special_command};
pub use collect::{ArgmatcherLookup, CollectMode, Collected, NoArgmatchers, WordCollector};
pub use command::{CommandTokenizer, is_alias_allowed};
pub use word::{WordSpan, WordTokenizer};

/// Word-break delimiters for command names (first word, redirection args).
pub const NAME_DELIMS: &[u8] = b"@ \t=;,(";
/// Word-break delimiters inside command words and for shell-word-break
/// command arguments.
pub const COMMAND_DELIMS: &[u8] = b"@ \t=;,(/";
/// Full word-break delimiter set for ordinary arguments.
pub const WORD_DELIMS: &[u8] = b" \t\n'`=+;,()[]{}";

/// A word over the line buffer: a half-open byte span plus flags.
///
/// Invariants: spans are non-overlapping within one command;
/// `command_word` holds for the first non-redirection word of each
/// command; quotes bounding a word are excluded from the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub offset: u32,
    pub length: u32,
    pub command_word: bool,
    pub is_alias: bool,
    pub is_redir_arg: bool,
    pub quoted: bool,
    /// The single byte that preceded the word; 0 when none.
    pub delim: u8,
}

impl Word {
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.length) as usize
    }

    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.span()]
    }

    pub fn end(&self) -> u32 {
        self.offset + self.length
    }
}

/// A command region over the line buffer.
///
/// `alias_allowed` is true only when the region is preceded by nothing
/// other than the start of the line, `&`, `|`, `&&`, or `||`, ignoring
/// at most one leading space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpan {
    pub offset: u32,
    pub length: u32,
    pub alias_allowed: bool,
}

impl CommandSpan {
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.length) as usize
    }
}

/// The tokenized view of the command containing the cursor, consumed
/// by the match pipeline and the suggestion engine.
#[derive(Debug, Clone)]
pub struct LineState {
    line: String,
    cursor: usize,
    words: Vec<Word>,
}

impl LineState {
    /// Build from a collection pass: keeps the words of the command
    /// containing the cursor (the trailing run starting at the last
    /// alias or command word).
    pub fn from_collected(line: &str, cursor: usize, collected: &Collected) -> Self {
        let start = collected
            .words
            .iter()
            .rposition(|w| w.command_word || w.is_alias)
            .unwrap_or(0);
        Self {
            line: line.to_string(),
            cursor,
            words: collected.words[start..].to_vec(),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// The word at the cursor; the needle for match selection.
    pub fn end_word(&self) -> Option<&Word> {
        self.words.last()
    }

    /// Byte offset of the end word within the line.
    pub fn end_word_offset(&self) -> usize {
        self.end_word().map(|w| w.offset as usize).unwrap_or(self.cursor)
    }

    /// The needle text: from the end word's start to the cursor.
    pub fn needle(&self) -> &str {
        let start = self.end_word_offset().min(self.cursor);
        &self.line[start..self.cursor]
    }
}
