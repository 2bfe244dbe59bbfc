//! Word-bounds tokenization inside one command region.
//!
//! Yields successive words, each carrying the delimiter byte its scan
//! ended on and an `is_redir_arg` flag for redirection targets. The
//! first word of a command selects the word-break treatment for the
//! rest of the region: `rem` arguments are the verbatim remainder,
//! basic-word-break built-ins keep the narrow delimiter set, shell
//! word-break built-ins add `/`, and everything else uses the full
//! word delimiter set.

use crate::cmd_state::{CmdState, SpecialKind, special_command};
use crate::cursor::ByteCursor;
use crate::state::{InputClass, TokState, classify, transition};
use crate::{COMMAND_DELIMS, NAME_DELIMS, WORD_DELIMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    /// Byte offset within the tokenized region.
    pub offset: u32,
    pub length: u32,
    /// Delimiter byte the word's scan ended on; 0 at end of input.
    pub delim: u8,
    pub is_redir_arg: bool,
}

pub struct WordTokenizer<'a> {
    cur: ByteCursor<'a>,
    quote: (u8, u8),
    cmd_state: CmdState,
    command_word: bool,
    next_redir_arg: bool,
    special: SpecialKind,
    rem_pending: bool,
}

impl<'a> WordTokenizer<'a> {
    /// `at_beginning` is false when an alias word already consumed the
    /// command position of this region.
    pub fn new(bytes: &'a [u8], quote_pair: (u8, u8), at_beginning: bool) -> Self {
        Self {
            cur: ByteCursor::new(bytes),
            quote: quote_pair,
            cmd_state: CmdState::new(false),
            command_word: at_beginning,
            next_redir_arg: false,
            special: SpecialKind::None,
            rem_pending: false,
        }
    }

    fn delims_for(&self, command_word: bool, redir_arg: bool, in_word: bool) -> &'static [u8] {
        if redir_arg || (command_word && !in_word) {
            NAME_DELIMS
        } else if command_word {
            COMMAND_DELIMS
        } else {
            match self.special {
                SpecialKind::Basic => NAME_DELIMS,
                SpecialKind::Shell => COMMAND_DELIMS,
                SpecialKind::None | SpecialKind::Rem => WORD_DELIMS,
            }
        }
    }

    /// Skip separators and mark the start of a new word. Returns the
    /// word start and whether it is a redirection argument.
    fn start_new_word(&mut self, command_word: bool) -> (usize, bool) {
        self.cmd_state.next_word();
        let redir_arg = std::mem::take(&mut self.next_redir_arg);
        while let Some(c) = self.cur.peek() {
            if !self.delims_for(command_word, redir_arg, false).contains(&c) {
                break;
            }
            self.cur.next();
        }
        (self.cur.pos(), redir_arg)
    }

    /// The verbatim remainder following `rem`: one word, stripped of
    /// surrounding whitespace.
    fn take_rem_remainder(&mut self) -> Option<WordSpan> {
        self.rem_pending = false;
        let bytes = self.cur.bytes();
        let mut start = self.cur.pos();
        while start < bytes.len() && (bytes[start] == b' ' || bytes[start] == b'\t') {
            start += 1;
        }
        let mut end = bytes.len();
        while end > start && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
            end -= 1;
        }
        self.cur.set_pos(bytes.len());
        if start >= end {
            return None;
        }
        Some(WordSpan {
            offset: start as u32,
            length: (end - start) as u32,
            delim: b' ',
            is_redir_arg: false,
        })
    }

    pub fn next(&mut self) -> Option<WordSpan> {
        if self.rem_pending {
            return self.take_rem_remainder();
        }
        if !self.cur.more() {
            return None;
        }

        let (oq, cq) = self.quote;
        let command_word = self.command_word;

        let (mut start_word, mut redir_arg) = self.start_new_word(command_word);
        let mut end_word = start_word;
        let mut c: u8 = 0;
        let mut first_char = true;
        let mut first_slash = false;
        let mut in_quote = false;
        let mut state = TokState::Space;

        loop {
            if in_quote {
                let Some(ch) = self.cur.next() else { break };
                c = ch;
                if c == cq {
                    in_quote = false;
                } else if c == b'^' {
                    self.cur.next();
                }
                end_word = self.cur.pos();
            } else {
                c = self.cur.peek0();

                if first_char {
                    first_slash = c == b'/';
                }

                let mut input = classify(c);
                let mut new_state = transition(state, input);
                if new_state == TokState::Break {
                    new_state = TokState::Text;
                }

                // ArgStart, Valid, and Bad mean the bytes since
                // end_word form a redirection token and `c` starts a
                // new token.
                if matches!(new_state, TokState::ArgStart | TokState::Valid | TokState::Bad) {
                    self.next_redir_arg = new_state == TokState::ArgStart;

                    // If the word is not empty, return it.
                    if end_word > start_word {
                        break;
                    }

                    state = TokState::Space;
                    let (s, ra) = self.start_new_word(command_word);
                    start_word = s;
                    end_word = s;
                    redir_arg = ra;
                    c = self.cur.peek0();
                    input = classify(c);
                    new_state = transition(state, input);
                    if new_state == TokState::Break {
                        new_state = TokState::Text;
                    }
                }

                // Text or space after a digit keeps the digit in the word.
                if new_state <= TokState::Space && state <= TokState::Digit {
                    end_word = self.cur.pos();
                }

                // Redirection carry above must run even at end of
                // input, so `foo >` registers an empty redir arg word.
                if !self.cur.more() {
                    break;
                }

                // A caret escaping a space-class byte behaves as that
                // byte for word-break purposes.
                if c == b'^'
                    && let Some(c2) = self.cur.peek_at(1)
                    && classify(c2) == InputClass::Space
                {
                    c = c2;
                    new_state = transition(state, InputClass::Space);
                }

                // Built-in commands break at their delimiter set.
                if new_state == TokState::Text && self.cmd_state.test(c, new_state) {
                    break;
                }

                // Forward slash in a command word is a word break.
                if c == b'/' && !first_slash && !first_char && command_word && !redir_arg {
                    break;
                }

                self.cur.next();
                if c == b'^' {
                    self.cur.next();
                }

                if new_state == TokState::Space {
                    break;
                }
                if new_state == TokState::Text
                    && self
                        .delims_for(command_word, redir_arg, !first_slash && !first_char)
                        .contains(&c)
                {
                    break;
                }

                if new_state == TokState::Text {
                    end_word = self.cur.pos();
                }

                if c == oq {
                    in_quote = true;
                }

                state = new_state;
            }

            first_char = false;
        }

        let length = end_word.saturating_sub(start_word);

        if command_word && !redir_arg {
            self.command_word = false;
            self.special = special_command(&self.cur.bytes()[start_word..end_word]);
            if self.special == SpecialKind::Rem {
                self.rem_pending = true;
            }
        }

        Some(WordSpan {
            offset: start_word as u32,
            length: length as u32,
            delim: if self.cur.more() { c } else { 0 },
            is_redir_arg: redir_arg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(region: &str) -> Vec<(String, bool)> {
        let mut tok = WordTokenizer::new(region.as_bytes(), (b'"', b'"'), true);
        let mut out = Vec::new();
        while let Some(w) = tok.next() {
            let text = region[w.offset as usize..(w.offset + w.length) as usize].to_string();
            out.push((text, w.is_redir_arg));
        }
        out
    }

    fn texts(region: &str) -> Vec<String> {
        words(region).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn splits_simple_words() {
        assert_eq!(texts("copy a.txt b.txt"), vec!["copy", "a.txt", "b.txt"]);
    }

    #[test]
    fn rem_takes_remainder_verbatim() {
        assert_eq!(texts("rem foo "), vec!["rem", "foo"]);
        assert_eq!(texts("rem a&b  c "), vec!["rem", "a&b  c"]);
        assert_eq!(texts("rem"), vec!["rem"]);
    }

    #[test]
    fn quoted_spans_stay_single_words() {
        assert_eq!(texts("type \"my file.txt\""), vec!["type", "\"my file.txt\""]);
    }

    #[test]
    fn redirection_target_is_flagged() {
        let w = words("dir > out.txt");
        assert_eq!(w[0], ("dir".to_string(), false));
        assert_eq!(w[1], ("out.txt".to_string(), true));
    }

    #[test]
    fn trailing_redirection_registers_empty_arg() {
        let w = words("foo >");
        assert_eq!(w[0], ("foo".to_string(), false));
        assert_eq!(w[1], (String::new(), true));
    }

    #[test]
    fn handle_duplication_yields_no_arg() {
        let w = words("foo 2>&1 bar");
        assert_eq!(w[0], ("foo".to_string(), false));
        assert_eq!(w[1], ("bar".to_string(), false));
    }

    #[test]
    fn slash_breaks_command_word() {
        // `cd` breaks at the slash; for a shell word-break command the
        // slash is an ignored delimiter, so the flag body follows.
        assert_eq!(texts("cd/d c:\\x"), vec!["cd", "d", "c:\\x"]);
    }

    #[test]
    fn set_keeps_full_word_break_chars() {
        // `set` is a basic-word-break command: `'` and `+` are not
        // delimiters for its arguments.
        assert_eq!(texts("set x'y+z"), vec!["set", "x'y+z"]);
        // For ordinary commands they are.
        assert_eq!(texts("foo x'y+z"), vec!["foo", "x", "y", "z"]);
    }

    #[test]
    fn caret_escaped_space_breaks_word() {
        assert_eq!(texts("echo a^ b"), vec!["echo", "a", "b"]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(texts("type \"half done"), vec!["type", "\"half done"]);
    }

    #[test]
    fn digits_stay_in_words() {
        assert_eq!(texts("echo a2b 42"), vec!["echo", "a2b", "42"]);
    }
}
