//! Command-bounds tokenization: split a line into command regions on
//! unquoted `&`/`|` separators that are not part of a redirection.
//!
//! The yielded spans cover the whole input except the separator bytes
//! themselves; a region that follows a separator keeps its leading
//! padding space. `rem` gets its special treatment at the word level
//! (its arguments are verbatim), not here.

use crate::alias::AliasCache;
use crate::cursor::ByteCursor;
use crate::state::{InputClass, TokState, classify, transition};
use crate::{CommandSpan, NAME_DELIMS};

/// Whether alias expansion is permitted for a command region starting
/// at `offset`: only at the start of the line or after `&`/`|` (or the
/// second byte of `&&`/`||`), ignoring at most one leading space when
/// `enhanced_doskey` is on.
pub fn is_alias_allowed(bytes: &[u8], offset: usize, enhanced_doskey: bool) -> bool {
    let mut spaces = 0usize;
    let mut o = offset;
    if bytes.get(o) == Some(&b' ') {
        spaces += 1;
        o += 1;
    }
    if bytes.get(o) == Some(&b' ') {
        return false;
    }

    let mut i = offset;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b'&' | b'|' => return enhanced_doskey && spaces <= 1,
            b' ' => {
                spaces += 1;
                if spaces > 1 {
                    return false;
                }
            }
            _ => return false,
        }
    }

    spaces == 0
}

/// Splits a buffer into command regions.
pub struct CommandTokenizer<'a, 'c, 'r> {
    cur: ByteCursor<'a>,
    quote: (u8, u8),
    aliases: &'c mut AliasCache<'r>,
    enhanced_doskey: bool,
}

impl<'a, 'c, 'r> CommandTokenizer<'a, 'c, 'r> {
    pub fn new(
        bytes: &'a [u8],
        quote_pair: (u8, u8),
        aliases: &'c mut AliasCache<'r>,
        enhanced_doskey: bool,
    ) -> Self {
        Self {
            cur: ByteCursor::new(bytes),
            quote: quote_pair,
            aliases,
            enhanced_doskey,
        }
    }

    /// Length of the whitespace-delimited token at the cursor when it
    /// names an alias; the cursor is left untouched.
    fn alias_word_len(&mut self) -> usize {
        let start = self.cur.pos();
        let bytes = self.cur.bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end] != b' ' && bytes[end] != b'\t' {
            end += 1;
        }
        if end == start {
            return 0;
        }
        let Ok(name) = std::str::from_utf8(&bytes[start..end]) else {
            return 0;
        };
        if self.aliases.is_alias(name) { end - start } else { 0 }
    }

    /// Skip sub-shell openings: runs of spaces, `@`, and `(` at the
    /// start of a command region. Returns the number of parens
    /// skipped so the same count of trailing `)` can be trimmed. The
    /// cursor only advances when at least one paren was found.
    fn skip_leading_parens(&mut self, first: &mut bool) -> u32 {
        let mut parens = 0;

        let mut do_parens = true;
        if (*first || self.enhanced_doskey)
            && self.cur.peek() == Some(b'(')
            && self.alias_word_len() > 0
        {
            // `(` can begin an alias name; leave it alone then.
            do_parens = false;
        }

        if do_parens {
            let mut keep = self.cur.pos();
            while let Some(c) = self.cur.peek() {
                if c != b' ' && c != b'@' && c != b'(' {
                    break;
                }
                self.cur.next();
                if c == b'(' {
                    *first = false;
                    if matches!(self.cur.peek(), Some(b' ') | Some(b'@')) {
                        self.cur.next();
                    }
                    keep = self.cur.pos();
                    parens += 1;
                }
            }
            self.cur.set_pos(keep);
        }

        parens
    }

    /// Walk back over trailing `)` (and spaces) matching skipped
    /// leading parens; returns the trimmed absolute end.
    fn trim_trailing_parens(&self, offset: usize, mut end: usize, mut parens: u32) -> usize {
        let bytes = self.cur.bytes();
        let mut ret = end;
        while parens > 0 && end > offset {
            end -= 1;
            if bytes[end] == b')' {
                parens -= 1;
                ret = end;
            } else if bytes[end] != b' ' {
                break;
            }
        }
        ret
    }

    pub fn next(&mut self) -> Option<CommandSpan> {
        if !self.cur.more() {
            return None;
        }

        let (oq, cq) = self.quote;
        let mut first_command = self.cur.pos() == 0;

        // After the first command, skip past a separator (&, |, &&, ||).
        if !first_command
            && let Some(c1) = self.cur.peek()
            && (c1 == b'&' || c1 == b'|')
        {
            self.cur.next();
            if self.cur.peek() == Some(c1) {
                self.cur.next();
            }
        }

        let parens = self.skip_leading_parens(&mut first_command);

        let offset = self.cur.pos();
        let mut in_quote = false;
        let mut any_text = false;
        let mut state = TokState::Space;

        // The first word can contain any non-space characters if it's
        // an alias (including separators: the alias name is opaque).
        let alias_len = self.alias_word_len();
        if alias_len > 0 {
            any_text = true;
            for _ in 0..alias_len {
                self.cur.next();
            }
        }

        while let Some(c) = self.cur.next() {
            if in_quote {
                if c == cq {
                    in_quote = false;
                } else if c == b'^' {
                    self.cur.next();
                }
                continue;
            }

            if c == b'^' {
                self.cur.next();
            }

            let input = classify(c);
            let mut new_state = transition(state, input);

            if (new_state == TokState::Text || new_state == TokState::Digit)
                && !any_text
                && !NAME_DELIMS.contains(&c)
                && c != b'&'
                && c != b'|'
            {
                any_text = true;
                // `@2>nul` style: after `@`, a digit directly followed
                // by `>` stays part of the text.
                if input == InputClass::Digit && new_state == TokState::Text {
                    let pos = self.cur.pos();
                    if pos >= 2
                        && self.cur.bytes()[pos - 2] == b'@'
                        && self.cur.peek() == Some(b'>')
                    {
                        self.cur.next();
                    }
                }
            }

            if new_state == TokState::Break && !any_text {
                new_state = TokState::Text;
            }

            if matches!(new_state, TokState::ArgStart | TokState::Valid | TokState::Bad) {
                // A redirection token ended; `c` starts a new token.
                state = TokState::Space;
                new_state = transition(state, input);
            }

            if new_state == TokState::Break {
                self.cur.rewind();
                break;
            }

            if c == oq {
                in_quote = true;
            }

            state = new_state;
        }

        let end = self.trim_trailing_parens(offset, self.cur.pos(), parens);
        let length = end.saturating_sub(offset);

        Some(CommandSpan {
            offset: offset as u32,
            length: length as u32,
            alias_allowed: is_alias_allowed(self.cur.bytes(), offset, self.enhanced_doskey),
        })
    }
}
