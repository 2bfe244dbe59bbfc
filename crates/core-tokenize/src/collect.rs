//! Word collection: drives the command and word tokenizers over a
//! line and applies the post passes (alias first words, flag
//! splitting, `./` command merging, end-word synthesis, quote
//! stripping).

use crate::alias::{AliasCache, AliasResolver};
use crate::command::CommandTokenizer;
use crate::word::WordTokenizer;
use crate::{CommandSpan, Word};
use tracing::trace;

/// Collaborator answering whether a command registered an
/// argument-matcher marked deprecated; flag splitting is suppressed
/// for those commands.
pub trait ArgmatcherLookup {
    fn has_deprecated_argmatcher(&self, command: &str) -> bool;
}

pub struct NoArgmatchers;

impl ArgmatcherLookup for NoArgmatchers {
    fn has_deprecated_argmatcher(&self, _command: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// Collect up to the cursor and synthesize an end word there.
    StopAtCursor,
    /// Collect the whole line (classification / coloring pass).
    WholeLine,
}

/// The result of a collection pass.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    /// Offset of the command containing the cursor.
    pub command_offset: u32,
    pub words: Vec<Word>,
    pub commands: Vec<CommandSpan>,
}

pub struct WordCollector<'r> {
    resolver: &'r dyn AliasResolver,
    argmatchers: &'r dyn ArgmatcherLookup,
    quote_pair: (u8, u8),
    enhanced_doskey: bool,
    /// Merge `./` and `../` into the command word; set when slash
    /// translation normalizes to the system separator.
    merge_dot_slash: bool,
}

impl<'r> WordCollector<'r> {
    pub fn new(resolver: &'r dyn AliasResolver, argmatchers: &'r dyn ArgmatcherLookup) -> Self {
        Self {
            resolver,
            argmatchers,
            quote_pair: (b'"', b'"'),
            enhanced_doskey: true,
            merge_dot_slash: false,
        }
    }

    pub fn with_quote_pair(mut self, open: u8, close: u8) -> Self {
        self.quote_pair = (open, close);
        self
    }

    pub fn with_enhanced_doskey(mut self, on: bool) -> Self {
        self.enhanced_doskey = on;
        self
    }

    pub fn with_merge_dot_slash(mut self, on: bool) -> Self {
        self.merge_dot_slash = on;
        self
    }

    pub fn collect_words(&self, line: &str, cursor: usize, mode: CollectMode) -> Collected {
        let bytes = line.as_bytes();
        let cursor = cursor.min(bytes.len());
        let stop_at_cursor = mode == CollectMode::StopAtCursor;
        let line_stop = if stop_at_cursor { cursor } else { bytes.len() };

        let mut cache = AliasCache::new(self.resolver);
        let mut commands = Vec::new();
        {
            let mut tok = CommandTokenizer::new(
                &bytes[..line_stop],
                self.quote_pair,
                &mut cache,
                self.enhanced_doskey,
            );
            while let Some(cmd) = tok.next() {
                let containing = cursor >= cmd.offset as usize
                    && cursor <= (cmd.offset + cmd.length) as usize;
                commands.push(cmd);
                if stop_at_cursor && containing {
                    break;
                }
            }
        }
        if commands.is_empty() {
            commands.push(CommandSpan {
                offset: 0,
                length: 0,
                alias_allowed: false,
            });
        }

        let mut words: Vec<Word> = Vec::new();
        let mut command_offset = 0u32;
        let mut first = true;

        for cmd in &commands {
            first = true;

            let start = cmd.offset as usize;
            let cmd_len = cmd.length as usize;
            let mut doskey_len = 0usize;
            let mut deprecated = false;

            if cursor >= start {
                command_offset = cmd.offset;
            }

            // Leading padding inside the region (kept by the command
            // tokenizer) is not part of any word.
            let mut lead = 0usize;
            while lead < cmd_len && matches!(bytes[start + lead], b' ' | b'\t') {
                lead += 1;
            }

            let mut first_word_len = 0usize;
            while lead + first_word_len < cmd_len
                && !matches!(bytes[start + lead + first_word_len], b' ' | b'\t')
            {
                first_word_len += 1;
            }

            if first_word_len > 0 {
                let lookup = &line[start + lead..start + lead + first_word_len];
                if cmd.alias_allowed && cache.is_alias(lookup) {
                    words.push(Word {
                        offset: (start + lead) as u32,
                        length: first_word_len as u32,
                        command_word: first,
                        is_alias: true,
                        is_redir_arg: false,
                        quoted: false,
                        delim: 0,
                    });
                    first = false;

                    // Consume spaces after the alias so the word
                    // tokenizer doesn't start on a space and emit an
                    // empty follow-on word.
                    doskey_len = lead + first_word_len;
                    while start + doskey_len < line_stop
                        && matches!(bytes[start + doskey_len], b' ' | b'\t')
                    {
                        doskey_len += 1;
                    }
                }

                deprecated = self.argmatchers.has_deprecated_argmatcher(lookup);
            }

            let tok_start = start + doskey_len;
            let tok_len = cmd_len.saturating_sub(doskey_len);
            let mut word_tok =
                WordTokenizer::new(&bytes[tok_start..tok_start + tok_len], self.quote_pair, first);

            while let Some(token) = word_tok.next() {
                let mut word_offset = tok_start + token.offset as usize;
                let mut word_length = token.length as usize;

                // Plus sign is never a word break immediately after a
                // space.
                if word_offset >= 2
                    && bytes[word_offset - 1] == b'+'
                    && bytes[word_offset - 2] == b' '
                {
                    word_offset -= 1;
                    word_length += 1;
                }

                // Within a flag word (`-x` / `/x`), a colon splits the
                // word and a trailing run of `=` is appended to it.
                if !token.is_redir_arg
                    && !deprecated
                    && word_length > 1
                    && matches!(bytes[word_offset], b'-' | b'/')
                {
                    let body = &bytes[word_offset..word_offset + word_length];
                    if let Some(colon) = body.iter().position(|&b| b == b':') {
                        words.push(Word {
                            offset: word_offset as u32,
                            length: colon as u32,
                            command_word: first,
                            is_alias: false,
                            is_redir_arg: false,
                            quoted: false,
                            delim: b':',
                        });
                        first = false;
                        word_offset += colon + 1;
                        word_length -= colon + 1;
                    } else {
                        while word_offset + word_length < start + cmd_len
                            && bytes[word_offset + word_length] == b'='
                        {
                            word_length += 1;
                        }
                    }
                }

                words.push(Word {
                    offset: word_offset as u32,
                    length: word_length as u32,
                    command_word: first,
                    is_alias: false,
                    is_redir_arg: token.is_redir_arg,
                    quoted: false,
                    delim: token.delim,
                });

                first = false;
            }
        }

        // Merge `./` and `../` with the following word so the command
        // word survives separator normalization.
        if stop_at_cursor && self.merge_dot_slash && words.len() >= 2 {
            let n = words.len();
            let cword = words[n - 2];
            let nword = words[n - 1];
            if cword.command_word
                && cword.length > 0
                && nword.length > 0
                && nword.offset == cword.end()
                && bytes[nword.offset as usize] == b'/'
                && bytes[cword.offset as usize] == b'.'
                && (cword.length == 1
                    || (cword.length == 2 && bytes[cword.offset as usize + 1] == b'.'))
            {
                words[n - 2].length += nword.length;
                words.pop();
            }
        }

        // Add an empty word if none, or if stopping at the cursor and
        // it sits past the last word.
        let needs_end_word = match words.last() {
            None => true,
            Some(w) => stop_at_cursor && ((w.offset + w.length) as usize) < cursor,
        };
        if needs_end_word {
            let delim = if cursor > 0 { bytes[cursor - 1] } else { 0 };
            words.push(Word {
                offset: cursor as u32,
                length: 0,
                command_word: first,
                is_alias: false,
                is_redir_arg: false,
                quoted: false,
                delim,
            });
        }

        // Strip bounding quotes from the spans.
        let (oq, cq) = self.quote_pair;
        for word in &mut words {
            if word.length == 0 || word.is_alias {
                continue;
            }
            let s = word.offset as usize;
            let len = word.length as usize;

            let start_quoted = bytes[s] == oq;
            let mut end_quoted = false;
            if start_quoted && len > 1 && bytes[s + len - 1] == cq {
                let mut quoted = true;
                let mut last_end_quote = 0usize;
                let mut i = 1usize;
                while i < len {
                    if bytes[s + i] == cq {
                        if quoted {
                            last_end_quote = i;
                        }
                        quoted = !quoted;
                    } else if !quoted && bytes[s + i] == b'^' {
                        i += 1;
                    }
                    i += 1;
                }
                end_quoted = !quoted && last_end_quote + 1 == len;
            }

            word.offset += start_quoted as u32;
            word.length -= start_quoted as u32 + end_quoted as u32;
            word.quoted = start_quoted;
        }

        trace!(
            target: "tokenize",
            commands = commands.len(),
            words = words.len(),
            cursor,
            "collect_words"
        );

        Collected {
            command_offset,
            words,
            commands,
        }
    }
}
