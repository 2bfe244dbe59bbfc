//! End-to-end tokenization scenarios over whole lines.

use core_tokenize::{
    CollectMode, LineState, NoAliases, NoArgmatchers, Word, WordCollector,
};
use pretty_assertions::assert_eq;

fn collect(line: &str, cursor: usize) -> core_tokenize::Collected {
    WordCollector::new(&NoAliases, &NoArgmatchers).collect_words(
        line,
        cursor,
        CollectMode::StopAtCursor,
    )
}

fn texts<'a>(line: &'a str, words: &[Word]) -> Vec<&'a str> {
    words.iter().map(|w| w.text(line)).collect()
}

#[test]
fn rem_command_bounds_and_words() {
    let line = "rem foo & dir";
    let c = collect(line, line.len());

    // Two commands: `rem foo ` and ` dir`, both alias-eligible.
    assert_eq!(c.commands.len(), 2);
    assert_eq!(c.commands[0].offset, 0);
    assert_eq!(c.commands[0].length, 8);
    assert!(c.commands[0].alias_allowed);
    assert_eq!(&line[c.commands[1].span()], " dir");
    assert!(c.commands[1].alias_allowed);

    // `rem` consumes its arguments verbatim: one argument word.
    let first_cmd_words: Vec<&Word> = c
        .words
        .iter()
        .filter(|w| w.end() <= c.commands[0].offset + c.commands[0].length)
        .collect();
    let args: Vec<&&Word> = first_cmd_words.iter().filter(|w| !w.command_word).collect();
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].text(line), "foo");
}

#[test]
fn command_spans_are_monotonic_and_disjoint() {
    let line = "a & b|c && d || (e) & f > out 2>&1";
    let c = collect(line, line.len());
    let mut prev_end = 0u32;
    for cmd in &c.commands {
        assert!(cmd.offset >= prev_end);
        prev_end = cmd.offset + cmd.length;
    }
    assert!(prev_end as usize <= line.len());
}

#[test]
fn word_spans_are_contained_and_disjoint_per_command() {
    let line = "copy \"a b\" dest & type x";
    let c = collect(line, line.len());
    for w in &c.words {
        assert!(w.end() as usize <= line.len());
        // Span content is reachable through the line.
        let _ = w.text(line);
    }
    for pair in c.words.windows(2) {
        assert!(pair[0].end() <= pair[1].offset || pair[1].length == 0);
    }
}

#[test]
fn retokenizing_a_word_span_is_idempotent() {
    let line = "copy src\\file.txt dest";
    let c = collect(line, line.len());
    for w in &c.words {
        if w.length == 0 || w.quoted {
            continue;
        }
        let sub = w.text(line);
        let again = WordCollector::new(&NoAliases, &NoArgmatchers).collect_words(
            sub,
            sub.len(),
            CollectMode::WholeLine,
        );
        let non_empty: Vec<_> = again.words.iter().filter(|w| w.length > 0).collect();
        assert_eq!(non_empty.len(), 1, "span {sub:?} should stay one word");
        assert_eq!(non_empty[0].text(sub), sub);
    }
}

#[test]
fn line_state_needle_is_end_word_at_cursor() {
    let line = "copy sr";
    let c = collect(line, line.len());
    let ls = LineState::from_collected(line, line.len(), &c);
    assert_eq!(ls.needle(), "sr");
    assert_eq!(ls.end_word_offset(), 5);
}

#[test]
fn line_state_follows_cursor_command() {
    let line = "dir & ty";
    let c = collect(line, line.len());
    let ls = LineState::from_collected(line, line.len(), &c);
    assert_eq!(ls.needle(), "ty");
    assert!(ls.words()[0].command_word);
    assert_eq!(ls.words()[0].text(line), "ty");
}

#[test]
fn cursor_mid_line_stops_collection() {
    let line = "alpha beta & gamma";
    let c = collect(line, 5);
    assert_eq!(texts(line, &c.words), vec!["alpha"]);
}

#[test]
fn redirection_words_flagged_across_line() {
    let line = "foo > bar.txt baz";
    let c = collect(line, line.len());
    let t = texts(line, &c.words);
    assert_eq!(t, vec!["foo", "bar.txt", "baz"]);
    assert!(c.words[1].is_redir_arg);
    assert!(!c.words[2].is_redir_arg);
}
