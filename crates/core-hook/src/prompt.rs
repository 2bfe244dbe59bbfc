//! Prompt tagging and capture.
//!
//! The env hook prefixes the host's `PROMPT` value with a tag so the
//! write hook can recognize "this is the prompt being printed", swallow
//! the write, and stash the text for the next console read. Two tag
//! forms exist: the plain literal, and a "hidden" variant spelling the
//! letters Q U I L L each followed by a backspace, invisible if it
//! ever reaches a real terminal.

/// The literal prompt tag.
pub const PROMPT_TAG: &str = "@QUILL_PROMPT";
/// The hidden variant: letters each erased by a backspace.
pub const PROMPT_TAG_HIDDEN: &str = "Q\u{8}U\u{8}I\u{8}L\u{8}L\u{8}";

/// Rewrite a `PROMPT` environment value so the printed prompt carries
/// the hidden tag.
pub fn tag_prompt_value(value: &str) -> String {
    let base = if value.is_empty() { "$p$g" } else { value };
    format!("{PROMPT_TAG_HIDDEN}{base}")
}

/// If `text` begins with one of the prompt tags, return the prompt
/// body after the tag.
pub fn strip_prompt_tag(text: &str) -> Option<&str> {
    if let Some(rest) = text.strip_prefix(PROMPT_TAG_HIDDEN) {
        return Some(rest);
    }
    text.strip_prefix(PROMPT_TAG)
}

/// Honor backspaces in prompt bytes one-for-one on ASCII bytes.
/// Multibyte sequences pass through untouched; a backspace directly
/// after one removes only its final byte, which is a known open issue
/// with multibyte prompts.
pub fn filter_prompt_backspaces(prompt: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(prompt.len());
    for &b in prompt.as_bytes() {
        if b == 0x08 {
            out.pop();
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagging_prepends_hidden_tag() {
        let tagged = tag_prompt_value("$p$g");
        assert!(tagged.starts_with(PROMPT_TAG_HIDDEN));
        assert!(tagged.ends_with("$p$g"));
    }

    #[test]
    fn empty_prompt_gets_default() {
        assert!(tag_prompt_value("").ends_with("$p$g"));
    }

    #[test]
    fn strip_recognizes_both_tags() {
        assert_eq!(
            strip_prompt_tag(&format!("{PROMPT_TAG_HIDDEN}C:\\>")),
            Some("C:\\>")
        );
        assert_eq!(strip_prompt_tag(&format!("{PROMPT_TAG}C:\\>")), Some("C:\\>"));
        assert_eq!(strip_prompt_tag("C:\\>"), None);
    }

    #[test]
    fn backspaces_erase_one_for_one() {
        assert_eq!(filter_prompt_backspaces("ab\u{8}c"), "ac");
        assert_eq!(filter_prompt_backspaces("\u{8}\u{8}x"), "x");
        // The hidden tag erases itself entirely.
        assert_eq!(filter_prompt_backspaces(PROMPT_TAG_HIDDEN), "");
    }
}
