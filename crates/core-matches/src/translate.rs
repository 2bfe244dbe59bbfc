//! Path-separator translation for file-system match text.

use crate::SYSTEM_SEPARATOR;
use core_config::SlashTranslation;

/// Rewrite every path separator in `text` to `sep`.
pub fn normalize_separators(text: &mut String, sep: u8) {
    debug_assert!(sep == b'/' || sep == b'\\');
    let (from, to) = if sep == b'/' { ('\\', "/") } else { ('/', "\\") };
    if text.contains(from) {
        *text = text.replace(from, to);
    }
}

/// The separator byte a translation mode resolves to, given the
/// separator the user last typed (None when they typed none yet).
pub fn translation_separator(mode: SlashTranslation, typed: Option<u8>) -> Option<u8> {
    match mode {
        SlashTranslation::Off => None,
        SlashTranslation::System => Some(SYSTEM_SEPARATOR),
        SlashTranslation::Slash => Some(b'/'),
        SlashTranslation::Backslash => Some(b'\\'),
        SlashTranslation::Automatic => Some(typed.unwrap_or(SYSTEM_SEPARATOR)),
    }
}

/// Apply a translation mode to match text in place.
pub fn translate_slashes(text: &mut String, mode: SlashTranslation, typed: Option<u8>) {
    if let Some(sep) = translation_separator(mode, typed) {
        normalize_separators(text, sep);
    }
}
