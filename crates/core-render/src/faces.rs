//! Face bytes and the SGR palette.
//!
//! Each rendered byte carries a face byte selecting the SGR attributes
//! it was painted with. Faces are compared during the diff: a changed
//! face forces a repaint even when the character is unchanged.

use core_config::ColourSettings;

pub const FACE_NORMAL: u8 = b' ';
pub const FACE_INPUT: u8 = b'i';
pub const FACE_SUGGESTION: u8 = b's';
pub const FACE_HINT: u8 = b'h';
pub const FACE_MODMARK: u8 = b'*';
pub const FACE_SELECTION: u8 = b'v';
pub const FACE_DESCRIPTION: u8 = b'd';
/// Scroll markers (`<`/`>`) get their own face so they repaint when
/// they appear or disappear.
pub const FACE_SCROLL: u8 = b'<';

/// Maps face bytes to SGR parameter strings for one frame.
#[derive(Debug, Clone, Default)]
pub struct FacePalette {
    input: String,
    suggestion: String,
    hint: String,
    modmark: String,
    selection: String,
    description: String,
}

impl FacePalette {
    pub fn from_settings(colours: &ColourSettings) -> Self {
        Self {
            input: colours.input.sgr_params(),
            suggestion: colours.suggestion.sgr_params(),
            hint: colours.hint.sgr_params(),
            modmark: colours.modmark.sgr_params(),
            selection: colours.selection.sgr_params(),
            description: colours.description.sgr_params(),
        }
    }

    /// The SGR parameter list for a face byte; `"0"` resets.
    pub fn sgr_params(&self, face: u8) -> &str {
        match face {
            FACE_INPUT => &self.input,
            FACE_SUGGESTION => &self.suggestion,
            FACE_HINT => &self.hint,
            FACE_MODMARK => &self.modmark,
            FACE_SELECTION => &self.selection,
            FACE_DESCRIPTION => &self.description,
            _ => "0",
        }
    }
}
