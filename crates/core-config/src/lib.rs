//! Configuration loading and the settings registry.
//!
//! Parses `quill.toml` (working directory first, then the platform
//! config dir) into a read-mostly [`Settings`] value. Unknown fields
//! are ignored so the file format can grow without breaking older
//! binaries; a parse error falls back to defaults rather than aborting
//! startup, and is logged under the `config` target.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Slash translation applied to file-system match text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashTranslation {
    Off,
    System,
    Slash,
    Backslash,
    #[default]
    Automatic,
}

/// Case sensitivity for match selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    Off,
    On,
    #[default]
    Relaxed,
}

/// Where matching directories sort relative to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirs {
    Before,
    #[default]
    With,
    After,
}

/// How a duplicate history line is handled on add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DupeMode {
    Add,
    Ignore,
    #[default]
    ErasePrev,
}

/// Whether `!` history designators expand, and inside which quotes
/// expansion is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandMode {
    Off,
    On,
    NotSquoted,
    NotDquoted,
    #[default]
    NotQuoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    #[default]
    Off,
    Save,
    Show,
}

impl TimestampMode {
    pub fn saves(self) -> bool {
        !matches!(self, TimestampMode::Off)
    }
}

/// Auto-answer for the host's "Terminate batch job (Y/N)?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAnswer {
    #[default]
    Off,
    AnswerYes,
    AnswerNo,
}

/// An SGR attribute triple for one semantic face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ColourSpec {
    pub fg: Option<u8>,
    pub bg: Option<u8>,
    pub bold: bool,
}

impl ColourSpec {
    pub const fn new(fg: Option<u8>, bg: Option<u8>, bold: bool) -> Self {
        Self { fg, bg, bold }
    }

    /// Render as the parameter list of an SGR sequence (no `\x1b[`/`m`).
    pub fn sgr_params(&self) -> String {
        let mut out = String::from("0");
        if self.bold {
            out.push_str(";1");
        }
        if let Some(fg) = self.fg {
            out.push_str(&format!(";38;5;{fg}"));
        }
        if let Some(bg) = self.bg {
            out.push_str(&format!(";48;5;{bg}"));
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DoskeySettings {
    pub enhanced: bool,
}

impl Default for DoskeySettings {
    fn default() -> Self {
        Self { enhanced: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub translate_slashes: SlashTranslation,
    pub ignore_case: CaseMode,
    pub substring: bool,
    pub sort_dirs: SortDirs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub shared: bool,
    pub max_lines: u32,
    pub ignore_space: bool,
    pub dupe_mode: DupeMode,
    pub expand_mode: ExpandMode,
    pub time_stamp: TimestampMode,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            shared: false,
            max_lines: 10_000,
            ignore_space: true,
            dupe_mode: DupeMode::default(),
            expand_mode: ExpandMode::default(),
            time_stamp: TimestampMode::default(),
        }
    }
}

/// Hard cap on history lines; a `max_lines` of 0 means this value.
pub const MAX_HISTORY_LINES: u32 = 999_999;

impl HistorySettings {
    /// The effective line limit, with 0 meaning "unlimited (capped)".
    pub fn effective_max_lines(&self) -> u32 {
        if self.max_lines == 0 || self.max_lines > MAX_HISTORY_LINES {
            MAX_HISTORY_LINES
        } else {
            self.max_lines
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CmdSettings {
    pub auto_answer: AutoAnswer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Maximum rows the input area may occupy; 0 means the screen height.
    pub max_input_rows: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutosuggestSettings {
    pub enable: bool,
    #[serde(rename = "async")]
    pub r#async: bool,
    pub hint: bool,
    pub original_case: bool,
    /// Generator names tried in order until one yields a suggestion.
    pub strategy: String,
}

impl Default for AutosuggestSettings {
    fn default() -> Self {
        Self {
            enable: true,
            r#async: true,
            hint: true,
            original_case: true,
            strategy: "match_prev_cmd history completion".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColourSettings {
    pub input: ColourSpec,
    pub suggestion: ColourSpec,
    pub hint: ColourSpec,
    pub modmark: ColourSpec,
    pub description: ColourSpec,
    pub selection: ColourSpec,
}

impl Default for ColourSettings {
    fn default() -> Self {
        Self {
            input: ColourSpec::default(),
            suggestion: ColourSpec::new(Some(244), None, false),
            hint: ColourSpec::new(Some(244), None, false),
            modmark: ColourSpec::new(Some(208), None, false),
            description: ColourSpec::new(Some(39), None, false),
            selection: ColourSpec::new(Some(0), Some(153), false),
        }
    }
}

/// Every setting the core consumes, populated from `quill.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub doskey: DoskeySettings,
    #[serde(rename = "match")]
    pub matching: MatchSettings,
    pub history: HistorySettings,
    pub cmd: CmdSettings,
    pub terminal: TerminalSettings,
    pub autosuggest: AutosuggestSettings,
    pub colour: ColourSettings,
}

impl Settings {
    /// The ordered suggestion strategy names.
    pub fn suggestion_strategies(&self) -> Vec<&str> {
        self.autosuggest.strategy.split_whitespace().collect()
    }
}

/// Best-effort config path following platform conventions.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("quill.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("quill").join("quill.toml");
    }
    PathBuf::from("quill.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Settings> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<Settings>(&content) {
            Ok(settings) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(settings)
            }
            Err(e) => {
                warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
                Ok(Settings::default())
            }
        }
    } else {
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing_file() {
        let s = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(s.history.dupe_mode, DupeMode::ErasePrev);
        assert!(s.history.ignore_space);
        assert_eq!(s.matching.translate_slashes, SlashTranslation::Automatic);
        assert!(s.autosuggest.enable);
        assert_eq!(
            s.suggestion_strategies(),
            vec!["match_prev_cmd", "history", "completion"]
        );
    }

    #[test]
    fn parses_enum_settings() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[match]\ntranslate_slashes = \"slash\"\nignore_case = \"on\"\nsubstring = true\n\
             [history]\ndupe_mode = \"ignore\"\ntime_stamp = \"save\"\nmax_lines = 500\n\
             [cmd]\nauto_answer = \"answer_yes\"\n",
        )
        .unwrap();
        let s = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(s.matching.translate_slashes, SlashTranslation::Slash);
        assert_eq!(s.matching.ignore_case, CaseMode::On);
        assert!(s.matching.substring);
        assert_eq!(s.history.dupe_mode, DupeMode::Ignore);
        assert_eq!(s.history.time_stamp, TimestampMode::Save);
        assert_eq!(s.history.effective_max_lines(), 500);
        assert_eq!(s.cmd.auto_answer, AutoAnswer::AnswerYes);
    }

    #[test]
    fn zero_max_lines_means_capped_unlimited() {
        let mut s = Settings::default();
        s.history.max_lines = 0;
        assert_eq!(s.history.effective_max_lines(), MAX_HISTORY_LINES);
        s.history.max_lines = 2_000_000;
        assert_eq!(s.history.effective_max_lines(), MAX_HISTORY_LINES);
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not [valid toml").unwrap();
        let s = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(!s.history.shared);
    }

    #[test]
    fn colour_spec_sgr() {
        let c = ColourSpec::new(Some(244), None, false);
        assert_eq!(c.sgr_params(), "0;38;5;244");
        let b = ColourSpec::new(Some(1), Some(2), true);
        assert_eq!(b.sgr_params(), "0;1;38;5;1;48;5;2");
        assert_eq!(ColourSpec::default().sgr_params(), "0");
    }

    #[test]
    fn unknown_fields_tolerated() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[future]\nknob = 3\n[history]\nshared = true\n").unwrap();
        let s = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(s.history.shared);
    }
}
