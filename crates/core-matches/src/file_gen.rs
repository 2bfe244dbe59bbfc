//! The file-system match generator.
//!
//! Globs `<end word>*` and adds every entry untyped; the late
//! promotion pass types them file/dir and attaches attribute bits.
//! Always reports "handled" so it runs last in a generator chain.

use crate::builder::MatchBuilder;
use crate::pipeline::MatchGenerator;
use crate::{MatchKind, is_path_separator};
use core_tokenize::LineState;
use std::path::{Path, PathBuf};

pub struct FileMatchGenerator {
    pub include_hidden: bool,
    pub include_system: bool,
}

impl Default for FileMatchGenerator {
    fn default() -> Self {
        Self {
            include_hidden: true,
            include_system: false,
        }
    }
}

impl FileMatchGenerator {
    /// The directory to enumerate and the prefix to keep on matches,
    /// derived from the needle's path portion.
    fn split_needle(needle: &str) -> (PathBuf, String) {
        match needle.bytes().rposition(is_path_separator) {
            Some(i) => (PathBuf::from(&needle[..=i]), needle[..=i].to_string()),
            None => (PathBuf::from("."), String::new()),
        }
    }

    fn is_hidden(path: &Path) -> bool {
        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
            std::fs::symlink_metadata(path)
                .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
                .unwrap_or(false)
        }
        #[cfg(not(windows))]
        {
            path.file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false)
        }
    }

    fn is_system(path: &Path) -> bool {
        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
            std::fs::symlink_metadata(path)
                .map(|m| m.file_attributes() & FILE_ATTRIBUTE_SYSTEM != 0)
                .unwrap_or(false)
        }
        #[cfg(not(windows))]
        {
            let _ = path;
            false
        }
    }
}

impl MatchGenerator for FileMatchGenerator {
    fn generate(&self, state: &LineState, builder: &mut MatchBuilder<'_>) -> bool {
        let needle = state.needle();
        let (dir, prefix) = Self::split_needle(needle);

        let Ok(entries) = std::fs::read_dir(&dir) else {
            return true;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !self.include_hidden && Self::is_hidden(&path) {
                continue;
            }
            if !self.include_system && Self::is_system(&path) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            builder.add_text(format!("{prefix}{name}"), MatchKind::None);
        }

        true
    }
}
