//! File-system probing seam for late match promotion.

use crate::{MatchFlags, MatchKind, MatchType};

/// Attributes of a file-system entry, as far as match typing cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsAttrs {
    pub dir: bool,
    pub hidden: bool,
    pub system: bool,
    pub readonly: bool,
    pub link: bool,
    pub orphaned: bool,
}

impl FsAttrs {
    pub fn to_match_type(self) -> MatchType {
        let kind = if self.dir { MatchKind::Dir } else { MatchKind::File };
        let mut flags = MatchFlags::empty();
        flags.set(MatchFlags::HIDDEN, self.hidden);
        flags.set(MatchFlags::SYSTEM, self.system);
        flags.set(MatchFlags::READONLY, self.readonly);
        flags.set(MatchFlags::LINK, self.link);
        flags.set(MatchFlags::ORPHANED, self.orphaned);
        MatchType { kind, flags }
    }
}

/// Answers "what is this path on disk"; None when it does not exist.
pub trait FsProber {
    fn probe(&self, path: &str) -> Option<FsAttrs>;
}

/// Prober that sees an empty file system.
pub struct NoFs;

impl FsProber for NoFs {
    fn probe(&self, _path: &str) -> Option<FsAttrs> {
        None
    }
}

impl<F> FsProber for F
where
    F: Fn(&str) -> Option<FsAttrs>,
{
    fn probe(&self, path: &str) -> Option<FsAttrs> {
        self(path)
    }
}

/// The real file system.
pub struct RealFs;

impl FsProber for RealFs {
    fn probe(&self, path: &str) -> Option<FsAttrs> {
        let trimmed = path.trim_end_matches(['/', '\\']);
        let lookup = if trimmed.is_empty() { path } else { trimmed };
        let symlink_meta = std::fs::symlink_metadata(lookup).ok()?;
        let link = symlink_meta.file_type().is_symlink();
        let meta = if link {
            std::fs::metadata(lookup).ok()
        } else {
            Some(symlink_meta)
        };
        let orphaned = link && meta.is_none();
        let (dir, readonly) = meta
            .map(|m| (m.is_dir(), m.permissions().readonly()))
            .unwrap_or((false, false));

        #[cfg(windows)]
        let (hidden, system) = {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
            const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
            match std::fs::symlink_metadata(lookup) {
                Ok(m) => (
                    m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0,
                    m.file_attributes() & FILE_ATTRIBUTE_SYSTEM != 0,
                ),
                Err(_) => (false, false),
            }
        };
        #[cfg(not(windows))]
        let (hidden, system) = (
            std::path::Path::new(lookup)
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false),
            false,
        );

        Some(FsAttrs {
            dir,
            hidden,
            system,
            readonly,
            link,
            orphaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attrs_map_to_match_type() {
        let t = FsAttrs {
            dir: true,
            hidden: true,
            ..Default::default()
        }
        .to_match_type();
        assert_eq!(t.kind, MatchKind::Dir);
        assert!(t.flags.contains(MatchFlags::HIDDEN));

        let f = FsAttrs::default().to_match_type();
        assert_eq!(f.kind, MatchKind::File);
        assert!(f.flags.is_empty());
    }
}
