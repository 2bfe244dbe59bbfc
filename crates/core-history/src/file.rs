//! Reading and patching history files.
//!
//! A history file is UTF-8 lines separated by `\n` (NUL and `\r` also
//! break lines). The master's first line is the concurrency tag.
//! Metadata lines begin with `|`: `|\ttime=<secs>` precedes the entry
//! it timestamps, and a line whose first byte was overwritten with `|`
//! is soft-deleted. Readers skip the tag, metadata, soft-deleted
//! lines, and any offset in the caller's removals overlay.

use crate::ctag::CTAG_PREFIX;
use std::collections::HashSet;
use std::fs::File;
use std::io;

pub const TIMESTAMP_PREFIX: &str = "|\ttime=";

/// One live entry as read from a bank file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Byte offset of the entry line within the file.
    pub offset: u64,
    pub text: String,
    /// Seconds since the epoch from the preceding metadata line.
    pub timestamp: Option<u64>,
    /// Offset of the timestamp metadata line, when present.
    pub timestamp_offset: Option<u64>,
}

#[inline]
fn is_line_breaker(b: u8) -> bool {
    b == 0 || b == b'\n' || b == b'\r'
}

/// Raw lines with their byte offsets (no skipping).
pub fn raw_lines(content: &[u8]) -> Vec<(u64, &[u8])> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i <= content.len() {
        if i == content.len() || is_line_breaker(content[i]) {
            if i > start {
                out.push((start as u64, &content[start..i]));
            }
            start = i + 1;
        }
        i += 1;
    }
    out
}

/// Statistics from one reading pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadStats {
    pub deleted: usize,
}

/// Walk the live entries of a bank's content. `removals` holds master
/// offsets this session already deleted (empty for session banks).
pub fn read_entries(
    content: &[u8],
    removals: &HashSet<u64>,
    stats: &mut ReadStats,
) -> Vec<EntryRecord> {
    let mut out = Vec::new();
    let mut pending_time: Option<(u64, u64)> = None;
    let mut first = true;

    for (offset, line) in raw_lines(content) {
        let text = String::from_utf8_lossy(line);

        if first {
            first = false;
            if text.starts_with(CTAG_PREFIX) {
                continue;
            }
        }

        if let Some(rest) = text.strip_prefix(TIMESTAMP_PREFIX) {
            pending_time = rest.trim().parse::<u64>().ok().map(|t| (t, offset));
            continue;
        }

        if line.first() == Some(&b'|') {
            stats.deleted += 1;
            pending_time = None;
            continue;
        }

        if removals.contains(&offset) {
            stats.deleted += 1;
            pending_time = None;
            continue;
        }

        let (timestamp, timestamp_offset) = match pending_time.take() {
            Some((t, o)) => (Some(t), Some(o)),
            None => (None, None),
        };
        out.push(EntryRecord {
            offset,
            text: text.into_owned(),
            timestamp,
            timestamp_offset,
        });
    }

    out
}

/// Overwrite the first byte of the line at `offset` with `|`,
/// soft-deleting it in place.
pub fn soft_delete_at(file: &File, offset: u64) -> io::Result<()> {
    write_at(file, offset, b"|")
}

#[cfg(unix)]
pub fn write_at(file: &File, offset: u64, data: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(data, offset)
}

#[cfg(unix)]
pub fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0usize;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        read += n;
    }
    Ok(())
}

#[cfg(windows)]
pub fn write_at(file: &File, offset: u64, data: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut written = 0usize;
    while written < data.len() {
        written += file.seek_write(&data[written..], offset + written as u64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(content: &str) -> Vec<EntryRecord> {
        let mut stats = ReadStats::default();
        read_entries(content.as_bytes(), &HashSet::new(), &mut stats)
    }

    #[test]
    fn skips_ctag_line() {
        let e = entries("|CTAG_1_2_3_4\ndir\ncd src\n");
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].text, "dir");
        assert_eq!(e[0].offset, 14);
        assert_eq!(e[1].text, "cd src");
    }

    #[test]
    fn attaches_timestamp_to_following_entry() {
        let e = entries("|CTAG_0_0_0_0\n|\ttime=1700000000\ndir\nver\n");
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].timestamp, Some(1_700_000_000));
        assert_eq!(e[0].text, "dir");
        assert_eq!(e[1].timestamp, None);
    }

    #[test]
    fn skips_soft_deleted_lines() {
        let mut stats = ReadStats::default();
        let e = read_entries(
            b"|CTAG_0_0_0_0\n|ir\necho x\n",
            &HashSet::new(),
            &mut stats,
        );
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].text, "echo x");
        assert_eq!(stats.deleted, 1);
    }

    #[test]
    fn skips_removal_offsets() {
        let content = b"|CTAG_0_0_0_0\naaa\nbbb\n";
        // `aaa` starts at offset 14.
        let mut removals = HashSet::new();
        removals.insert(14u64);
        let mut stats = ReadStats::default();
        let e = read_entries(content, &removals, &mut stats);
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].text, "bbb");
        assert_eq!(stats.deleted, 1);
    }

    #[test]
    fn session_files_have_no_ctag() {
        let e = entries("pwd\nls -la\n");
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].offset, 0);
    }

    #[test]
    fn crlf_and_nul_break_lines() {
        let e = entries("a\r\nb\0c\n");
        let texts: Vec<&str> = e.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
