//! The history database proper: banks, the reap protocol, and
//! compaction.

use crate::ctag::ConcurrencyTag;
use crate::file::{ReadStats, TIMESTAMP_PREFIX, read_entries, soft_delete_at};
use crate::lock::{LockKind, lock_file};
use crate::{Bank, HistoryError, LineId, RESERVED_SEPARATOR, Result};
use core_config::{DupeMode, HistorySettings};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const MASTER_NAME: &str = "quill_history";
const REMOVALS_EXT: &str = "removals";
/// Compaction kicks in once this many soft-deleted lines accumulate
/// (or the line limit, whichever is larger).
const MIN_COMPACT_THRESHOLD: usize = 200;
const UNLIMITED_COMPACT_THRESHOLD: usize = 5000;

/// One loaded history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: LineId,
    pub text: String,
    pub timestamp: Option<u64>,
}

/// The self-deleting liveness marker next to the session file.
struct AliveFile {
    #[cfg_attr(windows, allow(dead_code))]
    path: PathBuf,
    _file: File,
}

impl AliveFile {
    #[cfg(windows)]
    fn create(path: &Path) -> std::io::Result<Self> {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_FLAG_DELETE_ON_CLOSE: u32 = 0x0400_0000;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .custom_flags(FILE_FLAG_DELETE_ON_CLOSE)
            .attributes(FILE_ATTRIBUTE_HIDDEN)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    #[cfg(not(windows))]
    fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).write(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }
}

#[cfg(not(windows))]
impl Drop for AliveFile {
    fn drop(&mut self) {
        // Windows deletes on handle close; elsewhere do it by hand.
        let _ = std::fs::remove_file(&self.path);
    }
}

pub struct HistoryDb {
    dir: PathBuf,
    master_path: PathBuf,
    session_path: PathBuf,
    removals_path: PathBuf,
    settings: HistorySettings,
    use_master: bool,

    master_file: Option<File>,
    session_file: Option<File>,
    master_ctag: Option<ConcurrencyTag>,
    _alive: Option<AliveFile>,

    entries: Vec<HistoryEntry>,
    master_len: usize,
    master_deleted: usize,
}

impl HistoryDb {
    /// Open (creating as needed) the history store in `dir` for this
    /// session. The session id keys the per-session files; the
    /// process id is the conventional choice.
    pub fn open(dir: &Path, session_id: u32, settings: &HistorySettings) -> Result<Self> {
        Self::open_internal(dir, session_id, settings, true)
    }

    pub fn open_without_master(
        dir: &Path,
        session_id: u32,
        settings: &HistorySettings,
    ) -> Result<Self> {
        Self::open_internal(dir, session_id, settings, false)
    }

    fn open_internal(
        dir: &Path,
        session_id: u32,
        settings: &HistorySettings,
        use_master: bool,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let master_path = dir.join(MASTER_NAME);
        let session_path = dir.join(format!("{MASTER_NAME}_{session_id}"));
        let removals_path = session_path.with_extension(REMOVALS_EXT);
        let alive_path = dir.join(format!("{MASTER_NAME}_{session_id}~"));

        let mut db = Self {
            dir: dir.to_path_buf(),
            master_path,
            session_path,
            removals_path,
            settings: settings.clone(),
            use_master,
            master_file: None,
            session_file: None,
            master_ctag: None,
            _alive: None,
            entries: Vec::new(),
            master_len: 0,
            master_deleted: 0,
        };

        if use_master {
            let master = open_rw(&db.master_path)?;
            {
                let _lock = lock_file(&master, LockKind::Exclusive)?;
                db.master_ctag = Some(ensure_ctag(&master)?);
            }
            db.master_file = Some(master);
            info!(
                target: "history",
                path = %db.master_path.display(),
                ctag = %db.master_ctag.as_ref().map(|t| t.as_str()).unwrap_or(""),
                "master_opened"
            );
        }

        // The session bank is unused when history is shared.
        if !(use_master && settings.shared) {
            db.session_file = Some(open_rw(&db.session_path)?);
        }

        db._alive = AliveFile::create(&alive_path)
            .map_err(|e| {
                warn!(target: "history", error = %e, "alive_file_create_failed");
                e
            })
            .ok();

        // Fold in whatever dead sessions left behind.
        db.reap()?;

        Ok(db)
    }

    pub fn master_ctag(&self) -> Option<&ConcurrencyTag> {
        self.master_ctag.as_ref()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The bank new lines go to.
    fn active_bank(&self) -> Bank {
        if self.session_file.is_some() {
            Bank::Session
        } else {
            Bank::Master
        }
    }

    fn bank_file(&self, bank: Bank) -> Option<&File> {
        match bank {
            Bank::Master => self.master_file.as_ref(),
            Bank::Session => self.session_file.as_ref(),
        }
    }

    /// The master offsets this session has asked to delete, honored
    /// only while the removals file's tag matches the master's.
    fn removals_overlay(&self) -> HashSet<u64> {
        let mut out = HashSet::new();
        let Ok(content) = std::fs::read(&self.removals_path) else {
            return out;
        };
        let lines = crate::file::raw_lines(&content);
        let Some((_, first)) = lines.first() else {
            return out;
        };
        let file_tag = ConcurrencyTag::parse(&String::from_utf8_lossy(first));
        if file_tag.as_ref() != self.master_ctag.as_ref() {
            warn!(
                target: "history",
                path = %self.removals_path.display(),
                "removals_ctag_mismatch_ignored"
            );
            return out;
        }
        for (_, line) in &lines[1..] {
            if let Ok(offset) = String::from_utf8_lossy(line).trim().parse::<u64>()
                && offset < LineId::MAX_OFFSET as u64
            {
                out.insert(offset);
            }
        }
        out
    }

    /// Rebuild the in-memory view from disk. With `can_clean`, the
    /// oldest master lines past the limit are pruned and an overdue
    /// compaction runs, reloading the view afterwards. Without it the
    /// load is read-only.
    pub fn load(&mut self, can_clean: bool) -> Result<()> {
        self.load_internal()?;
        if can_clean && self.use_master {
            // Prune the oldest master lines past the limit (marks
            // only; compaction reclaims the space).
            let limit = self.settings.effective_max_lines() as usize;
            while self.master_len > limit {
                let Some(first) = self.entries.first().cloned() else {
                    break;
                };
                if first.id.bank() != Bank::Master {
                    break;
                }
                if self.remove_id(first.id, false).is_err() {
                    break;
                }
            }

            if self.compact(false, false, None)? {
                self.load_internal()?;
            }
        }
        Ok(())
    }

    fn load_internal(&mut self) -> Result<()> {
        self.entries.clear();
        self.master_len = 0;
        self.master_deleted = 0;

        if let Some(master) = self.master_file.as_ref() {
            let _lock = lock_file(master, LockKind::Shared)?;
            self.master_ctag = read_ctag(master)?;
            let content = read_all(master)?;
            let removals = self.removals_overlay();
            let mut stats = ReadStats::default();
            for rec in read_entries(&content, &removals, &mut stats) {
                self.entries.push(HistoryEntry {
                    id: LineId::new(Bank::Master, rec.offset),
                    text: rec.text,
                    timestamp: rec.timestamp,
                });
            }
            self.master_len = self.entries.len();
            self.master_deleted = stats.deleted;
        }

        if let Some(session) = self.session_file.as_ref() {
            let _lock = lock_file(session, LockKind::Shared)?;
            let content = read_all(session)?;
            let mut stats = ReadStats::default();
            for rec in read_entries(&content, &HashSet::new(), &mut stats) {
                self.entries.push(HistoryEntry {
                    id: LineId::new(Bank::Session, rec.offset),
                    text: rec.text,
                    timestamp: rec.timestamp,
                });
            }
        }

        debug!(
            target: "history",
            total = self.entries.len(),
            master = self.master_len,
            deleted = self.master_deleted,
            "loaded"
        );
        Ok(())
    }

    /// Append a line. Returns false when the line was rejected
    /// (empty, reserved bytes, ignored whitespace prefix, or a
    /// duplicate under `ignore`).
    pub fn add(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() || line.bytes().any(|b| b == RESERVED_SEPARATOR) {
            return Ok(false);
        }
        if self.settings.ignore_space && line.starts_with([' ', '\t']) {
            return Ok(false);
        }

        match self.settings.dupe_mode {
            DupeMode::Ignore => {
                if self.entries.iter().any(|e| e.text == line) {
                    return Ok(true);
                }
            }
            DupeMode::ErasePrev => {
                self.remove_matching(line)?;
            }
            DupeMode::Add => {}
        }

        let bank = self.active_bank();
        let file = self.bank_file(bank).ok_or(HistoryError::NotFound)?;
        let _lock = lock_file(file, LockKind::Exclusive)?;

        let mut timestamp = None;
        if self.settings.time_stamp.saves() {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            append_line(file, &format!("{TIMESTAMP_PREFIX}{now}"))?;
            timestamp = Some(now);
        }

        let offset = append_line(file, line)?;
        let id = LineId::new(bank, offset);
        if id.is_sentinel() {
            warn!(target: "history", offset, "offset_overflow_unrecoverable");
        }
        drop(_lock);
        self.entries.push(HistoryEntry {
            id,
            text: line.to_string(),
            timestamp,
        });
        if bank == Bank::Master {
            self.master_len += 1;
        }
        Ok(true)
    }

    /// Soft-delete every occurrence of `line` in both banks. Returns
    /// how many were marked.
    pub fn remove_matching(&mut self, line: &str) -> Result<usize> {
        let matching: Vec<LineId> = self
            .entries
            .iter()
            .filter(|e| e.text == line)
            .map(|e| e.id)
            .collect();
        let mut count = 0;
        for id in matching {
            if self.remove_id(id, false).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Mark one line deleted. Session lines flip their first byte to
    /// `|`; master lines defer through the removals file. With
    /// `guard_ctag`, a master whose tag moved underneath us refuses.
    pub fn remove_id(&mut self, id: LineId, guard_ctag: bool) -> Result<()> {
        if id.is_none() {
            return Err(HistoryError::NotFound);
        }
        if id.is_sentinel() {
            return Err(HistoryError::OffsetOverflow);
        }

        match id.bank() {
            Bank::Master => {
                let file = self.master_file.as_ref().ok_or(HistoryError::NotFound)?;
                let _lock = lock_file(file, LockKind::Exclusive)?;

                if guard_ctag {
                    let current = read_ctag(file)?;
                    if current.as_ref() != self.master_ctag.as_ref() {
                        return Err(HistoryError::CtagMismatch {
                            expected: self
                                .master_ctag
                                .as_ref()
                                .map(|t| t.as_str().to_string())
                                .unwrap_or_default(),
                            found: current.map(|t| t.as_str().to_string()).unwrap_or_default(),
                        });
                    }
                }

                if self.session_file.is_some() {
                    // Deferred delete: record the offset for later.
                    self.append_removal(id.offset() as u64)?;
                } else {
                    soft_delete_at(file, id.offset() as u64)?;
                }
                self.master_deleted += 1;
            }
            Bank::Session => {
                let file = self.session_file.as_ref().ok_or(HistoryError::NotFound)?;
                let _lock = lock_file(file, LockKind::Exclusive)?;
                soft_delete_at(file, id.offset() as u64)?;
            }
        }

        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            self.entries.remove(pos);
            if id.bank() == Bank::Master {
                self.master_len = self.master_len.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn append_removal(&self, offset: u64) -> Result<()> {
        let exists = self.removals_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.removals_path)?;
        let _lock = lock_file(&file, LockKind::Exclusive)?;
        if !exists {
            let tag = self
                .master_ctag
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default();
            writeln!(&file, "{tag}")?;
        }
        writeln!(&file, "{offset}")?;
        Ok(())
    }

    /// Erase everything: both banks truncated, master re-tagged.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(master) = self.master_file.as_ref() {
            let _lock = lock_file(master, LockKind::Exclusive)?;
            truncate(master)?;
            let tag = ConcurrencyTag::generate();
            append_line(master, tag.as_str())?;
            self.master_ctag = Some(tag);
        }
        if let Some(session) = self.session_file.as_ref() {
            let _lock = lock_file(session, LockKind::Exclusive)?;
            truncate(session)?;
        }
        let _ = std::fs::remove_file(&self.removals_path);
        self.entries.clear();
        self.master_len = 0;
        self.master_deleted = 0;
        info!(target: "history", "cleared");
        Ok(())
    }

    /// Fold abandoned sessions into the master: their pending lines
    /// are appended, their removals applied, and their files deleted.
    /// Sessions whose alive file still exists are skipped.
    pub fn reap(&mut self) -> Result<()> {
        let sessions = self.other_sessions()?;
        for session_path in sessions {
            let alive = PathBuf::from(format!("{}~", session_path.display()));
            if alive.exists() {
                continue;
            }
            let removals_path = session_path.with_extension(REMOVALS_EXT);
            debug!(
                target: "history.reap",
                session = %session_path.display(),
                "reaping_abandoned_session"
            );

            if self.use_master {
                let session_size = std::fs::metadata(&session_path).map(|m| m.len()).unwrap_or(0);
                let removals_size = std::fs::metadata(&removals_path)
                    .map(|m| m.len())
                    .unwrap_or(0);

                if session_size > 0 || removals_size > 0 {
                    let master = self.master_file.as_ref().ok_or(HistoryError::NotFound)?;
                    // Master first, then session.
                    let _master_lock = lock_file(master, LockKind::Exclusive)?;
                    let session = File::open(&session_path)?;
                    let _session_lock = lock_file(&session, LockKind::Shared)?;

                    append_bank(master, &session)?;
                    self.apply_removals_file(master, &removals_path)?;
                }
            }

            let _ = std::fs::remove_file(&removals_path);
            let _ = std::fs::remove_file(&session_path);
        }
        Ok(())
    }

    /// Apply a removals file to the locked master, honoring the tag
    /// discipline: mismatched tags are ignored wholesale.
    fn apply_removals_file(&self, master: &File, removals_path: &Path) -> Result<()> {
        let Ok(content) = std::fs::read(removals_path) else {
            return Ok(());
        };
        let lines = crate::file::raw_lines(&content);
        let Some((_, first)) = lines.first() else {
            return Ok(());
        };
        let file_tag = ConcurrencyTag::parse(&String::from_utf8_lossy(first));
        let master_tag = read_ctag(master)?;
        if file_tag != master_tag {
            warn!(
                target: "history.reap",
                path = %removals_path.display(),
                "removals_ctag_mismatch_discarded"
            );
            return Ok(());
        }
        for (_, line) in &lines[1..] {
            if let Ok(offset) = String::from_utf8_lossy(line).trim().parse::<u64>() {
                if offset >= LineId::MAX_OFFSET as u64 {
                    warn!(target: "history.reap", offset, "removal_offset_too_large");
                    continue;
                }
                soft_delete_at(master, offset)?;
            }
        }
        Ok(())
    }

    /// Sibling session files (no extension, not ours, not alive
    /// markers).
    fn other_sessions(&self) -> Result<Vec<PathBuf>> {
        let prefix = format!("{MASTER_NAME}_");
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix)
                || name.ends_with('~')
                || name.contains('.')
                || entry.path() == self.session_path
            {
                continue;
            }
            out.push(entry.path());
        }
        Ok(out)
    }

    /// Rewrite the master, dropping soft-deleted lines. `unique` keeps
    /// only the most recent occurrence of each text; `limit_override`
    /// truncates to the newest N lines (defaulting to the configured
    /// limit). Removals files authored against the old tag are
    /// rewritten to the new tag with remapped offsets.
    ///
    /// Returns whether a rewrite happened.
    pub fn compact(&mut self, force: bool, unique: bool, limit_override: Option<u32>) -> Result<bool> {
        if !self.use_master {
            return Err(HistoryError::MasterDisabled);
        }

        let limit = limit_override
            .unwrap_or_else(|| self.settings.effective_max_lines())
            .min(core_config::MAX_HISTORY_LINES) as usize;

        let threshold = if limit > 0 {
            limit.max(MIN_COMPACT_THRESHOLD)
        } else {
            UNLIMITED_COMPACT_THRESHOLD
        };
        if !force && self.master_deleted <= threshold {
            return Ok(false);
        }

        let master = self.master_file.as_ref().ok_or(HistoryError::NotFound)?;
        let _lock = lock_file(master, LockKind::Exclusive)?;

        // Collect per-file removal intents authored against the
        // current tag; they survive the rewrite remapped.
        let current_tag = read_ctag(master)?;
        let mut removal_files: Vec<(PathBuf, Vec<u64>)> = Vec::new();
        for session in self.sessions_including_own()? {
            let removals_path = session.with_extension(REMOVALS_EXT);
            let Ok(content) = std::fs::read(&removals_path) else {
                continue;
            };
            let lines = crate::file::raw_lines(&content);
            let Some((_, first)) = lines.first() else {
                continue;
            };
            if ConcurrencyTag::parse(&String::from_utf8_lossy(first)) != current_tag {
                continue;
            }
            let offsets: Vec<u64> = lines[1..]
                .iter()
                .filter_map(|(_, l)| String::from_utf8_lossy(l).trim().parse::<u64>().ok())
                .collect();
            removal_files.push((removals_path, offsets));
        }

        // Read the live lines (soft-deletes drop out here; deferred
        // removals are NOT applied, their intent is carried forward).
        let content = read_all(master)?;
        let mut stats = ReadStats::default();
        let mut records = read_entries(&content, &HashSet::new(), &mut stats);

        let mut dups = 0usize;
        if unique {
            let mut last: HashMap<String, usize> = HashMap::new();
            for (i, rec) in records.iter().enumerate() {
                if last.insert(rec.text.clone(), i).is_some() {
                    dups += 1;
                }
            }
            let keep: HashSet<usize> = last.into_values().collect();
            let mut i = 0;
            records.retain(|_| {
                let keep_it = keep.contains(&i);
                i += 1;
                keep_it
            });
        }

        let start = records.len().saturating_sub(if limit > 0 { limit } else { records.len() });
        let kept = &records[start..];

        // Rewrite under a fresh tag, recording old -> new offsets.
        truncate(master)?;
        let new_tag = ConcurrencyTag::generate();
        append_line(master, new_tag.as_str())?;

        let mut remap: HashMap<u64, u64> = HashMap::new();
        for rec in kept {
            if let Some(ts) = rec.timestamp {
                let ts_offset = append_line(master, &format!("{TIMESTAMP_PREFIX}{ts}"))?;
                if let Some(old_ts) = rec.timestamp_offset {
                    remap.insert(old_ts, ts_offset);
                }
            }
            let new_offset = append_line(master, &rec.text)?;
            remap.insert(rec.offset, new_offset);
        }

        // Re-point surviving removal intents at the new offsets.
        for (path, offsets) in removal_files {
            let file = OpenOptions::new().write(true).truncate(true).open(&path);
            let Ok(file) = file else { continue };
            let _rlock = lock_file(&file, LockKind::Exclusive)?;
            writeln!(&file, "{}", new_tag.as_str())?;
            for old in offsets {
                if let Some(new) = remap.get(&old) {
                    writeln!(&file, "{new}")?;
                }
            }
        }

        info!(
            target: "history",
            kept = kept.len(),
            deleted = stats.deleted,
            dups,
            "compacted"
        );

        self.master_ctag = Some(new_tag);
        self.master_deleted = 0;
        Ok(true)
    }

    fn sessions_including_own(&self) -> Result<Vec<PathBuf>> {
        let mut sessions = self.other_sessions()?;
        sessions.push(self.session_path.clone());
        Ok(sessions)
    }

    /// Close this session: reap abandoned siblings, then merge our own
    /// pending lines into the master and delete our files.
    pub fn close(mut self) -> Result<()> {
        // Drop the alive marker first so our own session is eligible.
        self._alive = None;
        self.session_file = None;
        self.reap()?;

        if self.use_master {
            let session_exists = self.session_path.exists();
            if session_exists {
                let master = self.master_file.as_ref().ok_or(HistoryError::NotFound)?;
                let _master_lock = lock_file(master, LockKind::Exclusive)?;
                let session = File::open(&self.session_path)?;
                let _session_lock = lock_file(&session, LockKind::Shared)?;
                append_bank(master, &session)?;
                self.apply_removals_file(master, &self.removals_path.clone())?;
            }
        }
        let _ = std::fs::remove_file(&self.removals_path);
        let _ = std::fs::remove_file(&self.session_path);
        Ok(())
    }
}

fn open_rw(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

fn read_all(mut file: &File) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(content)
}

fn truncate(file: &File) -> Result<()> {
    file.set_len(0)?;
    Ok(())
}

/// Append `line` plus `\n`; returns the byte offset the line began at.
fn append_line(mut file: &File, line: &str) -> Result<u64> {
    let offset = file.seek(SeekFrom::End(0))?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(offset)
}

/// Copy a session bank's raw bytes onto the end of the master.
fn append_bank(mut master: &File, mut session: &File) -> Result<()> {
    let end = master.seek(SeekFrom::End(0))?;
    if end > 0 {
        // Ensure the previous line is terminated.
        let mut last = [0u8; 1];
        crate::file::read_at(master, end - 1, &mut last)?;
        if last[0] != b'\n' {
            master.write_all(b"\n")?;
        }
    }
    session.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    session.read_to_end(&mut buf)?;
    master.write_all(&buf)?;
    if buf.last().is_some_and(|&b| b != b'\n') {
        master.write_all(b"\n")?;
    }
    Ok(())
}

fn read_ctag(file: &File) -> Result<Option<ConcurrencyTag>> {
    let content = read_all(file)?;
    let first = content.split(|&b| b == b'\n').next().unwrap_or(&[]);
    Ok(ConcurrencyTag::parse(&String::from_utf8_lossy(first)))
}

/// Write the tag line into an empty or tagless master. Existing
/// untagged content is preserved below a fresh tag.
fn ensure_ctag(file: &File) -> Result<ConcurrencyTag> {
    if let Some(tag) = read_ctag(file)? {
        return Ok(tag);
    }
    let content = read_all(file)?;
    let tag = ConcurrencyTag::generate();
    truncate(file)?;
    append_line(file, tag.as_str())?;
    if !content.is_empty() {
        let mut f = file;
        f.write_all(&content)?;
        if content.last() != Some(&b'\n') {
            f.write_all(b"\n")?;
        }
    }
    Ok(tag)
}
