//! The history database: a shared append-only master log on disk,
//! per-session deletion-overlay files, concurrency tags that detect
//! stale state, and a periodic compaction that rewrites the log while
//! preserving cross-session deletion intent.
//!
//! On-disk layout:
//!
//! ```text
//! quill_history            master log; first line is the ctag
//! quill_history_<id>       this session's pending lines
//! quill_history_<id>.removals   master offsets this session deleted
//! quill_history_<id>~      alive file (delete-on-close)
//! ```
//!
//! Lock order is invariant: when master and session are locked
//! together, master first, then session.

mod ctag;
mod expand;
mod file;
mod lock;
mod store;

pub use ctag::ConcurrencyTag;
pub use expand::{ExpandMode, ExpandResult, Expander, NoExpansion, expansion_inhibited};
pub use file::{EntryRecord, read_entries, soft_delete_at};
pub use lock::{LockKind, lock_file};
pub use store::{HistoryDb, HistoryEntry};

use thiserror::Error;

/// The byte reserved as the queued-command separator; it can never
/// appear in stored history lines.
pub const RESERVED_SEPARATOR: u8 = 0x01;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("concurrency tag mismatch (expected {expected}, found {found})")]
    CtagMismatch { expected: String, found: String },
    #[error("history line offset exceeds the storable range")]
    OffsetOverflow,
    #[error("history entry not found")]
    NotFound,
    #[error("master bank is disabled")]
    MasterDisabled,
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Which storage area a line lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bank {
    Master = 0,
    Session = 1,
}

/// A packed line identifier: 29-bit byte offset, 2-bit bank, live bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(u32);

impl LineId {
    pub const NONE: LineId = LineId(0);
    /// Offsets at or past this value are unrecoverable (sentinel).
    pub const MAX_OFFSET: u32 = (1 << 29) - 1;

    pub fn new(bank: Bank, offset: u64) -> LineId {
        if offset >= Self::MAX_OFFSET as u64 {
            return Self::sentinel(bank);
        }
        LineId((offset as u32) | ((bank as u32) << 29) | (1 << 31))
    }

    pub fn sentinel(bank: Bank) -> LineId {
        LineId(Self::MAX_OFFSET | ((bank as u32) << 29) | (1 << 31))
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_sentinel(self) -> bool {
        !self.is_none() && self.offset() == Self::MAX_OFFSET
    }

    pub fn offset(self) -> u32 {
        self.0 & Self::MAX_OFFSET
    }

    pub fn bank(self) -> Bank {
        if (self.0 >> 29) & 0b11 == 0 {
            Bank::Master
        } else {
            Bank::Session
        }
    }

    pub fn packed(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_id_packing_round_trips() {
        let id = LineId::new(Bank::Master, 12345);
        assert_eq!(id.offset(), 12345);
        assert_eq!(id.bank(), Bank::Master);
        assert!(!id.is_none());
        assert!(!id.is_sentinel());

        let s = LineId::new(Bank::Session, 77);
        assert_eq!(s.bank(), Bank::Session);
        assert_eq!(s.offset(), 77);
    }

    #[test]
    fn oversized_offsets_become_sentinels() {
        let id = LineId::new(Bank::Master, u64::from(LineId::MAX_OFFSET) + 10);
        assert!(id.is_sentinel());
        assert!(!id.is_none());
    }

    #[test]
    fn none_is_distinct_from_offset_zero() {
        assert!(LineId::NONE.is_none());
        assert!(!LineId::new(Bank::Master, 0).is_none());
    }
}
