//! Concurrency tags: a durable unique name for one physical
//! incarnation of the master log.
//!
//! The tag is the master's first line, `|CTAG_<epoch>_<tick>_<pid>_
//! <serial>`. It changes only when the master is rewritten. Any
//! cross-process artifact referencing master offsets embeds the tag it
//! was collected against; a mismatch means the offsets are stale and
//! must not be applied.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const CTAG_PREFIX: &str = "|CTAG_";

static DISAMBIGUATE: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyTag {
    tag: String,
}

impl ConcurrencyTag {
    /// Generate a fresh tag for a new master incarnation.
    pub fn generate() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let tick = std::time::UNIX_EPOCH
            .elapsed()
            .map(|d| d.subsec_millis())
            .unwrap_or(0);
        let pid = std::process::id();
        let serial = DISAMBIGUATE.fetch_add(1, Ordering::Relaxed);
        Self {
            tag: format!("{CTAG_PREFIX}{epoch}_{tick}_{pid}_{serial}"),
        }
    }

    /// Parse the tag from a first line; None when it is not a tag.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        line.starts_with(CTAG_PREFIX).then(|| Self {
            tag: line.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

impl std::fmt::Display for ConcurrencyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag)
    }
}
