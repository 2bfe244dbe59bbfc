//! The signaled flag set by Ctrl+C / Ctrl+Break.
//!
//! The input poller observes the flag and returns "interrupted" from
//! the blocking read; the editor then unwinds to the edit loop. No
//! long-running close handler is installed (some external tools
//! misbehave when one is present).

use std::sync::atomic::{AtomicBool, Ordering};

static SIGNALED: AtomicBool = AtomicBool::new(false);

pub fn set_signaled() {
    SIGNALED.store(true, Ordering::SeqCst);
}

pub fn is_signaled() -> bool {
    SIGNALED.load(Ordering::SeqCst)
}

pub fn clear_signaled() {
    SIGNALED.store(false, Ordering::SeqCst);
}
