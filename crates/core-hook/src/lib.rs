//! The host hook layer: interception of the parent interpreter's
//! console read/write and environment primitives, prompt capture, and
//! the edit-cycle state machine.
//!
//! Everything OS-specific goes through the [`ConsoleApi`] seam; the
//! real Windows implementation lives behind `cfg(windows)`, and tests
//! drive the dispatch logic through an in-memory fake.

mod console;
mod cycle;
mod dispatch;
mod doskey;
mod edit;
mod prompt;
mod signal;
#[cfg(windows)]
mod win;

pub use console::{ConsoleApi, ConsoleRead, FakeConsole};
pub use cycle::{EditHost, ServeOutcome, display_for, serve_read};
pub use dispatch::{HostHooks, ReadOutcome, WriteOutcome};
pub use doskey::{DoskeyResolver, NoDoskey, segment_expansion};
pub use edit::{
    DefaultBindings, EditOutcome, EditResult, EditSession, KeyBindings, KeyEvent, KeyRead,
    KeySource, run_edit,
};
pub use prompt::{
    PROMPT_TAG, PROMPT_TAG_HIDDEN, filter_prompt_backspaces, strip_prompt_tag, tag_prompt_value,
};
pub use signal::{clear_signaled, is_signaled, set_signaled};
#[cfg(windows)]
pub use win::{HookMethod, IatPatch, RealConsole, install_hooks};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("hook installation is not supported on this platform")]
    Unsupported,
    #[error("hook installation failed: {0}")]
    InstallFailed(String),
}

pub type Result<T> = std::result::Result<T, HookError>;
