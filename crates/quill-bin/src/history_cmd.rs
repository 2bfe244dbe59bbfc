//! `quill history` subcommands over the shared store.

use anyhow::{Context, Result};
use core_config::Settings;
use core_history::HistoryDb;
use std::path::PathBuf;

/// Where the history files live: `QUILL_HISTORY_DIR` overrides the
/// platform data dir.
fn history_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUILL_HISTORY_DIR") {
        return PathBuf::from(dir);
    }
    dirs_fallback().join("quill")
}

fn dirs_fallback() -> PathBuf {
    std::env::var_os("LOCALAPPDATA")
        .or_else(|| std::env::var_os("XDG_DATA_HOME"))
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn open(settings: &Settings) -> Result<HistoryDb> {
    let dir = history_dir();
    let mut db = HistoryDb::open(&dir, std::process::id(), &settings.history)
        .with_context(|| format!("opening history in {}", dir.display()))?;
    db.load(false)?;
    Ok(db)
}

pub fn list(settings: &Settings, show_time: bool) -> Result<()> {
    let db = open(settings)?;
    let show_time = show_time
        || settings.history.time_stamp == core_config::TimestampMode::Show;
    for (n, entry) in db.entries().iter().enumerate() {
        if show_time {
            match entry.timestamp {
                Some(t) => println!("{:5}  {:>10}  {}", n + 1, t, entry.text),
                None => println!("{:5}  {:>10}  {}", n + 1, "", entry.text),
            }
        } else {
            println!("{:5}  {}", n + 1, entry.text);
        }
    }
    Ok(())
}

pub fn compact(settings: &Settings, unique: bool, lines: Option<u32>) -> Result<()> {
    let mut db = open(settings)?;
    let rewritten = db.compact(true, unique, lines)?;
    if rewritten {
        println!("history compacted");
    }
    Ok(())
}

pub fn clear(settings: &Settings) -> Result<()> {
    let mut db = open(settings)?;
    db.clear()?;
    println!("history cleared");
    Ok(())
}
