//! Quill loader entrypoint.
//!
//! `inject` hooks the parent command interpreter, `autorun` manages
//! the registry entry that runs `inject` for every new interpreter,
//! and `history` operates on the shared history store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod autorun;
mod history_cmd;
mod inject;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Line editor for the Windows command interpreter")]
struct Args {
    /// Optional configuration file path (overrides discovery of
    /// `quill.toml`).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inject the editor into the parent interpreter.
    Inject {
        /// Directory of completion/suggestion scripts to load.
        #[arg(long)]
        scripts: Option<PathBuf>,
        /// Suppress the startup banner.
        #[arg(long)]
        quiet: bool,
        /// Use the alternative (inline-detour) hook mechanism.
        #[arg(long)]
        althook: bool,
    },
    /// Manage the AutoRun registry entry that injects on every new
    /// interpreter.
    Autorun {
        #[arg(long, conflicts_with_all = ["uninstall", "show", "value"])]
        install: bool,
        #[arg(long, conflicts_with_all = ["install", "show", "value"])]
        uninstall: bool,
        #[arg(long, conflicts_with_all = ["install", "uninstall", "value"])]
        show: bool,
        /// Install a custom AutoRun command string.
        #[arg(long, conflicts_with_all = ["install", "uninstall", "show"])]
        value: Option<String>,
    },
    /// Operate on the shared history store.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Print the history, oldest first.
    List {
        /// Include saved timestamps.
        #[arg(long)]
        show_time: bool,
    },
    /// Rewrite the master log, dropping deleted lines.
    Compact {
        /// Also drop older duplicates of identical lines.
        #[arg(long)]
        unique: bool,
        /// Keep at most this many lines.
        lines: Option<u32>,
    },
    /// Erase the history.
    Clear,
}

fn configure_logging() -> Result<Option<WorkerGuard>> {
    let log_dir = Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, "quill.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(nb_writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = match configure_logging() {
        Ok(guard) => guard,
        Err(_) => None,
    };

    info!(target: "runtime", "startup");

    let settings = match core_config::load_from(args.config.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!(target: "runtime", error = %e, "config_load_failed");
            core_config::Settings::default()
        }
    };

    let result = match args.command {
        Command::Inject {
            scripts,
            quiet,
            althook,
        } => inject::run(scripts.as_deref(), quiet, althook, &settings),
        Command::Autorun {
            install,
            uninstall,
            show,
            value,
        } => autorun::run(install, uninstall, show, value.as_deref()),
        Command::History { action } => match action {
            HistoryAction::List { show_time } => history_cmd::list(&settings, show_time),
            HistoryAction::Compact { unique, lines } => {
                history_cmd::compact(&settings, unique, lines)
            }
            HistoryAction::Clear => history_cmd::clear(&settings),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "runtime", error = %e, "command_failed");
            eprintln!("quill: {e}");
            ExitCode::FAILURE
        }
    }
}
