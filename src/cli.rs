use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed Kanban board with WIP limits and time-in-status tracking.
/// Storage defaults to ~/.chronos/board.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "cf", version, about = "Kanban board with WIP limits, time tracking and team energy")]
pub struct Cli {
    /// Path to the JSON board file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user (id, name or email).
    #[arg(long = "as", global = true, value_name = "USER")]
    pub as_user: Option<String>,

    /// Log filter, e.g. "info" or "chronos_flow=debug". Falls back to $CF_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
