//! # cf - Chronos Flow
//!
//! A file-backed Kanban board for small teams, driven from the command line or an
//! interactive terminal board.
//!
//! ## Key Features
//!
//! - **Five-column board**: Backlog, In Progress, Review, Done and Blocked, with
//!   per-column WIP limits enforced on every move (override with `--force`)
//! - **Time in status**: every transition credits the elapsed time to the column
//!   being left, so a task's history adds up to its age
//! - **Activity log and threads**: status changes, edits, notes and comments with
//!   one level of replies
//! - **Team energy**: a 0-100 workload score from load, WIP breaches, stuck and
//!   reopened tasks, with recommendations
//! - **Alerts**: stuck tasks, approaching deadlines and frequent reopens, with
//!   acknowledgement
//! - **Timeline**: quarter summaries and password-protected shareable views
//!
//! ## Quick Start
//!
//! ```bash
//! cf user add "Alex Johnson" --email alex@example.com
//! cf add "Implement login" --priority high --due friday --assignee alex
//! cf move 1 in-progress --comment "starting today"
//! cf board
//! cf energy
//! ```
//!
//! Data is stored in `~/.chronos/board.json`; settings are read from
//! `~/.chronos/config.toml` when present.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod alerts;
pub mod board;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod energy;
pub mod engine;
pub mod error;
pub mod fields;
pub mod filter;
pub mod retro;
pub mod settings;
pub mod task;
pub mod timeline;
pub mod user;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Config;
use db::Database;

/// Install the stderr log subscriber. Defaults to warnings only.
fn init_tracing(level: Option<&str>) {
    let directive = level
        .map(String::from)
        .or_else(|| std::env::var("CF_LOG").ok())
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let db_path: PathBuf = cli.db.clone().unwrap_or_else(|| config::data_dir().join("board.json"));

    // Commands that don't need a loaded board
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Init { force } => {
            cmd_init(&db_path, *force);
            return;
        }
        _ => {}
    }

    let config_path = cli.config.clone().unwrap_or_else(config::default_path);
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read config {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    let mut db = match Database::load(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load board {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.apply(&mut db) {
        eprintln!("Invalid WIP settings in config: {}", e);
        std::process::exit(1);
    }

    let requested = cli.as_user.clone().or_else(|| config.user.clone());
    let actor = match resolve_actor(&db, requested.as_deref()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error resolving acting user: {}", e);
            std::process::exit(1);
        }
    };

    let mut s = Session { db, db_path, actor, config };

    match cli.command {
        Commands::Completions { .. } | Commands::Init { .. } => unreachable!("handled above"),

        Commands::Add { title, desc, due, priority, status, project_status, assignee, owner, tags, scope } =>
            cmd_add(&mut s, title, desc, due, priority, status, project_status, assignee, owner, tags, scope),

        Commands::List { all, status, assignee, priority, tags, search, from, to, overdue, sort, limit } =>
            cmd_list(&s, all, status, assignee, priority, tags, search, from, to, overdue, sort, limit),

        Commands::View { id } => cmd_view(&s, id),

        Commands::Move { id, to, comment, force } => cmd_move(&mut s, id, to, comment, force),

        Commands::Update {
            id, title, desc, due, priority, project_status, assignee, unassign,
            owner, clear_owner, scope, add_tags, rm_tags,
        } => cmd_update(&mut s, id, title, desc, due, priority, project_status, assignee, unassign,
                        owner, clear_owner, scope, add_tags, rm_tags),

        Commands::Reopen { id, reason } => cmd_reopen(&mut s, id, reason),

        Commands::Note { id, text } => cmd_note(&mut s, id, text),

        Commands::Comment { id, text, quick } => cmd_comment(&mut s, id, text, quick),

        Commands::Reply { id, comment_id, text } => cmd_reply(&mut s, id, comment_id, text),

        Commands::Board => cmd_board(&mut s),

        Commands::Columns { status, wip } => cmd_columns(&mut s, status, wip),

        Commands::Energy { json } => cmd_energy(&s, json),

        Commands::Alerts { ack, all } => cmd_alerts(&mut s, ack, all),

        Commands::Retro { action } => cmd_retro(&mut s, action),

        Commands::Timeline { action } => cmd_timeline(&mut s, action),

        Commands::User { action } => cmd_user(&mut s, action),

        Commands::Role { action } => cmd_role(&mut s, action),

        Commands::Tag { action } => cmd_tag(&mut s, action),
    }
}
