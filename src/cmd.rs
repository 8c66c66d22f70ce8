//! Command implementations for the CLI interface.
//!
//! Each subcommand loads nothing itself: `main` builds a [`Session`] (board, path,
//! acting user, config) and dispatches here. Handlers print results to stdout,
//! print failures to stderr and exit non-zero.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::db::*;
use crate::energy::{compute_team_energy, insights};
use crate::engine::MoveOutcome;
use crate::error::Error;
use crate::fields::*;
use crate::filter::{apply_filters, DateRange, FilterState};
use crate::retro::RetroDraft;
use crate::settings::UserInput;
use crate::task::{Task, TaskDraft, TaskPatch, ThreadedComment};
use crate::timeline::{current_quarter, quarter_summaries, TimelineDraft};
use crate::tui::run::run_board;

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty board file.
    Init {
        /// Overwrite an existing board.
        #[arg(long)]
        force: bool,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Deadline: YYYY-MM-DD, "today", "friday", "in 3d", "eom".
        #[arg(long, default_value = "in 2w")]
        due: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Starting column.
        #[arg(long, value_enum, default_value_t = Status::Backlog)]
        status: Status,
        #[arg(long, value_enum, default_value_t = ProjectStatus::Planned)]
        project_status: ProjectStatus,
        /// Assignee (user id, name or email).
        #[arg(long)]
        assignee: Option<String>,
        /// Product owner (user id, name or email).
        #[arg(long)]
        owner: Option<String>,
        /// Tag. May be repeated.
        #[arg(long = "tag", value_enum)]
        tags: Vec<Tag>,
        /// Scope notes.
        #[arg(long)]
        scope: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Include tasks in Done.
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Match any of these tags. May be repeated.
        #[arg(long = "tag", value_enum)]
        tags: Vec<Tag>,
        /// Case-insensitive text in title or description.
        #[arg(long)]
        search: Option<String>,
        /// Deadline on or after this date.
        #[arg(long)]
        from: Option<String>,
        /// Deadline on or before this date.
        #[arg(long)]
        to: Option<String>,
        /// Only tasks past their deadline.
        #[arg(long)]
        overdue: bool,
        #[arg(long, value_enum, default_value_t = SortKey::Deadline)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or title.
    View {
        id: String,
    },

    /// Move a task to another column.
    Move {
        id: String,
        #[arg(value_enum)]
        to: Status,
        /// Note attached to the status change.
        #[arg(long)]
        comment: Option<String>,
        /// Move even if the target column is at its WIP limit.
        #[arg(long)]
        force: bool,
    },

    /// Update fields on a task.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        project_status: Option<ProjectStatus>,
        #[arg(long, conflicts_with = "unassign")]
        assignee: Option<String>,
        #[arg(long)]
        unassign: bool,
        #[arg(long, conflicts_with = "clear_owner")]
        owner: Option<String>,
        #[arg(long)]
        clear_owner: bool,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long = "add-tag", value_enum)]
        add_tags: Vec<Tag>,
        #[arg(long = "rm-tag", value_enum)]
        rm_tags: Vec<Tag>,
    },

    /// Record that a task's scope was reopened.
    Reopen {
        id: String,
        /// Why the task was reopened.
        #[arg(long)]
        reason: Option<String>,
    },

    /// Log a short progress note on a task.
    Note {
        id: String,
        text: String,
    },

    /// Comment on a task.
    Comment {
        id: String,
        text: String,
        /// Keep the comment out of the activity log.
        #[arg(long)]
        quick: bool,
    },

    /// Reply to a comment.
    Reply {
        id: String,
        /// Id of the top-level comment (a unique prefix is enough).
        comment_id: String,
        text: String,
    },

    /// Open the interactive Kanban board.
    Board,

    /// Show columns and WIP limits, or change a limit.
    Columns {
        #[arg(value_enum, requires = "wip")]
        status: Option<Status>,
        /// New WIP limit; 0 removes it.
        #[arg(long)]
        wip: Option<usize>,
    },

    /// Show the team energy estimate.
    Energy {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Refresh and list time intelligence alerts.
    Alerts {
        /// Acknowledge the alert with this id.
        #[arg(long)]
        ack: Option<u64>,
        /// Include acknowledged alerts.
        #[arg(long)]
        all: bool,
    },

    /// Retrospective log.
    Retro {
        #[command(subcommand)]
        action: RetroAction,
    },

    /// Roadmap timeline and shared views.
    Timeline {
        #[command(subcommand)]
        action: TimelineAction,
    },

    /// Manage the user directory.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage roles.
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Manage tag labels.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum RetroAction {
    Add {
        /// Period label, e.g. "Sprint 14".
        period: String,
        #[arg(long = "lesson")]
        lessons: Vec<String>,
        #[arg(long = "blocker")]
        blockers: Vec<String>,
        #[arg(long = "win")]
        wins: Vec<String>,
        /// Related task id or title. May be repeated.
        #[arg(long = "task")]
        tasks: Vec<String>,
    },
    List,
}

#[derive(Subcommand)]
pub enum TimelineAction {
    /// Per-quarter counts grouped by deadline.
    Quarters,
    /// Create a shareable read-only view.
    Share {
        title: String,
        #[arg(long)]
        desc: Option<String>,
        /// Visible column. May be repeated; defaults to every column.
        #[arg(long = "column", value_enum)]
        columns: Vec<Status>,
        /// Task to hide. May be repeated.
        #[arg(long = "hide")]
        hide: Vec<String>,
        #[arg(long)]
        password: Option<String>,
        /// Expiry date.
        #[arg(long)]
        expires: Option<String>,
        /// Let viewers filter the view.
        #[arg(long)]
        allow_filters: bool,
    },
    /// Open a shared view by access key.
    Open {
        key: String,
        #[arg(long)]
        password: Option<String>,
        /// Text to search for; only for views shared with --allow-filters.
        #[arg(long)]
        search: Option<String>,
    },
    /// Withdraw a shared view.
    Revoke {
        key: String,
    },
    /// List shared views.
    Shares,
}

#[derive(Subcommand)]
pub enum UserAction {
    Add {
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Rm {
        id: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum RoleAction {
    Add {
        name: String,
        /// Permission. May be repeated.
        #[arg(long = "perm")]
        perms: Vec<String>,
    },
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        /// Replaces the permission set. May be repeated.
        #[arg(long = "perm")]
        perms: Vec<String>,
    },
    Rm {
        id: u64,
    },
    List,
}

#[derive(Subcommand)]
pub enum TagAction {
    Add {
        name: String,
        #[arg(long, default_value = "#64748B")]
        color: String,
    },
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Rm {
        id: u64,
    },
    List,
}

/// Everything a command needs: the loaded board, where to save it, who is acting
/// and the user's configuration.
pub struct Session {
    pub db: Database,
    pub db_path: PathBuf,
    pub actor: String,
    pub config: Config,
}

impl Session {
    pub fn save(&self) {
        if let Err(e) = self.db.save(&self.db_path) {
            eprintln!("Failed to save board: {e}");
            std::process::exit(1);
        }
    }
}

/// Print `context: error` and exit with status 1.
fn fail(context: &str, e: impl Display) -> ! {
    eprintln!("{}: {}", context, e);
    std::process::exit(1);
}

trait OrExit<T> {
    fn or_exit(self, context: &str) -> T;
}

impl<T, E: Display> OrExit<T> for std::result::Result<T, E> {
    fn or_exit(self, context: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) => fail(context, e),
        }
    }
}

/// Pick the acting user. With an empty directory any name is accepted as-is.
pub fn resolve_actor(db: &Database, requested: Option<&str>) -> crate::error::Result<String> {
    match requested {
        Some(name) if db.users.is_empty() => Ok(name.to_string()),
        Some(name) => resolve_user_identifier(name, db),
        None => Ok("local".to_string()),
    }
}

fn parse_date_arg(value: &str) -> chrono::NaiveDate {
    match parse_due_input(value) {
        Some(d) => d,
        None => fail("Invalid date", value),
    }
}

fn parse_deadline(value: &str) -> DateTime<Utc> {
    end_of_day(parse_date_arg(value))
}

fn display_user(db: &Database, id: Option<&str>) -> String {
    match id {
        Some(id) => match db.user(id) {
            Some(u) => format!("{} ({})", u.name, u.initials),
            None => id.to_string(),
        },
        None => "-".into(),
    }
}

/// Create an empty board file.
pub fn cmd_init(db_path: &Path, force: bool) {
    if db_path.exists() && !force {
        fail("Board already exists", db_path.display());
    }
    Database::default().save(db_path).or_exit("Failed to create board");
    println!("Created board at {}", db_path.display());
}

/// Add a new task to the board.
pub fn cmd_add(
    s: &mut Session,
    title: String,
    desc: Option<String>,
    due: String,
    priority: Priority,
    status: Status,
    project_status: ProjectStatus,
    assignee: Option<String>,
    owner: Option<String>,
    tags: Vec<Tag>,
    scope: Option<String>,
) {
    let mut draft = TaskDraft::new(title, parse_deadline(&due));
    draft.description = desc.unwrap_or_default();
    draft.priority = priority;
    draft.status = status;
    draft.project_status = project_status;
    draft.tags = tags;
    draft.scope = scope;
    draft.assignee = assignee
        .map(|a| resolve_user_identifier(&a, &s.db).or_exit("Error resolving assignee"));
    draft.product_owner = owner
        .map(|o| resolve_user_identifier(&o, &s.db).or_exit("Error resolving owner"));

    let id = s
        .db
        .create_task(draft, &s.actor, Utc::now())
        .or_exit("Failed to add task");
    s.save();
    println!("Added task {}", id);
}

/// List tasks with optional filtering and sorting.
pub fn cmd_list(
    s: &Session,
    all: bool,
    status: Option<Status>,
    assignee: Option<String>,
    priority: Option<Priority>,
    tags: Vec<Tag>,
    search: Option<String>,
    from: Option<String>,
    to: Option<String>,
    overdue: bool,
    sort: SortKey,
    limit: Option<usize>,
) {
    let now = Utc::now();
    let filter = FilterState {
        assignee: assignee.map(|a| resolve_user_identifier(&a, &s.db).or_exit("Error resolving assignee")),
        priority,
        tags,
        search: search.unwrap_or_default(),
        date_range: DateRange {
            start: from.as_deref().map(parse_date_arg),
            end: to.as_deref().map(parse_date_arg),
        },
    };

    let mut rows: Vec<&Task> = apply_filters(s.db.tasks(), &filter)
        .into_iter()
        .filter(|t| match status {
            Some(st) => t.status == st,
            None => all || t.status != Status::Done,
        })
        .filter(|t| !overdue || t.is_overdue(now))
        .collect();

    match sort {
        SortKey::Deadline => rows.sort_by_key(|t| (t.deadline, t.id)),
        SortKey::Priority => rows.sort_by_key(|t| (priority_rank(t.priority), t.deadline, t.id)),
        SortKey::Status => rows.sort_by_key(|t| (t.status.column_index(), t.id)),
        SortKey::Id => rows.sort_by_key(|t| t.id),
    }
    if let Some(n) = limit {
        rows.truncate(n);
    }

    if rows.is_empty() {
        println!("No tasks.");
    } else {
        print_table(&s.db, &rows, now);
    }
}

fn print_comment(db: &Database, c: &ThreadedComment, depth: usize) {
    println!(
        "{}[{}] {} {}: {}",
        "  ".repeat(depth + 1),
        short_id(&c.id),
        c.timestamp.format("%Y-%m-%d %H:%M"),
        db.initials_of(Some(&c.user)),
        c.content
    );
    for r in &c.replies {
        print_comment(db, r, depth + 1);
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(s: &Session, id: String) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let Some(task) = s.db.get(task_id) else {
        fail("Task not found", task_id);
    };
    let now = Utc::now();
    let db = &s.db;

    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Project:      {}", format_project_status(task.project_status));
    println!("Priority:     {}", format_priority(task.priority));
    println!("Deadline:     {} ({})", task.deadline.format("%Y-%m-%d"), format_due_relative(task.deadline, now));
    println!("Assignee:     {}", display_user(db, task.assignee.as_deref()));
    println!("Owner:        {}", display_user(db, task.product_owner.as_deref()));
    println!(
        "Tags:         {}",
        if task.tags.is_empty() {
            "-".to_string()
        } else {
            task.tags.iter().map(|t| format_tag(*t)).collect::<Vec<_>>().join(",")
        }
    );
    println!("Reopened:     {}", task.reopen_count);
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    println!("Updated UTC:  {}", task.updated_at.to_rfc3339());
    if let Some(scope) = &task.scope {
        println!("Scope:        {}", scope);
    }
    println!("Description:\n{}\n", if task.description.is_empty() { "-" } else { &task.description });

    println!("Time in status:");
    for st in Status::ALL {
        let mut ms = task.time_in_status.get(&st).copied().unwrap_or(0);
        if st == task.status {
            ms += task.current_stint_ms(now);
        }
        let marker = if st == task.status { " *" } else { "" };
        println!("  {:<12} {}{}", format_status(st), format_duration_ms(ms), marker);
    }

    if !task.comments.is_empty() {
        println!("Comments:");
        for c in &task.comments {
            print_comment(db, c, 0);
        }
    }

    println!("Activity:");
    for e in &task.activity_log {
        let change = match (&e.previous_value, &e.new_value) {
            (Some(p), Some(n)) => format!(" {} -> {}", p, n),
            (None, Some(n)) => format!(" {}", n),
            _ => String::new(),
        };
        let note = e.comment.as_deref().map(|c| format!(" \"{}\"", c)).unwrap_or_default();
        println!(
            "  {} {:<4} {:?}{}{}",
            e.timestamp.format("%Y-%m-%d %H:%M"),
            db.initials_of(Some(&e.user)),
            e.kind,
            change,
            note
        );
    }
}

/// Move a task to another column.
pub fn cmd_move(s: &mut Session, id: String, to: Status, comment: Option<String>, force: bool) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let now = Utc::now();
    let result = if force {
        s.db.force_move_task(task_id, to, comment.as_deref(), &s.actor, now)
    } else {
        s.db.move_task(task_id, to, comment.as_deref(), &s.actor, now)
    };
    match result {
        Ok(MoveOutcome::Moved { from, to, wip }) => {
            s.save();
            let warn = match wip {
                WipState::AtCapacity => " (column now at its WIP limit)",
                WipState::OverCapacity => " (column over its WIP limit)",
                _ => "",
            };
            println!("Moved {} from {} to {}{}", task_id, from, to, warn);
        }
        Ok(MoveOutcome::Unchanged) => println!("Task {} is already in {}", task_id, to),
        Err(e @ Error::PolicyViolation { .. }) => {
            eprintln!("{}", e);
            eprintln!("Use --force to move it anyway.");
            std::process::exit(1);
        }
        Err(e) => fail("Failed to move task", e),
    }
}

/// Update an existing task's fields.
pub fn cmd_update(
    s: &mut Session,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    project_status: Option<ProjectStatus>,
    assignee: Option<String>,
    unassign: bool,
    owner: Option<String>,
    clear_owner: bool,
    scope: Option<String>,
    add_tags: Vec<Tag>,
    rm_tags: Vec<Tag>,
) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let resolve = |who: Option<String>, clear: bool, what: &str| -> Option<Option<String>> {
        if clear {
            return Some(None);
        }
        who.map(|w| Some(resolve_user_identifier(&w, &s.db).or_exit(what)))
    };
    let patch = TaskPatch {
        title,
        description: desc,
        scope,
        deadline: due.as_deref().map(parse_deadline),
        priority,
        project_status,
        assignee: resolve(assignee, unassign, "Error resolving assignee"),
        product_owner: resolve(owner, clear_owner, "Error resolving owner"),
        add_tags,
        rm_tags,
    };
    if patch.is_empty() {
        fail("Nothing to update", task_id);
    }

    let changed = s
        .db
        .update_task(task_id, patch, &s.actor, Utc::now())
        .or_exit("Failed to update task");
    if changed == 0 {
        println!("No changes for {}", task_id);
        return;
    }
    s.save();
    println!("Updated {}", task_id);
}

/// Count a reopen of the task's scope.
pub fn cmd_reopen(s: &mut Session, id: String, reason: Option<String>) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let count = s
        .db
        .reopen_task(task_id, reason.as_deref(), &s.actor, Utc::now())
        .or_exit("Failed to reopen task");
    s.save();
    println!("Reopened {} ({} times)", task_id, count);
}

pub fn cmd_note(s: &mut Session, id: String, text: String) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    s.db.micro_update(task_id, &text, &s.actor, Utc::now())
        .or_exit("Failed to log note");
    s.save();
    println!("Logged note on {}", task_id);
}

pub fn cmd_comment(s: &mut Session, id: String, text: String, quick: bool) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let comment_id = s
        .db
        .add_comment(task_id, &text, quick, &s.actor, Utc::now())
        .or_exit("Failed to add comment");
    s.save();
    println!("Added comment {} to {}", short_id(&comment_id), task_id);
}

pub fn cmd_reply(s: &mut Session, id: String, comment_id: String, text: String) {
    let task_id = resolve_task_identifier(&id, &s.db).or_exit("Error resolving task");
    let parent = {
        let Some(task) = s.db.get(task_id) else {
            fail("Task not found", task_id);
        };
        let matches: Vec<&ThreadedComment> = task
            .comments
            .iter()
            .filter(|c| c.id.starts_with(&comment_id))
            .collect();
        match matches.as_slice() {
            [one] => one.id.clone(),
            [] => comment_id,
            _ => fail("Ambiguous comment id", comment_id),
        }
    };
    let reply_id = s
        .db
        .add_reply(task_id, &parent, &text, &s.actor, Utc::now())
        .or_exit("Failed to add reply");
    s.save();
    println!("Added reply {} to {}", short_id(&reply_id), task_id);
}

/// Launch the interactive board.
pub fn cmd_board(s: &mut Session) {
    if let Err(e) = run_board(s) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Show columns with their WIP state, optionally changing one limit first.
pub fn cmd_columns(s: &mut Session, status: Option<Status>, wip: Option<usize>) {
    if let (Some(status), Some(wip)) = (status, wip) {
        let limit = Some(wip).filter(|w| *w > 0);
        s.db.set_wip_limit(status, limit).or_exit("Failed to set WIP limit");
        s.save();
    }
    println!("{:<12} {:>5} {:>5}  {}", "Column", "Tasks", "Limit", "State");
    for col in s.db.columns() {
        let state = match col.wip_state() {
            WipState::Unlimited => "",
            WipState::Under => "ok",
            WipState::AtCapacity => "at limit",
            WipState::OverCapacity => "over limit",
        };
        println!(
            "{:<12} {:>5} {:>5}  {}",
            col.title,
            col.task_ids.len(),
            col.wip_limit.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
            state
        );
    }
}

pub fn cmd_energy(s: &Session, json: bool) {
    let snap = compute_team_energy(s.db.tasks(), Utc::now(), &s.config.energy_settings());
    if json {
        println!("{}", serde_json::to_string_pretty(&snap).or_exit("Failed to encode snapshot"));
        return;
    }
    println!("Energy:        {:?} ({:.1})", snap.level, snap.score);
    println!("Task load:     {}%", snap.factors.task_load);
    println!("WIP breaches:  {}", snap.factors.wip_breaches);
    println!("Stuck tasks:   {}", snap.factors.stuck_tasks);
    println!("Reopened:      {}", snap.factors.reopened_tasks);
    for line in insights(&snap.factors) {
        println!("- {}", line);
    }
}

pub fn cmd_alerts(s: &mut Session, ack: Option<u64>, all: bool) {
    let now = Utc::now();
    let summary = s.db.refresh_alerts(now, &s.config.alert_settings());
    if let Some(id) = ack {
        s.db.acknowledge_alert(id, &s.actor, now).or_exit("Failed to acknowledge alert");
    }
    s.save();
    if !summary.raised.is_empty() {
        println!("{} new alert(s)", summary.raised.len());
    }

    let alerts: Vec<_> = if all {
        s.db.alerts.iter().collect()
    } else {
        s.db.active_alerts()
    };
    if alerts.is_empty() {
        println!("No alerts.");
        return;
    }
    for a in alerts {
        let ack = if a.acknowledged {
            format!(" (ack by {})", a.acknowledged_by.as_deref().unwrap_or("-"))
        } else {
            String::new()
        };
        println!("{:<4} {:<8} #{:<4} {}{}", a.id, format!("{:?}", a.severity), a.task_id, a.message, ack);
    }
}

pub fn cmd_retro(s: &mut Session, action: RetroAction) {
    match action {
        RetroAction::Add { period, lessons, blockers, wins, tasks } => {
            let related_task_ids = tasks
                .iter()
                .map(|t| resolve_task_identifier(t, &s.db).or_exit("Error resolving task"))
                .collect();
            let draft = RetroDraft {
                period,
                lessons_learned: lessons,
                blockers,
                wins,
                related_task_ids,
                created_by: s.actor.clone(),
            };
            let id = s
                .db
                .create_retrospective(draft, Utc::now())
                .or_exit("Failed to add retrospective")
                .id;
            s.save();
            println!("Added retrospective {}", id);
        }
        RetroAction::List => {
            let entries = s.db.retrospectives_newest_first();
            if entries.is_empty() {
                println!("No retrospectives.");
            }
            for r in entries {
                println!("#{} {} ({}, {})", r.id, r.period, r.created_at.format("%Y-%m-%d"), s.db.initials_of(Some(&r.created_by)));
                for (label, items) in [("Lessons", &r.lessons_learned), ("Blockers", &r.blockers), ("Wins", &r.wins)] {
                    for item in items {
                        println!("  {:<9} {}", label, item);
                    }
                }
                if !r.related_task_ids.is_empty() {
                    let ids: Vec<String> = r.related_task_ids.iter().map(|i| i.to_string()).collect();
                    println!("  Tasks     {}", ids.join(", "));
                }
            }
        }
    }
}

pub fn cmd_timeline(s: &mut Session, action: TimelineAction) {
    let now = Utc::now();
    match action {
        TimelineAction::Quarters => {
            let current = current_quarter(now);
            println!("{:<4} {:>5} {:>8} {:>8} {:>5} {:>8} {:>9}", "", "Total", "Planned", "Ongoing", "Done", "Overdue", "Due soon");
            for q in quarter_summaries(s.db.tasks(), now) {
                let count = |ps: ProjectStatus| q.by_status.get(&ps).copied().unwrap_or(0);
                println!(
                    "{:<4} {:>5} {:>8} {:>8} {:>5} {:>8} {:>9}{}",
                    q.name,
                    q.total_tasks,
                    count(ProjectStatus::Planned),
                    count(ProjectStatus::Ongoing),
                    count(ProjectStatus::Done),
                    q.overdue_tasks,
                    q.near_deadline,
                    if q.name == current { "  <- now" } else { "" }
                );
            }
        }
        TimelineAction::Share { title, desc, columns, hide, password, expires, allow_filters } => {
            let hidden_tasks = hide
                .iter()
                .map(|t| resolve_task_identifier(t, &s.db).or_exit("Error resolving task"))
                .collect();
            let draft = TimelineDraft {
                title,
                description: desc,
                expires_at: expires.as_deref().map(parse_deadline),
                allowed_filters: allow_filters,
                visible_columns: if columns.is_empty() { Status::ALL.to_vec() } else { columns },
                hidden_tasks,
                password,
                created_by: s.actor.clone(),
            };
            let key = s
                .db
                .create_public_timeline(draft, now)
                .or_exit("Failed to share timeline")
                .access_key
                .clone();
            s.save();
            println!("Shared timeline with key {}", key);
        }
        TimelineAction::Open { key, password, search } => {
            let view = s
                .db
                .open_public_timeline(&key, password.as_deref(), now)
                .and_then(|v| v.search(search.as_deref().unwrap_or("")))
                .or_exit("Cannot open timeline");
            println!("{}", view.settings.title);
            if let Some(d) = &view.settings.description {
                println!("{}", d);
            }
            if view.tasks.is_empty() {
                println!("No tasks.");
            } else {
                print_table(&s.db, &view.tasks, now);
            }
        }
        TimelineAction::Revoke { key } => {
            s.db.set_timeline_public(&key, false).or_exit("Failed to revoke timeline");
            s.save();
            println!("Revoked {}", key);
        }
        TimelineAction::Shares => {
            for t in &s.db.public_timelines {
                let expiry = t
                    .expires_at
                    .map(|e| e.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "never".into());
                println!(
                    "{} {:<24} public={} password={} filters={} expires={}",
                    t.access_key,
                    truncate(&t.title, 24),
                    t.is_public,
                    t.is_password_protected,
                    t.allowed_filters,
                    expiry
                );
            }
        }
    }
}

pub fn cmd_user(s: &mut Session, action: UserAction) {
    match action {
        UserAction::Add { name, email, role, color } => {
            let input = UserInput { name: Some(name), email: Some(email), role, color };
            let id = s.db.add_user(input).or_exit("Failed to add user").id.clone();
            s.save();
            println!("Added user {}", id);
        }
        UserAction::Update { id, name, email, role, color } => {
            let id = resolve_user_identifier(&id, &s.db).or_exit("Error resolving user");
            s.db.update_user(&id, UserInput { name, email, role, color })
                .or_exit("Failed to update user");
            s.save();
            println!("Updated user {}", id);
        }
        UserAction::Rm { id } => {
            let id = resolve_user_identifier(&id, &s.db).or_exit("Error resolving user");
            s.db.remove_user(&id).or_exit("Failed to remove user");
            s.save();
            println!("Removed user {}", id);
        }
        UserAction::List => {
            println!("{:<20} {:<4} {:<28} {}", "ID", "", "Email", "Role");
            for u in &s.db.users {
                println!("{:<20} {:<4} {:<28} {}", truncate(&u.id, 20), u.initials, truncate(&u.email, 28), u.role);
            }
        }
    }
}

pub fn cmd_role(s: &mut Session, action: RoleAction) {
    match action {
        RoleAction::Add { name, perms } => {
            let id = s.db.add_role(&name, perms).or_exit("Failed to add role").id;
            s.save();
            println!("Added role {}", id);
        }
        RoleAction::Update { id, name, perms } => {
            let perms = Some(perms).filter(|p| !p.is_empty());
            s.db.update_role(id, name.as_deref(), perms).or_exit("Failed to update role");
            s.save();
            println!("Updated role {}", id);
        }
        RoleAction::Rm { id } => {
            s.db.remove_role(id).or_exit("Failed to remove role");
            s.save();
            println!("Removed role {}", id);
        }
        RoleAction::List => {
            for r in &s.db.roles {
                println!("{:<4} {:<20} {}", r.id, r.name, r.permissions.join(","));
            }
        }
    }
}

pub fn cmd_tag(s: &mut Session, action: TagAction) {
    match action {
        TagAction::Add { name, color } => {
            let id = s.db.add_tag_label(&name, &color).or_exit("Failed to add tag").id;
            s.save();
            println!("Added tag {}", id);
        }
        TagAction::Update { id, name, color } => {
            s.db.update_tag_label(id, name.as_deref(), color.as_deref())
                .or_exit("Failed to update tag");
            s.save();
            println!("Updated tag {}", id);
        }
        TagAction::Rm { id } => {
            s.db.remove_tag_label(id).or_exit("Failed to remove tag");
            s.save();
            println!("Removed tag {}", id);
        }
        TagAction::List => {
            for t in &s.db.tag_labels {
                println!("{:<4} {:<20} {}", t.id, t.name, t.color);
            }
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
