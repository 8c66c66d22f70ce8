//! The board store and shared formatting utilities.
//!
//! `Database` is the single owner of every entity on the board. Tasks are only
//! mutated through the engine operations so that the status index (the source of
//! column membership) never drifts from task status. The store is persisted by the
//! CLI host as a JSON snapshot; the derived index is rebuilt on load.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::TimeIntelligenceAlert;
use crate::board::{default_columns, ColumnDef};
use crate::error::{Error, Result};
use crate::fields::*;
use crate::retro::RetrospectiveEntry;
use crate::settings::{RoleRecord, TagLabel};
use crate::task::{empty_time_in_status, Task};
use crate::timeline::PublicTimelineSettings;
use crate::user::User;

/// In-memory store for a board session.
#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub retrospectives: Vec<RetrospectiveEntry>,
    #[serde(default)]
    pub alerts: Vec<TimeIntelligenceAlert>,
    /// Next alert id. Never reused, even after an alert is dropped.
    #[serde(default)]
    pub next_alert_id: u64,
    #[serde(default)]
    pub public_timelines: Vec<PublicTimelineSettings>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub tag_labels: Vec<TagLabel>,
    /// Status -> ordered task ids. Derived from `tasks`, never persisted.
    #[serde(skip)]
    index: BTreeMap<Status, Vec<u64>>,
}

impl Default for Database {
    fn default() -> Self {
        let mut db = Database {
            tasks: Vec::new(),
            users: Vec::new(),
            columns: default_columns(),
            retrospectives: Vec::new(),
            alerts: Vec::new(),
            next_alert_id: 1,
            public_timelines: Vec::new(),
            roles: Vec::new(),
            tag_labels: Vec::new(),
            index: BTreeMap::new(),
        };
        db.rebuild_index();
        db
    }
}

impl Database {
    /// Load a snapshot from JSON, or start an empty board if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no snapshot, starting empty board");
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(path)?;
        Self::from_json(&buf)
    }

    /// Parse a snapshot and restore derived state.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut db: Database = serde_json::from_str(json)?;
        db.normalise();
        db.rebuild_index();
        Ok(db)
    }

    /// Save the snapshot using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        tracing::debug!(path = %path.display(), tasks = self.tasks.len(), "snapshot saved");
        Ok(())
    }

    /// Fill in anything an older or hand-edited snapshot may lack.
    fn normalise(&mut self) {
        for t in self.tasks.iter_mut() {
            for s in Status::ALL {
                t.time_in_status.entry(s).or_insert(0);
            }
            t.tags.sort();
            t.tags.dedup();
        }
        for s in Status::ALL {
            if !self.columns.iter().any(|c| c.id == s) {
                if let Some(def) = default_columns().into_iter().find(|c| c.id == s) {
                    self.columns.push(def);
                }
            }
        }
        self.columns.sort_by_key(|c| c.id.column_index());
        self.next_alert_id = self.next_alert_id.max(next_id(self.alerts.iter().map(|a| a.id)));
    }

    /// Recompute column membership from task status.
    ///
    /// Within a column tasks are ordered by their last transition, which matches the
    /// append-on-move order maintained during a session.
    pub fn rebuild_index(&mut self) {
        let mut index: BTreeMap<Status, Vec<u64>> =
            Status::ALL.iter().map(|s| (*s, Vec::new())).collect();
        let mut ordered: Vec<&Task> = self.tasks.iter().collect();
        ordered.sort_by_key(|t| (t.updated_at, t.id));
        for t in ordered {
            index.entry(t.status).or_default().push(t.id);
        }
        self.index = index;
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        next_id(self.tasks.iter().map(|t| t.id))
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Mutable access for engine operations. Status changes must go through
    /// `move_task` so the index stays in sync.
    pub(crate) fn task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Append a task and index it at the end of its column.
    pub(crate) fn push_task(&mut self, task: Task) {
        let mut task = task;
        for s in Status::ALL {
            task.time_in_status.entry(s).or_insert(0);
        }
        self.index.entry(task.status).or_default().push(task.id);
        self.tasks.push(task);
    }

    /// Move an id to the end of `to`'s column, removing it from every other column.
    pub(crate) fn reindex(&mut self, id: u64, to: Status) {
        for ids in self.index.values_mut() {
            ids.retain(|&x| x != id);
        }
        let target = self.index.entry(to).or_default();
        if !target.contains(&id) {
            target.push(id);
        }
    }

    /// Ordered task ids currently in a column.
    pub fn column_ids(&self, status: Status) -> &[u64] {
        self.index.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get a user by id.
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Display initials for an optional user reference.
    pub fn initials_of(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.user(id))
            .map(|u| u.initials.clone())
            .unwrap_or_else(|| "-".into())
    }
}

/// One more than the largest id, or 1 for an empty collection.
pub fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

/// Treat a calendar date as a deadline: the last millisecond of that day in UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(Utc::now)
}

/// The first instant of a calendar date in UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(Utc::now)
}

/// Parse human-readable date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday", "next friday", "this sat"
/// - "end of week", "end of month"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    parse_due_input_from(s, Local::now().date_naive())
}

/// `parse_due_input` relative to an explicit `today`.
pub fn parse_due_input_from(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some((split, _)) = rest.char_indices().last() {
            let (num, unit) = rest.split_at(split);
            if let Ok(n) = num.trim().parse::<i64>() {
                match unit {
                    "d" => return Some(today + Duration::days(n)),
                    "w" => return Some(today + Duration::weeks(n)),
                    // Approximate: 30 days per month
                    "m" => return Some(today + Duration::days(n * 30)),
                    _ => {}
                }
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name || s == format!("this {}", day_name) {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", day_name) {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a deadline relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (due.date_naive() - now.date_naive()).num_days();
    match days {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {}d", d),
        d => format!("{}d late", -d),
    }
}

/// Format a millisecond duration as a compact "3d 4h" / "2h 5m" / "40s" string.
pub fn format_duration_ms(ms: i64) -> String {
    let d = Duration::milliseconds(ms.max(0));
    if d.num_days() > 0 {
        format!("{}d {}h", d.num_days(), d.num_hours() % 24)
    } else if d.num_hours() > 0 {
        format!("{}h {}m", d.num_hours(), d.num_minutes() % 60)
    } else if d.num_minutes() > 0 {
        format!("{}m", d.num_minutes())
    } else {
        format!("{}s", d.num_seconds())
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Backlog => "Backlog",
        Status::InProgress => "In Progress",
        Status::Review => "Review",
        Status::Done => "Done",
        Status::Blocked => "Blocked",
    }
}

/// Format a project status for display.
pub fn format_project_status(s: ProjectStatus) -> &'static str {
    match s {
        ProjectStatus::Planned => "Planned",
        ProjectStatus::Ongoing => "Ongoing",
        ProjectStatus::Done => "Done",
    }
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

/// Format a tag for display.
pub fn format_tag(t: Tag) -> &'static str {
    match t {
        Tag::Bug => "Bug",
        Tag::Feature => "Feature",
        Tag::Documentation => "Documentation",
        Tag::Research => "Research",
        Tag::Design => "Design",
        Tag::Testing => "Testing",
    }
}

/// Rank used when sorting by priority (High first).
pub fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

/// Print tasks in a formatted table.
pub fn print_table(db: &Database, tasks: &[&Task], now: DateTime<Utc>) {
    println!(
        "{:<5} {:<12} {:<7} {:<10} {:<4} {}",
        "ID", "Status", "Pri", "Deadline", "Who", "Title [tags]"
    );
    for t in tasks {
        let tags = if t.tags.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = t.tags.iter().map(|tg| format_tag(*tg)).collect();
            format!(" [{}]", names.join(","))
        };
        println!(
            "{:<5} {:<12} {:<7} {:<10} {:<4} {}{}",
            t.id,
            format_status(t.status),
            format_priority(t.priority),
            format_due_relative(t.deadline, now),
            truncate(&db.initials_of(t.assignee.as_deref()), 4),
            t.title,
            tags
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using the ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64> {
    if let Ok(id) = identifier.trim_start_matches('#').parse::<u64>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(Error::NotFound(format!("task {}", id))),
        };
    }

    let needle = identifier.to_lowercase();
    let matches: Vec<&Task> = db
        .tasks()
        .iter()
        .filter(|task| task.title.to_lowercase() == needle)
        .collect();

    match matches.len() {
        0 => Err(Error::NotFound(format!("task named '{}'", identifier))),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("multiple tasks named '{}':\n", identifier);
            for task in matches {
                msg.push_str(&format!("  ID {}: {} ({})\n", task.id, task.title, format_status(task.status)));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(Error::Validation(msg))
        }
    }
}

/// Resolve a user by id, email or case-insensitive name.
pub fn resolve_user_identifier(identifier: &str, db: &Database) -> Result<String> {
    let needle = identifier.to_lowercase();
    db.users
        .iter()
        .find(|u| u.id == identifier || u.email.to_lowercase() == needle || u.name.to_lowercase() == needle)
        .map(|u| u.id.clone())
        .ok_or_else(|| Error::NotFound(format!("user '{}'", identifier)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_due_input() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(); // a Monday
        assert_eq!(parse_due_input_from("today", today), Some(today));
        assert_eq!(parse_due_input_from("in 3d", today), NaiveDate::from_ymd_opt(2026, 10, 22));
        assert_eq!(parse_due_input_from("in 2w", today), NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(parse_due_input_from("friday", today), NaiveDate::from_ymd_opt(2026, 10, 23));
        assert_eq!(parse_due_input_from("next monday", today), NaiveDate::from_ymd_opt(2026, 10, 26));
        assert_eq!(parse_due_input_from("eom", today), NaiveDate::from_ymd_opt(2026, 10, 31));
        assert_eq!(parse_due_input_from("2027-01-05", today), NaiveDate::from_ymd_opt(2027, 1, 5));
        assert_eq!(parse_due_input_from("someday", today), None);
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(45_000), "45s");
        assert_eq!(format_duration_ms(5 * 60_000), "5m");
        assert_eq!(format_duration_ms((2 * 60 + 5) * 60_000), "2h 5m");
        assert_eq!(format_duration_ms((3 * 24 + 4) * 3_600_000), "3d 4h");
        assert_eq!(format_duration_ms(-10), "0s");
    }

    #[test]
    fn test_format_due_relative() {
        assert_eq!(format_due_relative(at(10, 23), at(10, 1)), "today");
        assert_eq!(format_due_relative(at(11, 1), at(10, 23)), "tomorrow");
        assert_eq!(format_due_relative(at(15, 0), at(10, 0)), "in 5d");
        assert_eq!(format_due_relative(at(8, 0), at(10, 0)), "2d late");
    }

    #[test]
    fn test_snapshot_round_trip_rebuilds_index() {
        let mut db = Database::default();
        let a = db.create_task(TaskDraft::new("First", at(20, 0)), "u1", at(1, 9)).unwrap();
        let b = db.create_task(TaskDraft::new("Second", at(20, 0)), "u1", at(1, 10)).unwrap();
        db.move_task(a, Status::InProgress, None, "u1", at(2, 9)).unwrap();

        let json = serde_json::to_string(&db).unwrap();
        let restored = Database::from_json(&json).unwrap();

        assert_eq!(restored.column_ids(Status::Backlog), &[b]);
        assert_eq!(restored.column_ids(Status::InProgress), &[a]);
        assert_eq!(restored.get(a).unwrap().time_in_status.len(), Status::ALL.len());
    }

    #[test]
    fn test_load_missing_file_is_empty_board() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::load(&dir.path().join("absent.json")).unwrap();
        assert!(db.tasks().is_empty());
        assert_eq!(db.columns.len(), Status::ALL.len());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("board.json");
        let mut db = Database::default();
        db.create_task(TaskDraft::new("Persist me", at(20, 0)), "u1", at(1, 9)).unwrap();
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks().len(), 1);
        assert_eq!(loaded.tasks()[0].title, "Persist me");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_resolve_task_identifier() {
        let mut db = Database::default();
        let id = db.create_task(TaskDraft::new("Ship it", at(20, 0)), "u1", at(1, 9)).unwrap();
        db.create_task(TaskDraft::new("Twin", at(20, 0)), "u1", at(1, 9)).unwrap();
        db.create_task(TaskDraft::new("twin", at(20, 0)), "u1", at(1, 9)).unwrap();

        assert_eq!(resolve_task_identifier(&id.to_string(), &db).unwrap(), id);
        assert_eq!(resolve_task_identifier("ship IT", &db).unwrap(), id);
        assert!(matches!(resolve_task_identifier("99", &db), Err(Error::NotFound(_))));
        assert!(matches!(resolve_task_identifier("twin", &db), Err(Error::Validation(_))));
    }
}
