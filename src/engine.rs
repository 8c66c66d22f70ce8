//! Task transition engine.
//!
//! Every mutation of a task goes through this module: status moves (with
//! time-in-status accounting, the activity log and the column index updated in one
//! step), comments and replies, edits, reopens and micro updates.
//!
//! All operations take the acting user and `now` explicitly. A missing task is
//! reported as [`Error::NotFound`] and leaves the store untouched.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{format_priority, format_status, Database};
use crate::error::{Error, Result};
use crate::fields::{ActivityKind, Status, WipState};
use crate::task::{empty_time_in_status, ActivityLogEntry, Task, TaskDraft, TaskPatch, ThreadedComment};

/// Result of a status move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        from: Status,
        to: Status,
        /// Occupancy of the target column after the move.
        wip: WipState,
    },
    /// The task was already in the target status; nothing was recorded.
    Unchanged,
}

fn log_entry(
    task_id: u64,
    kind: ActivityKind,
    actor: &str,
    now: DateTime<Utc>,
) -> ActivityLogEntry {
    ActivityLogEntry {
        id: Uuid::new_v4().to_string(),
        task_id,
        timestamp: now,
        kind,
        previous_value: None,
        new_value: None,
        comment: None,
        user: actor.to_string(),
    }
}

fn not_found(what: String) -> Error {
    tracing::warn!(target: "engine", "{} not found, nothing changed", what);
    Error::NotFound(what)
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

impl Database {
    fn require_user(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if self.user(id).is_none() => Err(not_found(format!("user '{}'", id))),
            _ => Ok(()),
        }
    }

    /// Create a task from a draft and return its id.
    ///
    /// The task starts its first status stint at `now` with every time-in-status
    /// bucket at zero. Creation does not consult WIP limits.
    pub fn create_task(&mut self, draft: TaskDraft, actor: &str, now: DateTime<Utc>) -> Result<u64> {
        require_text(&draft.title, "Task title")?;
        self.require_user(draft.assignee.as_deref())?;
        self.require_user(draft.product_owner.as_deref())?;

        let id = self.next_id();
        let mut tags = draft.tags;
        tags.sort();
        tags.dedup();

        let mut created = log_entry(id, ActivityKind::Created, actor, now);
        created.new_value = Some(format_status(draft.status).to_string());

        let task = Task {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            status: draft.status,
            project_status: draft.project_status,
            priority: draft.priority,
            assignee: draft.assignee,
            product_owner: draft.product_owner,
            tags,
            deadline: draft.deadline,
            created_at: now,
            updated_at: now,
            scope: draft.scope.filter(|s| !s.trim().is_empty()),
            activity_log: vec![created],
            time_in_status: empty_time_in_status(),
            comments: Vec::new(),
            reopen_count: 0,
            stuck_since: Some(now),
        };
        self.push_task(task);
        tracing::info!(task = id, status = ?draft.status, "task created");
        Ok(id)
    }

    /// Move a task to `to`, enforcing the target column's WIP limit.
    ///
    /// Elapsed time since the last transition is credited to the status being
    /// left, the task is appended to the target column and a `status_change` entry
    /// is logged. If the target column is at or over its limit the move is rejected
    /// with [`Error::PolicyViolation`] and nothing changes.
    pub fn move_task(
        &mut self,
        task_id: u64,
        to: Status,
        comment: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome> {
        self.transition(task_id, to, comment, actor, now, false)
    }

    /// Same as [`move_task`](Self::move_task) but ignores the WIP limit, for a
    /// caller that has confirmed the override.
    pub fn force_move_task(
        &mut self,
        task_id: u64,
        to: Status,
        comment: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome> {
        self.transition(task_id, to, comment, actor, now, true)
    }

    fn transition(
        &mut self,
        task_id: u64,
        to: Status,
        comment: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<MoveOutcome> {
        let from = match self.get(task_id) {
            Some(t) => t.status,
            None => return Err(not_found(format!("task {}", task_id))),
        };
        if from == to {
            tracing::debug!(task = task_id, status = ?to, "move to current status ignored");
            return Ok(MoveOutcome::Unchanged);
        }

        match self.check_wip(to) {
            Err(Error::PolicyViolation { limit, count, .. }) if force => {
                tracing::warn!(task = task_id, column = ?to, limit, count, "forcing move past WIP limit");
            }
            other => other?,
        }

        let task = self
            .task_mut(task_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        let elapsed = task.current_stint_ms(now);
        *task.time_in_status.entry(from).or_insert(0) += elapsed;
        task.status = to;
        task.updated_at = task.updated_at.max(now);
        task.stuck_since = Some(now);

        let mut entry = log_entry(task_id, ActivityKind::StatusChange, actor, now);
        entry.previous_value = Some(format_status(from).to_string());
        entry.new_value = Some(format_status(to).to_string());
        entry.comment = comment.map(str::trim).filter(|c| !c.is_empty()).map(String::from);
        task.activity_log.push(entry);

        self.reindex(task_id, to);
        let wip = self.wip_state_of(to);
        tracing::info!(task = task_id, ?from, ?to, elapsed_ms = elapsed, "task moved");
        Ok(MoveOutcome::Moved { from, to, wip })
    }

    /// Append a top-level comment and return its id.
    ///
    /// Quick comments only appear in the thread; regular comments are also
    /// recorded in the activity log.
    pub fn add_comment(
        &mut self,
        task_id: u64,
        content: &str,
        quick: bool,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        require_text(content, "Comment")?;
        let task = self
            .task_mut(task_id)
            .ok_or_else(|| not_found(format!("task {}", task_id)))?;

        let comment = ThreadedComment {
            id: Uuid::new_v4().to_string(),
            task_id,
            content: content.to_string(),
            timestamp: now,
            user: actor.to_string(),
            replies: Vec::new(),
        };
        let id = comment.id.clone();
        task.comments.push(comment);

        if !quick {
            let mut entry = log_entry(task_id, ActivityKind::Comment, actor, now);
            entry.comment = Some(content.to_string());
            task.activity_log.push(entry);
        }
        tracing::info!(task = task_id, quick, "comment added");
        Ok(id)
    }

    /// Append a reply to the top-level comment `parent_id` and return the reply id.
    ///
    /// Only top-level comments can be replied to; an id that names a reply (or
    /// nothing) is `NotFound`.
    pub fn add_reply(
        &mut self,
        task_id: u64,
        parent_id: &str,
        content: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        require_text(content, "Reply")?;
        let task = self
            .task_mut(task_id)
            .ok_or_else(|| not_found(format!("task {}", task_id)))?;
        let parent = match task.comments.iter_mut().find(|c| c.id == parent_id) {
            Some(parent) => parent,
            None => return Err(not_found(format!("comment '{}' on task {}", parent_id, task_id))),
        };

        let reply = ThreadedComment {
            id: Uuid::new_v4().to_string(),
            task_id,
            content: content.to_string(),
            timestamp: now,
            user: actor.to_string(),
            replies: Vec::new(),
        };
        let id = reply.id.clone();
        parent.replies.push(reply);
        tracing::info!(task = task_id, parent = parent_id, "reply added");
        Ok(id)
    }

    /// Apply a partial edit and return how many log entries it produced.
    ///
    /// Priority and assignee changes get their own entries; every other changed
    /// field is summarised in one `edited` entry. Fields set to their current value
    /// are not changes. Validation happens before anything is written.
    pub fn update_task(
        &mut self,
        task_id: u64,
        patch: TaskPatch,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let current = self
            .get(task_id)
            .ok_or_else(|| not_found(format!("task {}", task_id)))?;
        if let Some(title) = &patch.title {
            require_text(title, "Task title")?;
        }
        if let Some(assignee) = &patch.assignee {
            self.require_user(assignee.as_deref())?;
        }
        if let Some(owner) = &patch.product_owner {
            self.require_user(owner.as_deref())?;
        }

        let mut next = current.clone();
        let mut entries = Vec::new();
        let mut edited: Vec<&str> = Vec::new();

        if let Some(priority) = patch.priority.filter(|p| *p != next.priority) {
            let mut entry = log_entry(task_id, ActivityKind::PriorityChange, actor, now);
            entry.previous_value = Some(format_priority(next.priority).to_string());
            entry.new_value = Some(format_priority(priority).to_string());
            entries.push(entry);
            next.priority = priority;
        }
        if let Some(assignee) = patch.assignee.filter(|a| *a != next.assignee) {
            let mut entry = log_entry(task_id, ActivityKind::AssigneeChange, actor, now);
            entry.previous_value = next.assignee.clone();
            entry.new_value = assignee.clone();
            entries.push(entry);
            next.assignee = assignee;
        }
        if let Some(title) = patch.title.map(|t| t.trim().to_string()).filter(|t| *t != next.title) {
            next.title = title;
            edited.push("title");
        }
        if let Some(description) = patch.description.filter(|d| *d != next.description) {
            next.description = description;
            edited.push("description");
        }
        if let Some(scope) = patch.scope {
            let scope = Some(scope).filter(|s| !s.trim().is_empty());
            if scope != next.scope {
                next.scope = scope;
                edited.push("scope");
            }
        }
        if let Some(deadline) = patch.deadline.filter(|d| *d != next.deadline) {
            next.deadline = deadline;
            edited.push("deadline");
        }
        if let Some(ps) = patch.project_status.filter(|p| *p != next.project_status) {
            next.project_status = ps;
            edited.push("project status");
        }
        if let Some(owner) = patch.product_owner.filter(|o| *o != next.product_owner) {
            next.product_owner = owner;
            edited.push("product owner");
        }
        let before_tags = next.tags.clone();
        next.tags.extend(patch.add_tags);
        next.tags.retain(|t| !patch.rm_tags.contains(t));
        next.tags.sort();
        next.tags.dedup();
        if next.tags != before_tags {
            edited.push("tags");
        }

        if !edited.is_empty() {
            let mut entry = log_entry(task_id, ActivityKind::Edited, actor, now);
            entry.new_value = Some(edited.join(", "));
            entries.push(entry);
        }
        if entries.is_empty() {
            tracing::debug!(task = task_id, "update produced no changes");
            return Ok(0);
        }

        let count = entries.len();
        next.activity_log.extend(entries);
        if let Some(task) = self.task_mut(task_id) {
            *task = next;
        }
        tracing::info!(task = task_id, entries = count, "task updated");
        Ok(count)
    }

    /// Record that the task's scope was revisited. Returns the new reopen count.
    pub fn reopen_task(
        &mut self,
        task_id: u64,
        reason: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        let task = self
            .task_mut(task_id)
            .ok_or_else(|| not_found(format!("task {}", task_id)))?;
        let previous = task.reopen_count;
        task.reopen_count += 1;

        let mut entry = log_entry(task_id, ActivityKind::Edited, actor, now);
        entry.previous_value = Some(format!("reopened {} times", previous));
        entry.new_value = Some(format!("reopened {} times", task.reopen_count));
        entry.comment = reason.map(str::trim).filter(|r| !r.is_empty()).map(String::from);
        task.activity_log.push(entry);

        tracing::info!(task = task_id, reopen_count = task.reopen_count, "task reopened");
        Ok(task.reopen_count)
    }

    /// Log a short progress note in the history feed only.
    pub fn micro_update(&mut self, task_id: u64, note: &str, actor: &str, now: DateTime<Utc>) -> Result<()> {
        require_text(note, "Update note")?;
        let task = self
            .task_mut(task_id)
            .ok_or_else(|| not_found(format!("task {}", task_id)))?;
        let mut entry = log_entry(task_id, ActivityKind::MicroUpdate, actor, now);
        entry.comment = Some(note.trim().to_string());
        task.activity_log.push(entry);
        tracing::info!(task = task_id, "micro update logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Tag};
    use crate::user::User;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    fn board_with_user() -> Database {
        let mut db = Database::default();
        db.users.push(User {
            id: "u1".into(),
            name: "Alex Johnson".into(),
            email: "alex@example.com".into(),
            role: "Product Owner".into(),
            initials: "AJ".into(),
            color: "#3B82F6".into(),
        });
        db
    }

    fn new_task(db: &mut Database, title: &str) -> u64 {
        db.create_task(TaskDraft::new(title, t0() + Duration::days(30)), "u1", t0())
            .unwrap()
    }

    #[test]
    fn test_create_task_initial_state() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "  Implement auth ");
        let task = db.get(id).unwrap();
        assert_eq!(task.title, "Implement auth");
        assert_eq!(task.status, Status::Backlog);
        assert_eq!(task.time_in_status.len(), 5);
        assert!(task.time_in_status.values().all(|v| *v == 0));
        assert_eq!(task.activity_log.len(), 1);
        assert_eq!(task.activity_log[0].kind, ActivityKind::Created);
        assert_eq!(task.stuck_since, Some(t0()));
        assert_eq!(db.column_ids(Status::Backlog), &[id]);
    }

    #[test]
    fn test_create_task_rejects_blank_title_and_unknown_assignee() {
        let mut db = board_with_user();
        let blank = db.create_task(TaskDraft::new("   ", t0()), "u1", t0());
        assert!(matches!(blank, Err(Error::Validation(_))));

        let mut draft = TaskDraft::new("Orphan", t0());
        draft.assignee = Some("ghost".into());
        assert!(matches!(db.create_task(draft, "u1", t0()), Err(Error::NotFound(_))));
        assert!(db.tasks().is_empty());
    }

    #[test]
    fn test_move_accumulates_time_and_logs() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Move me");
        let later = t0() + Duration::hours(5);

        let outcome = db.move_task(id, Status::InProgress, Some("starting"), "u1", later).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Moved { from: Status::Backlog, to: Status::InProgress, wip: WipState::Under }
        );

        let task = db.get(id).unwrap();
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.updated_at, later);
        assert_eq!(task.time_in_status[&Status::Backlog], 5 * 3_600_000);
        assert_eq!(task.time_in_status[&Status::InProgress], 0);
        let entry = task.activity_log.last().unwrap();
        assert_eq!(entry.kind, ActivityKind::StatusChange);
        assert_eq!(entry.previous_value.as_deref(), Some("Backlog"));
        assert_eq!(entry.new_value.as_deref(), Some("In Progress"));
        assert_eq!(entry.comment.as_deref(), Some("starting"));
        assert_eq!(entry.timestamp, later);
        assert!(db.column_ids(Status::Backlog).is_empty());
        assert_eq!(db.column_ids(Status::InProgress), &[id]);
    }

    #[test]
    fn test_time_in_status_sums_to_age_after_many_moves() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Wanderer");
        let path = [
            (Status::InProgress, 3),
            (Status::Blocked, 7),
            (Status::InProgress, 26),
            (Status::Review, 50),
            (Status::Done, 51),
        ];
        let mut last = t0();
        for (status, hours) in path {
            last = t0() + Duration::hours(hours);
            db.move_task(id, status, None, "u1", last).unwrap();
        }
        let task = db.get(id).unwrap();
        assert_eq!(task.tracked_ms(), (last - task.created_at).num_milliseconds());
        assert_eq!(task.time_in_status[&Status::InProgress], (4 + 24) * 3_600_000);
        assert_eq!(task.time_in_status[&Status::Done], 0);
    }

    #[test]
    fn test_time_never_decreases_when_clock_goes_back() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Skewed");
        db.move_task(id, Status::InProgress, None, "u1", t0() - Duration::minutes(5)).unwrap();
        let task = db.get(id).unwrap();
        assert!(task.time_in_status.values().all(|v| *v == 0));
        assert_eq!(task.updated_at, t0());
    }

    #[test]
    fn test_move_to_same_status_is_noop() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Stay");
        let before = db.get(id).unwrap().activity_log.len();
        let outcome = db.move_task(id, Status::Backlog, None, "u1", t0() + Duration::hours(1)).unwrap();
        assert_eq!(outcome, MoveOutcome::Unchanged);
        let task = db.get(id).unwrap();
        assert_eq!(task.activity_log.len(), before);
        assert_eq!(task.updated_at, t0());
        assert_eq!(task.tracked_ms(), 0);
    }

    #[test]
    fn test_move_missing_task_is_not_found() {
        let mut db = board_with_user();
        new_task(&mut db, "Present");
        let result = db.move_task(42, Status::Done, None, "u1", t0());
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(db.column_ids(Status::Done).len(), 0);
    }

    #[test]
    fn test_wip_limit_blocks_move_and_leaves_columns_unchanged() {
        let mut db = board_with_user();
        let mut in_progress = Vec::new();
        for i in 0..3 {
            let id = new_task(&mut db, &format!("busy {i}"));
            db.move_task(id, Status::InProgress, None, "u1", t0()).unwrap();
            in_progress.push(id);
        }
        let fourth = new_task(&mut db, "one too many");
        let log_len = db.get(fourth).unwrap().activity_log.len();

        let result = db.move_task(fourth, Status::InProgress, None, "u1", t0() + Duration::hours(1));
        match result {
            Err(Error::PolicyViolation { column, limit, count }) => {
                assert_eq!(column, Status::InProgress);
                assert_eq!(limit, 3);
                assert_eq!(count, 3);
            }
            other => panic!("expected PolicyViolation, got {:?}", other),
        }
        assert_eq!(db.column_ids(Status::InProgress), in_progress.as_slice());
        assert_eq!(db.column_ids(Status::Backlog), &[fourth]);
        let task = db.get(fourth).unwrap();
        assert_eq!(task.status, Status::Backlog);
        assert_eq!(task.activity_log.len(), log_len);
        assert_eq!(task.tracked_ms(), 0);
    }

    #[test]
    fn test_forced_move_goes_over_capacity() {
        let mut db = board_with_user();
        for i in 0..2 {
            let id = new_task(&mut db, &format!("review {i}"));
            db.move_task(id, Status::Review, None, "u1", t0()).unwrap();
        }
        let extra = new_task(&mut db, "urgent");
        let outcome = db.force_move_task(extra, Status::Review, Some("hotfix"), "u1", t0()).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Moved { from: Status::Backlog, to: Status::Review, wip: WipState::OverCapacity }
        );
        assert_eq!(db.column_ids(Status::Review).last(), Some(&extra));
    }

    #[test]
    fn test_moved_task_is_appended_to_column() {
        let mut db = board_with_user();
        let a = new_task(&mut db, "a");
        let b = new_task(&mut db, "b");
        let c = new_task(&mut db, "c");
        db.move_task(a, Status::Blocked, None, "u1", t0()).unwrap();
        db.move_task(a, Status::Backlog, None, "u1", t0() + Duration::minutes(1)).unwrap();
        assert_eq!(db.column_ids(Status::Backlog), &[b, c, a]);
    }

    #[test]
    fn test_quick_comment_skips_activity_log() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Chatty");
        let before = db.get(id).unwrap().activity_log.len();

        db.add_comment(id, "just a note", true, "u1", t0()).unwrap();
        assert_eq!(db.get(id).unwrap().activity_log.len(), before);

        db.add_comment(id, "for the record", false, "u1", t0()).unwrap();
        let task = db.get(id).unwrap();
        assert_eq!(task.activity_log.len(), before + 1);
        assert_eq!(task.activity_log.last().unwrap().kind, ActivityKind::Comment);
        assert_eq!(task.comments.len(), 2);
        assert_eq!(task.comments[0].content, "just a note");
        assert_eq!(task.comments[1].content, "for the record");
    }

    #[test]
    fn test_blank_comment_is_rejected() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Quiet");
        assert!(matches!(db.add_comment(id, "  ", false, "u1", t0()), Err(Error::Validation(_))));
        assert!(db.get(id).unwrap().comments.is_empty());
    }

    #[test]
    fn test_reply_threads_under_top_level_comment() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Threaded");
        let parent = db.add_comment(id, "question?", false, "u1", t0()).unwrap();
        let reply = db.add_reply(id, &parent, "answer", "u1", t0()).unwrap();

        let task = db.get(id).unwrap();
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.comments[0].replies.len(), 1);
        assert_eq!(task.comments[0].replies[0].id, reply);

        // Replies to replies are not supported.
        let nested = db.add_reply(id, &reply, "deeper", "u1", t0());
        assert!(matches!(nested, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reply_to_unknown_parent_leaves_comments_unchanged() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Lonely");
        db.add_comment(id, "hello", true, "u1", t0()).unwrap();
        let before = db.get(id).unwrap().comments.clone();

        let result = db.add_reply(id, "no-such-comment", "hi", "u1", t0());
        assert!(matches!(result, Err(Error::NotFound(_))));
        let after = &db.get(id).unwrap().comments;
        assert_eq!(after.len(), before.len());
        assert!(after[0].replies.is_empty());
    }

    #[test]
    fn test_update_logs_priority_assignee_and_edits() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Editable");
        let patch = TaskPatch {
            priority: Some(Priority::High),
            assignee: Some(Some("u1".into())),
            title: Some("Edited".into()),
            add_tags: vec![Tag::Bug, Tag::Bug],
            ..Default::default()
        };
        assert_eq!(db.update_task(id, patch, "u1", t0() + Duration::hours(2)).unwrap(), 3);

        let task = db.get(id).unwrap();
        let kinds: Vec<ActivityKind> = task.activity_log.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::Created, ActivityKind::PriorityChange, ActivityKind::AssigneeChange, ActivityKind::Edited]
        );
        assert_eq!(task.activity_log[1].previous_value.as_deref(), Some("Medium"));
        assert_eq!(task.activity_log[1].new_value.as_deref(), Some("High"));
        assert_eq!(task.activity_log[3].new_value.as_deref(), Some("title, tags"));
        assert_eq!(task.tags, vec![Tag::Bug]);
        // Edits do not restart the status clock.
        assert_eq!(task.updated_at, t0());
    }

    #[test]
    fn test_update_with_same_values_is_noop() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Same");
        let patch = TaskPatch {
            title: Some("Same".into()),
            priority: Some(Priority::Medium),
            ..Default::default()
        };
        assert_eq!(db.update_task(id, patch, "u1", t0()).unwrap(), 0);
        assert_eq!(db.get(id).unwrap().activity_log.len(), 1);
    }

    #[test]
    fn test_update_validation_leaves_task_untouched() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Guarded");
        let patch = TaskPatch {
            priority: Some(Priority::High),
            assignee: Some(Some("nobody".into())),
            ..Default::default()
        };
        assert!(matches!(db.update_task(id, patch, "u1", t0()), Err(Error::NotFound(_))));
        let task = db.get(id).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.activity_log.len(), 1);
    }

    #[test]
    fn test_reopen_and_micro_update() {
        let mut db = board_with_user();
        let id = new_task(&mut db, "Scope creep");
        assert_eq!(db.reopen_task(id, Some("new requirement"), "u1", t0()).unwrap(), 1);
        assert_eq!(db.reopen_task(id, None, "u1", t0()).unwrap(), 2);
        db.micro_update(id, "schema drafted", "u1", t0()).unwrap();
        assert!(matches!(db.micro_update(id, "", "u1", t0()), Err(Error::Validation(_))));

        let task = db.get(id).unwrap();
        assert_eq!(task.reopen_count, 2);
        assert_eq!(task.status, Status::Backlog);
        let last = task.activity_log.last().unwrap();
        assert_eq!(last.kind, ActivityKind::MicroUpdate);
        assert_eq!(last.comment.as_deref(), Some("schema drafted"));
    }
}
