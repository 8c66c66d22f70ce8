//! Task data structures.
//!
//! This module defines the `Task` record together with its append-only activity log
//! and threaded comments, plus the draft and patch types used to create and edit tasks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A card on the board with its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Status,
    pub project_status: ProjectStatus,
    pub priority: Priority,
    /// User id of the assignee.
    pub assignee: Option<String>,
    /// User id of the product owner.
    #[serde(default)]
    pub product_owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Time of the last status transition (or creation).
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub activity_log: Vec<ActivityLogEntry>,
    /// Accumulated milliseconds spent in each status, excluding the current stint.
    #[serde(default = "empty_time_in_status")]
    pub time_in_status: BTreeMap<Status, i64>,
    #[serde(default)]
    pub comments: Vec<ThreadedComment>,
    #[serde(default)]
    pub reopen_count: u32,
    /// When the task entered its current status.
    #[serde(default)]
    pub stuck_since: Option<DateTime<Utc>>,
}

impl Task {
    /// Deadline has passed and the task is not finished.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now && self.status != Status::Done
    }

    /// Milliseconds accounted across all statuses.
    pub fn tracked_ms(&self) -> i64 {
        self.time_in_status.values().sum()
    }

    /// Milliseconds spent in the current status so far.
    pub fn current_stint_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_milliseconds().max(0)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Find a top-level comment by id.
    pub fn comment(&self, id: &str) -> Option<&ThreadedComment> {
        self.comments.iter().find(|c| c.id == id)
    }
}

/// A map with a zero entry for every status.
pub fn empty_time_in_status() -> BTreeMap<Status, i64> {
    Status::ALL.iter().map(|s| (*s, 0)).collect()
}

/// One immutable entry in a task's history feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub task_id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// User id of the actor.
    pub user: String,
}

/// A comment with its (one level deep) replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadedComment {
    pub id: String,
    pub task_id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    #[serde(default)]
    pub replies: Vec<ThreadedComment>,
}

/// Field values for a new task. Id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub project_status: ProjectStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub product_owner: Option<String>,
    pub tags: Vec<Tag>,
    pub deadline: DateTime<Utc>,
    pub scope: Option<String>,
}

impl TaskDraft {
    /// A backlog task with medium priority and the given deadline.
    pub fn new(title: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        TaskDraft {
            title: title.into(),
            description: String::new(),
            status: Status::Backlog,
            project_status: ProjectStatus::Planned,
            priority: Priority::Medium,
            assignee: None,
            product_owner: None,
            tags: Vec::new(),
            deadline,
            scope: None,
        }
    }
}

/// A partial edit. `None` leaves a field untouched; for the user references
/// `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub project_status: Option<ProjectStatus>,
    pub assignee: Option<Option<String>>,
    pub product_owner: Option<Option<String>>,
    pub add_tags: Vec<Tag>,
    pub rm_tags: Vec<Tag>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.scope.is_none()
            && self.deadline.is_none()
            && self.priority.is_none()
            && self.project_status.is_none()
            && self.assignee.is_none()
            && self.product_owner.is_none()
            && self.add_tags.is_empty()
            && self.rm_tags.is_empty()
    }
}
