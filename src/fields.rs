//! Enumerations and field types for task tracking.
//!
//! This module defines the structured values used to categorise tasks on the board
//! (status, project status, priority, tags) and the derived classifications produced
//! by the engine (activity kinds, energy levels, alert kinds, WIP state).

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kanban status of a task. Each status is also a board column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[serde(alias = "Backlog")]
    Backlog,
    #[serde(alias = "In Progress", alias = "InProgress")]
    InProgress,
    #[serde(alias = "Review")]
    Review,
    #[serde(alias = "Done")]
    Done,
    #[serde(alias = "Blocked")]
    Blocked,
}

impl Status {
    /// Every status in board column order.
    pub const ALL: [Status; 5] = [
        Status::Backlog,
        Status::InProgress,
        Status::Review,
        Status::Done,
        Status::Blocked,
    ];

    /// Position of this status on the board.
    pub fn column_index(self) -> usize {
        Status::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::db::format_status(*self))
    }
}

/// Roadmap-level status used by the timeline views.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[serde(alias = "Planned")]
    Planned,
    #[serde(alias = "Ongoing")]
    Ongoing,
    #[serde(alias = "Done")]
    Done,
}

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[serde(alias = "High")]
    High,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Low")]
    Low,
}

/// Category tags attached to tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    #[serde(alias = "Bug")]
    Bug,
    #[serde(alias = "Feature")]
    Feature,
    #[serde(alias = "Documentation")]
    Documentation,
    #[serde(alias = "Research")]
    Research,
    #[serde(alias = "Design")]
    Design,
    #[serde(alias = "Testing")]
    Testing,
}

/// Kind of an activity log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    StatusChange,
    AssigneeChange,
    PriorityChange,
    Comment,
    Edited,
    MicroUpdate,
}

/// Qualitative team energy level derived from the composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Condition that raised a time intelligence alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Stuck,
    DeadlineApproaching,
    FrequentReopens,
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Occupancy of a column relative to its WIP limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipState {
    /// The column has no limit.
    Unlimited,
    Under,
    /// Count equals the limit; further moves in are rejected.
    AtCapacity,
    /// Count exceeds the limit. Only reachable via forced moves or a lowered limit.
    OverCapacity,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Deadline,
    Priority,
    Status,
    Id,
}
