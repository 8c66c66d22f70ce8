//! Filtering of task lists.
//!
//! Dimensions combine with AND; the tag dimension matches any of its tags.
//! The output keeps the input order.

use chrono::NaiveDate;

use crate::db::{end_of_day, start_of_day};
use crate::fields::{Priority, Tag};
use crate::task::Task;

/// Inclusive deadline window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// User id.
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<Tag>,
    pub search: String,
    pub date_range: DateRange,
}

impl FilterState {
    /// Whether any dimension constrains the result.
    pub fn is_active(&self) -> bool {
        self.assignee.is_some()
            || self.priority.is_some()
            || !self.tags.is_empty()
            || !self.search.trim().is_empty()
            || self.date_range.is_set()
    }

    /// Test a single task against every dimension.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(assignee) = &self.assignee {
            if task.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| task.has_tag(*t)) {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty()
            && !task.title.to_lowercase().contains(&needle)
            && !task.description.to_lowercase().contains(&needle)
        {
            return false;
        }

        if let Some(start) = self.date_range.start {
            if task.deadline < start_of_day(start) {
                return false;
            }
        }
        if let Some(end) = self.date_range.end {
            if task.deadline > end_of_day(end) {
                return false;
            }
        }
        true
    }
}

/// Tasks matching `filter`, in input order.
pub fn apply_filters<'a>(tasks: &'a [Task], filter: &FilterState) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}
