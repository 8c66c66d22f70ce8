//! Board projection and WIP policy.
//!
//! Column membership is a view over the store's status index. Callers read it
//! through [`Database::columns`] and never edit it directly; `move_task` is the
//! only writer.

use serde::{Deserialize, Serialize};

use crate::db::{format_status, Database};
use crate::error::{Error, Result};
use crate::fields::{Status, WipState};

/// Persistent definition of a column: everything except its membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: Status,
    pub title: String,
    #[serde(default)]
    pub wip_limit: Option<usize>,
    pub color: String,
}

/// A column as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanbanColumn {
    pub id: Status,
    pub title: String,
    pub task_ids: Vec<u64>,
    pub wip_limit: Option<usize>,
    pub color: String,
}

impl KanbanColumn {
    pub fn wip_state(&self) -> WipState {
        wip_state(self.task_ids.len(), self.wip_limit)
    }
}

/// The five standard columns. In Progress and Review carry WIP limits.
pub fn default_columns() -> Vec<ColumnDef> {
    let defaults: [(Status, Option<usize>, &str); 5] = [
        (Status::Backlog, None, "#F1F5F9"),
        (Status::InProgress, Some(3), "#DBEAFE"),
        (Status::Review, Some(2), "#E0F2FE"),
        (Status::Done, None, "#DCFCE7"),
        (Status::Blocked, None, "#FEE2E2"),
    ];
    defaults.iter()
        .map(|(id, wip_limit, color)| ColumnDef {
            id: *id,
            title: format_status(*id).to_string(),
            wip_limit: *wip_limit,
            color: color.to_string(),
        })
        .collect()
}

/// Classify a column's occupancy.
pub fn wip_state(count: usize, limit: Option<usize>) -> WipState {
    match limit {
        None => WipState::Unlimited,
        Some(limit) if count < limit => WipState::Under,
        Some(limit) if count == limit => WipState::AtCapacity,
        Some(_) => WipState::OverCapacity,
    }
}

impl Database {
    /// Definition of the column for `status`.
    pub fn column_def(&self, status: Status) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == status)
    }

    /// Project every column with its current members, in board order.
    pub fn columns(&self) -> Vec<KanbanColumn> {
        Status::ALL
            .iter()
            .filter_map(|s| self.column(*s))
            .collect()
    }

    /// Project a single column.
    pub fn column(&self, status: Status) -> Option<KanbanColumn> {
        let def = self.column_def(status)?;
        Some(KanbanColumn {
            id: def.id,
            title: def.title.clone(),
            task_ids: self.column_ids(status).to_vec(),
            wip_limit: def.wip_limit,
            color: def.color.clone(),
        })
    }

    /// Occupancy of a column right now.
    pub fn wip_state_of(&self, status: Status) -> WipState {
        let limit = self.column_def(status).and_then(|c| c.wip_limit);
        wip_state(self.column_ids(status).len(), limit)
    }

    /// Fail with `PolicyViolation` if one more task would not fit in `target`.
    pub fn check_wip(&self, target: Status) -> Result<()> {
        let count = self.column_ids(target).len();
        match self.column_def(target).and_then(|c| c.wip_limit) {
            Some(limit) if count >= limit => Err(Error::PolicyViolation {
                column: target,
                limit,
                count,
            }),
            _ => Ok(()),
        }
    }

    /// Change or clear a column's WIP limit.
    ///
    /// Lowering a limit below the current count is allowed and leaves the column
    /// over capacity.
    pub fn set_wip_limit(&mut self, status: Status, limit: Option<usize>) -> Result<WipState> {
        if limit == Some(0) {
            return Err(Error::Validation("WIP limit must be a positive number".into()));
        }
        let def = self
            .columns
            .iter_mut()
            .find(|c| c.id == status)
            .ok_or_else(|| Error::NotFound(format!("column {}", format_status(status))))?;
        def.wip_limit = limit;
        tracing::info!(column = ?status, ?limit, "WIP limit updated");
        Ok(self.wip_state_of(status))
    }
}
