//! Retrospective log. Entries are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{next_id, Database};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrospectiveEntry {
    pub id: u64,
    /// Free-form label such as "Sprint 14" or "2026-Q3".
    pub period: String,
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub wins: Vec<String>,
    #[serde(default)]
    pub related_task_ids: Vec<u64>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Input for a new entry.
#[derive(Debug, Clone, Default)]
pub struct RetroDraft {
    pub period: String,
    pub lessons_learned: Vec<String>,
    pub blockers: Vec<String>,
    pub wins: Vec<String>,
    pub related_task_ids: Vec<u64>,
    pub created_by: String,
}

fn prune(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Database {
    pub fn create_retrospective(&mut self, draft: RetroDraft, now: DateTime<Utc>) -> Result<&RetrospectiveEntry> {
        let period = draft.period.trim().to_string();
        if period.is_empty() {
            return Err(Error::Validation("Retrospective period is required".into()));
        }
        if let Some(missing) = draft.related_task_ids.iter().find(|id| self.get(**id).is_none()) {
            tracing::warn!(task = *missing, "retrospective references unknown task");
            return Err(Error::NotFound(format!("task {}", missing)));
        }

        let mut related = draft.related_task_ids;
        related.sort_unstable();
        related.dedup();
        let entry = RetrospectiveEntry {
            id: next_id(self.retrospectives.iter().map(|r| r.id)),
            period,
            lessons_learned: prune(draft.lessons_learned),
            blockers: prune(draft.blockers),
            wins: prune(draft.wins),
            related_task_ids: related,
            created_at: now,
            created_by: draft.created_by,
        };
        tracing::info!(retro = entry.id, period = %entry.period, "retrospective recorded");
        self.retrospectives.push(entry);
        match self.retrospectives.last() {
            Some(entry) => Ok(entry),
            None => Err(Error::NotFound("retrospective".into())),
        }
    }

    /// Entries newest first.
    pub fn retrospectives_newest_first(&self) -> Vec<&RetrospectiveEntry> {
        let mut out: Vec<&RetrospectiveEntry> = self.retrospectives.iter().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}
