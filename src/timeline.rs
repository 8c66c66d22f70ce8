//! Roadmap timeline: quarter summaries and shareable read-only views.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{next_id, Database};
use crate::error::{Error, Result};
use crate::fields::{ProjectStatus, Status};
use crate::filter::FilterState;
use crate::task::Task;

/// Counts for one calendar quarter, grouped by deadline month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterSummary {
    pub name: String,
    pub total_tasks: usize,
    pub by_status: BTreeMap<ProjectStatus, usize>,
    pub overdue_tasks: usize,
    /// Due within the next seven days and not done.
    pub near_deadline: usize,
}

const NEAR_DEADLINE_DAYS: i64 = 7;

pub fn quarter_summaries(tasks: &[Task], now: DateTime<Utc>) -> Vec<QuarterSummary> {
    let mut out: Vec<QuarterSummary> = (1..=4)
        .map(|q| QuarterSummary {
            name: format!("Q{}", q),
            total_tasks: 0,
            by_status: [ProjectStatus::Planned, ProjectStatus::Ongoing, ProjectStatus::Done]
                .into_iter()
                .map(|s| (s, 0))
                .collect(),
            overdue_tasks: 0,
            near_deadline: 0,
        })
        .collect();

    for task in tasks {
        let q = &mut out[task.deadline.month0() as usize / 3];
        q.total_tasks += 1;
        *q.by_status.entry(task.project_status).or_insert(0) += 1;
        if task.project_status == ProjectStatus::Done {
            continue;
        }
        if task.deadline < now {
            q.overdue_tasks += 1;
        } else if (task.deadline - now).num_days() <= NEAR_DEADLINE_DAYS {
            q.near_deadline += 1;
        }
    }
    out
}

/// Name of the quarter containing `now`.
pub fn current_quarter(now: DateTime<Utc>) -> String {
    format!("Q{}", now.month0() / 3 + 1)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicTimelineSettings {
    pub id: u64,
    pub access_key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether viewers may filter the shared view.
    #[serde(default)]
    pub allowed_filters: bool,
    pub visible_columns: Vec<Status>,
    #[serde(default)]
    pub hidden_tasks: Vec<u64>,
    #[serde(default)]
    pub is_password_protected: bool,
    #[serde(default)]
    pub password: Option<String>,
    pub is_public: bool,
}

/// Input for sharing a timeline.
#[derive(Debug, Clone)]
pub struct TimelineDraft {
    pub title: String,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub allowed_filters: bool,
    pub visible_columns: Vec<Status>,
    pub hidden_tasks: Vec<u64>,
    /// Protects the view when set.
    pub password: Option<String>,
    pub created_by: String,
}

/// What a viewer sees after opening a shared timeline.
#[derive(Debug)]
pub struct PublicTimelineView<'a> {
    pub settings: &'a PublicTimelineSettings,
    pub tasks: Vec<&'a Task>,
}

impl<'a> PublicTimelineView<'a> {
    /// Narrow the view to tasks whose title or description contains `needle`.
    ///
    /// Only views shared with `allowed_filters` accept a search; a blank needle
    /// leaves any view unchanged.
    pub fn search(mut self, needle: &str) -> Result<Self> {
        if needle.trim().is_empty() {
            return Ok(self);
        }
        if !self.settings.allowed_filters {
            tracing::warn!(key = %self.settings.access_key, "filtering refused on shared timeline");
            return Err(Error::AccessDenied("this timeline does not allow filtering".into()));
        }
        let filter = FilterState {
            search: needle.to_string(),
            ..FilterState::default()
        };
        self.tasks.retain(|t| filter.matches(t));
        Ok(self)
    }
}

fn generate_key(existing: &[PublicTimelineSettings]) -> String {
    loop {
        let key: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        if !existing.iter().any(|t| t.access_key == key) {
            return key;
        }
    }
}

impl Database {
    pub fn create_public_timeline(&mut self, draft: TimelineDraft, now: DateTime<Utc>) -> Result<&PublicTimelineSettings> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("Timeline title is required".into()));
        }
        let password = draft.password.filter(|p| !p.trim().is_empty());
        let mut visible = draft.visible_columns;
        visible.sort();
        visible.dedup();
        if visible.is_empty() {
            return Err(Error::Validation("At least one column must be visible".into()));
        }

        let settings = PublicTimelineSettings {
            id: next_id(self.public_timelines.iter().map(|t| t.id)),
            access_key: generate_key(&self.public_timelines),
            title,
            description: draft.description.filter(|d| !d.trim().is_empty()),
            created_by: draft.created_by,
            created_at: now,
            expires_at: draft.expires_at,
            allowed_filters: draft.allowed_filters,
            visible_columns: visible,
            hidden_tasks: draft.hidden_tasks,
            is_password_protected: password.is_some(),
            password,
            is_public: true,
        };
        tracing::info!(timeline = settings.id, key = %settings.access_key, "public timeline created");
        self.public_timelines.push(settings);
        match self.public_timelines.last() {
            Some(t) => Ok(t),
            None => Err(Error::NotFound("timeline".into())),
        }
    }

    /// Publish or withdraw a shared timeline.
    pub fn set_timeline_public(&mut self, access_key: &str, public: bool) -> Result<()> {
        let t = self
            .public_timelines
            .iter_mut()
            .find(|t| t.access_key == access_key)
            .ok_or_else(|| Error::NotFound(format!("timeline '{}'", access_key)))?;
        t.is_public = public;
        tracing::info!(key = access_key, public, "timeline visibility changed");
        Ok(())
    }

    /// Resolve a shared timeline for a viewer.
    pub fn open_public_timeline(
        &self,
        access_key: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PublicTimelineView<'_>> {
        let settings = match self.public_timelines.iter().find(|t| t.access_key == access_key) {
            Some(s) => s,
            None => {
                tracing::warn!(key = access_key, "unknown timeline key");
                return Err(Error::NotFound(format!("timeline '{}'", access_key)));
            }
        };
        if settings.expires_at.map(|e| e < now).unwrap_or(false) {
            return Err(Error::AccessDenied("this timeline link has expired".into()));
        }
        if !settings.is_public {
            return Err(Error::AccessDenied("this timeline is not public".into()));
        }
        if settings.is_password_protected && settings.password.as_deref() != password {
            tracing::warn!(key = access_key, "timeline password rejected");
            return Err(Error::AccessDenied("incorrect password".into()));
        }

        let mut tasks: Vec<&Task> = self
            .tasks()
            .iter()
            .filter(|t| settings.visible_columns.contains(&t.status))
            .filter(|t| !settings.hidden_tasks.contains(&t.id))
            .collect();
        tasks.sort_by_key(|t| (t.deadline, t.id));
        Ok(PublicTimelineView { settings, tasks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn draft(password: Option<&str>) -> TimelineDraft {
        TimelineDraft {
            title: "Roadmap".into(),
            description: None,
            expires_at: None,
            allowed_filters: false,
            visible_columns: vec![Status::InProgress, Status::Done],
            hidden_tasks: Vec::new(),
            password: password.map(String::from),
            created_by: "u1".into(),
        }
    }

    #[test]
    fn test_quarter_summaries() {
        let mut db = Database::default();
        let dates = [
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 12, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 30, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
        ];
        for (i, d) in dates.iter().enumerate() {
            let mut t = TaskDraft::new(format!("t{i}"), *d);
            if i == 2 {
                t.project_status = ProjectStatus::Ongoing;
            }
            db.create_task(t, "u1", now()).unwrap();
        }
        let qs = quarter_summaries(db.tasks(), now());
        assert_eq!(qs.len(), 4);
        assert_eq!(qs[0].total_tasks, 1);
        assert_eq!(qs[0].overdue_tasks, 1);
        assert_eq!(qs[1].total_tasks, 2);
        assert_eq!(qs[1].near_deadline, 1);
        assert_eq!(qs[1].by_status[&ProjectStatus::Ongoing], 1);
        assert_eq!(qs[2].total_tasks, 0);
        assert_eq!(qs[3].total_tasks, 1);
        assert_eq!(current_quarter(now()), "Q2");
    }

    #[test]
    fn test_create_validates() {
        let mut db = Database::default();
        let mut no_title = draft(None);
        no_title.title = " ".into();
        assert!(matches!(db.create_public_timeline(no_title, now()), Err(Error::Validation(_))));

        let mut no_columns = draft(None);
        no_columns.visible_columns.clear();
        assert!(matches!(db.create_public_timeline(no_columns, now()), Err(Error::Validation(_))));

        let created = db.create_public_timeline(draft(Some("  ")), now()).unwrap();
        assert!(!created.is_password_protected);
        assert_eq!(created.access_key.len(), 8);
    }

    #[test]
    fn test_open_shows_visible_unhidden_tasks() {
        let mut db = Database::default();
        let a = db.create_task(TaskDraft::new("a", now() + Duration::days(2)), "u1", now()).unwrap();
        let b = db.create_task(TaskDraft::new("b", now() + Duration::days(1)), "u1", now()).unwrap();
        let c = db.create_task(TaskDraft::new("c", now()), "u1", now()).unwrap();
        db.move_task(a, Status::InProgress, None, "u1", now()).unwrap();
        db.move_task(b, Status::Done, None, "u1", now()).unwrap();
        db.move_task(c, Status::InProgress, None, "u1", now()).unwrap();

        let mut d = draft(None);
        d.hidden_tasks = vec![c];
        let key = db.create_public_timeline(d, now()).unwrap().access_key.clone();

        let view = db.open_public_timeline(&key, None, now()).unwrap();
        let ids: Vec<u64> = view.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_open_denies_access() {
        let mut db = Database::default();
        let key = db.create_public_timeline(draft(Some("s3cret")), now()).unwrap().access_key.clone();

        assert!(matches!(db.open_public_timeline("nope", None, now()), Err(Error::NotFound(_))));
        assert!(matches!(db.open_public_timeline(&key, None, now()), Err(Error::AccessDenied(_))));
        assert!(matches!(db.open_public_timeline(&key, Some("guess"), now()), Err(Error::AccessDenied(_))));
        assert!(db.open_public_timeline(&key, Some("s3cret"), now()).is_ok());

        db.set_timeline_public(&key, false).unwrap();
        assert!(matches!(db.open_public_timeline(&key, Some("s3cret"), now()), Err(Error::AccessDenied(_))));

        let mut expiring = draft(None);
        expiring.expires_at = Some(now() + Duration::days(1));
        let key = db.create_public_timeline(expiring, now()).unwrap().access_key.clone();
        assert!(db.open_public_timeline(&key, None, now()).is_ok());
        let later = now() + Duration::days(2);
        assert!(matches!(db.open_public_timeline(&key, None, later), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn test_search_needs_allowed_filters() {
        let mut db = Database::default();
        for title in ["Launch beta", "Beta feedback", "Pricing page"] {
            let id = db.create_task(TaskDraft::new(title, now() + Duration::days(5)), "u1", now()).unwrap();
            db.move_task(id, Status::InProgress, None, "u1", now()).unwrap();
        }
        let locked = db.create_public_timeline(draft(None), now()).unwrap().access_key.clone();
        let mut open = draft(None);
        open.allowed_filters = true;
        let filterable = db.create_public_timeline(open, now()).unwrap().access_key.clone();

        let view = db.open_public_timeline(&locked, None, now()).unwrap();
        assert_eq!(view.search("  ").unwrap().tasks.len(), 3);
        let view = db.open_public_timeline(&locked, None, now()).unwrap();
        assert!(matches!(view.search("beta"), Err(Error::AccessDenied(_))));

        let view = db.open_public_timeline(&filterable, None, now()).unwrap().search("BETA").unwrap();
        let titles: Vec<&str> = view.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.iter().all(|t| t.to_lowercase().contains("beta")));
    }
}
