//! Time intelligence alerts.
//!
//! Alerts are derived from task state (time in the current status, distance to
//! the deadline, reopen count) and persisted so they can be acknowledged.
//! `refresh_alerts` reconciles the stored records with the current conditions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{next_id, Database};
use crate::error::{Error, Result};
use crate::fields::{AlertKind, AlertSeverity, Status};
use crate::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeIntelligenceAlert {
    pub id: u64,
    pub task_id: u64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Set on an acknowledged alert once its episode is over. A resolved alert
    /// is history and no longer stands in for the condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Thresholds, in whole days or reopen counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSettings {
    pub stuck_after_days: i64,
    pub stuck_critical_days: i64,
    pub deadline_window_days: i64,
    pub deadline_critical_days: i64,
    pub reopen_threshold: u32,
    pub reopen_critical: u32,
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            stuck_after_days: 7,
            stuck_critical_days: 30,
            deadline_window_days: 7,
            deadline_critical_days: 2,
            reopen_threshold: 3,
            reopen_critical: 5,
        }
    }
}

/// What a refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub raised: Vec<u64>,
    pub cleared: usize,
}

struct Condition {
    kind: AlertKind,
    severity: AlertSeverity,
    message: String,
    /// When the current episode began, for conditions that can recur.
    since: Option<DateTime<Utc>>,
}

impl Condition {
    /// Whether `alert` was raised for this episode of the condition.
    fn covers(&self, alert: &TimeIntelligenceAlert) -> bool {
        alert.kind == self.kind && self.since.map_or(true, |s| alert.created_at > s)
    }
}

/// Conditions currently holding for one task.
fn evaluate(task: &Task, now: DateTime<Utc>, s: &AlertSettings) -> Vec<Condition> {
    let mut out = Vec::new();
    if task.status == Status::Done {
        return out;
    }

    let since = task.stuck_since.unwrap_or(task.updated_at);
    let idle = (now - since).num_days();
    if idle > s.stuck_after_days {
        out.push(Condition {
            kind: AlertKind::Stuck,
            severity: if idle > s.stuck_critical_days {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            },
            message: format!("'{}' has not changed status in {} days", task.title, idle),
            since: Some(since),
        });
    }

    if task.deadline >= now {
        let left = (task.deadline - now).num_days();
        if left <= s.deadline_window_days {
            out.push(Condition {
                kind: AlertKind::DeadlineApproaching,
                severity: if left <= s.deadline_critical_days {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                },
                message: match left {
                    0 => format!("'{}' is due within a day", task.title),
                    n => format!("'{}' is due in {} days", task.title, n),
                },
                since: Some(task.deadline - Duration::days(s.deadline_window_days + 1)),
            });
        }
    }

    if task.reopen_count >= s.reopen_threshold {
        out.push(Condition {
            kind: AlertKind::FrequentReopens,
            severity: if task.reopen_count >= s.reopen_critical {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            },
            message: format!("'{}' has been reopened {} times", task.title, task.reopen_count),
            since: None,
        });
    }
    out
}

impl Database {
    /// Reconcile stored alerts with the board at `now`.
    ///
    /// New conditions raise a record; unacknowledged records whose condition has
    /// cleared are dropped. Acknowledged records are kept as history: once the
    /// episode they were raised for is over they are marked resolved, and a later
    /// episode of the same condition raises a fresh alert.
    pub fn refresh_alerts(&mut self, now: DateTime<Utc>, settings: &AlertSettings) -> RefreshSummary {
        let mut live: Vec<(u64, Condition)> = Vec::new();
        for task in self.tasks() {
            for cond in evaluate(task, now, settings) {
                live.push((task.id, cond));
            }
        }

        let before = self.alerts.len();
        self.alerts.retain(|a| {
            a.acknowledged || live.iter().any(|(id, c)| *id == a.task_id && c.kind == a.kind)
        });
        let cleared = before - self.alerts.len();

        for a in self.alerts.iter_mut().filter(|a| a.acknowledged && a.resolved_at.is_none()) {
            if !live.iter().any(|(id, c)| *id == a.task_id && c.covers(a)) {
                a.resolved_at = Some(now);
                tracing::debug!(alert = a.id, "acknowledged alert resolved");
            }
        }

        let mut raised = Vec::new();
        for (task_id, cond) in live {
            match self
                .alerts
                .iter_mut()
                .find(|a| a.task_id == task_id && a.kind == cond.kind && a.resolved_at.is_none())
            {
                Some(existing) => {
                    if !existing.acknowledged {
                        existing.severity = cond.severity;
                        existing.message = cond.message;
                    }
                }
                None => {
                    let id = self.next_alert_id.max(next_id(self.alerts.iter().map(|a| a.id)));
                    self.next_alert_id = id + 1;
                    self.alerts.push(TimeIntelligenceAlert {
                        id,
                        task_id,
                        kind: cond.kind,
                        severity: cond.severity,
                        message: cond.message,
                        created_at: now,
                        acknowledged: false,
                        acknowledged_by: None,
                        acknowledged_at: None,
                        resolved_at: None,
                    });
                    raised.push(id);
                }
            }
        }

        tracing::info!(raised = raised.len(), cleared, "alerts refreshed");
        RefreshSummary { raised, cleared }
    }

    /// Mark an alert as seen. Acknowledging twice keeps the first acknowledger.
    pub fn acknowledge_alert(&mut self, id: u64, user: &str, now: DateTime<Utc>) -> Result<&TimeIntelligenceAlert> {
        let alert = match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(a) => a,
            None => {
                tracing::warn!(alert = id, "alert not found");
                return Err(Error::NotFound(format!("alert {}", id)));
            }
        };
        if !alert.acknowledged {
            alert.acknowledged = true;
            alert.acknowledged_by = Some(user.to_string());
            alert.acknowledged_at = Some(now);
            tracing::info!(alert = id, user, "alert acknowledged");
        }
        Ok(alert)
    }

    /// Unacknowledged alerts, most severe first.
    pub fn active_alerts(&self) -> Vec<&TimeIntelligenceAlert> {
        let mut out: Vec<&TimeIntelligenceAlert> = self.alerts.iter().filter(|a| !a.acknowledged).collect();
        out.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 15, 10, 0, 0).unwrap()
    }

    fn kinds(db: &Database) -> Vec<(u64, AlertKind, AlertSeverity)> {
        db.active_alerts().iter().map(|a| (a.task_id, a.kind, a.severity)).collect()
    }

    #[test]
    fn test_conditions_raise_alerts() {
        let mut db = Database::default();
        let far = now() + Duration::days(60);
        let stuck = db.create_task(TaskDraft::new("stale", far), "u1", now() - Duration::days(8)).unwrap();
        let ancient = db.create_task(TaskDraft::new("ancient", far), "u1", now() - Duration::days(31)).unwrap();
        let due = db.create_task(TaskDraft::new("due soon", now() + Duration::hours(30)), "u1", now()).unwrap();
        let churn = db.create_task(TaskDraft::new("churn", far), "u1", now()).unwrap();
        for _ in 0..3 {
            db.reopen_task(churn, None, "u1", now()).unwrap();
        }
        db.create_task(TaskDraft::new("calm", far), "u1", now()).unwrap();

        let summary = db.refresh_alerts(now(), &AlertSettings::default());
        assert_eq!(summary.raised.len(), 4);
        assert_eq!(summary.cleared, 0);

        let active = kinds(&db);
        assert!(active.contains(&(stuck, AlertKind::Stuck, AlertSeverity::Warning)));
        assert!(active.contains(&(ancient, AlertKind::Stuck, AlertSeverity::Critical)));
        assert!(active.contains(&(due, AlertKind::DeadlineApproaching, AlertSeverity::Critical)));
        assert!(active.contains(&(churn, AlertKind::FrequentReopens, AlertSeverity::Warning)));
        assert_eq!(active[0].2, AlertSeverity::Critical);

        // A second refresh raises nothing new.
        assert!(db.refresh_alerts(now(), &AlertSettings::default()).raised.is_empty());
        assert_eq!(db.alerts.len(), 4);
    }

    #[test]
    fn test_done_and_overdue_tasks_do_not_alert_on_deadline() {
        let mut db = Database::default();
        let done = db.create_task(TaskDraft::new("shipped", now() + Duration::days(1)), "u1", now()).unwrap();
        db.move_task(done, Status::Done, None, "u1", now()).unwrap();
        db.create_task(TaskDraft::new("late", now() - Duration::hours(2)), "u1", now()).unwrap();
        let summary = db.refresh_alerts(now(), &AlertSettings::default());
        assert!(summary.raised.is_empty());
    }

    #[test]
    fn test_cleared_conditions_drop_unacknowledged_alerts() {
        let mut db = Database::default();
        let far = now() + Duration::days(60);
        let a = db.create_task(TaskDraft::new("a", far), "u1", now() - Duration::days(10)).unwrap();
        let b = db.create_task(TaskDraft::new("b", far), "u1", now() - Duration::days(10)).unwrap();
        db.refresh_alerts(now(), &AlertSettings::default());
        let b_alert = db.alerts.iter().find(|x| x.task_id == b).map(|x| x.id).unwrap();
        db.acknowledge_alert(b_alert, "u2", now()).unwrap();

        db.move_task(a, Status::InProgress, None, "u1", now()).unwrap();
        db.move_task(b, Status::InProgress, None, "u1", now()).unwrap();
        let summary = db.refresh_alerts(now(), &AlertSettings::default());
        assert_eq!(summary.cleared, 1);
        assert!(db.active_alerts().is_empty());
        assert_eq!(db.alerts.len(), 1);
        assert_eq!(db.alerts[0].task_id, b);
    }

    #[test]
    fn test_acknowledge_is_one_way() {
        let mut db = Database::default();
        db.create_task(TaskDraft::new("x", now() + Duration::days(3)), "u1", now()).unwrap();
        db.refresh_alerts(now(), &AlertSettings::default());
        let id = db.alerts[0].id;

        let first = db.acknowledge_alert(id, "u1", now()).unwrap().clone();
        let again = db.acknowledge_alert(id, "u2", now() + Duration::hours(1)).unwrap();
        assert!(again.acknowledged);
        assert_eq!(again.acknowledged_by.as_deref(), Some("u1"));
        assert_eq!(again.acknowledged_at, first.acknowledged_at);
        assert!(db.active_alerts().is_empty());

        assert!(matches!(db.acknowledge_alert(99, "u1", now()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_alert_ids_are_not_reused() {
        let mut db = Database::default();
        let far = now() + Duration::days(60);
        let a = db.create_task(TaskDraft::new("a", far), "u1", now() - Duration::days(10)).unwrap();
        let b = db.create_task(TaskDraft::new("b", far), "u1", now() - Duration::days(10)).unwrap();
        assert_eq!(db.refresh_alerts(now(), &AlertSettings::default()).raised, vec![1, 2]);

        db.move_task(b, Status::InProgress, None, "u1", now()).unwrap();
        assert_eq!(db.refresh_alerts(now(), &AlertSettings::default()).cleared, 1);

        let c = db.create_task(TaskDraft::new("c", now() + Duration::days(3)), "u1", now()).unwrap();
        let summary = db.refresh_alerts(now(), &AlertSettings::default());
        assert_eq!(summary.raised, vec![3]);
        let ids: Vec<(u64, u64)> = db.alerts.iter().map(|x| (x.id, x.task_id)).collect();
        assert_eq!(ids, vec![(1, a), (3, c)]);

        // The counter survives a save and load.
        let json = serde_json::to_string(&db).unwrap();
        let mut reloaded = Database::from_json(&json).unwrap();
        reloaded.move_task(c, Status::Done, None, "u1", now()).unwrap();
        reloaded.refresh_alerts(now(), &AlertSettings::default());
        let d = reloaded.create_task(TaskDraft::new("d", now() + Duration::days(2)), "u1", now()).unwrap();
        let raised = reloaded.refresh_alerts(now(), &AlertSettings::default()).raised;
        assert_eq!(raised, vec![4]);
        assert_eq!(reloaded.alerts.iter().find(|x| x.id == 4).map(|x| x.task_id), Some(d));
    }

    #[test]
    fn test_new_episode_after_acknowledgement_raises_again() {
        let mut db = Database::default();
        let far = now() + Duration::days(90);
        let x = db.create_task(TaskDraft::new("x", far), "u1", now() - Duration::days(10)).unwrap();
        let first = db.refresh_alerts(now(), &AlertSettings::default()).raised[0];
        db.acknowledge_alert(first, "u2", now()).unwrap();

        // Still the same episode: nothing new.
        assert!(db.refresh_alerts(now() + Duration::days(1), &AlertSettings::default()).raised.is_empty());

        let moved = now() + Duration::hours(30);
        db.move_task(x, Status::InProgress, None, "u1", moved).unwrap();
        let later = moved + Duration::days(40);
        let summary = db.refresh_alerts(later, &AlertSettings::default());
        assert_eq!(summary.raised.len(), 1);
        assert_ne!(summary.raised[0], first);
        assert_eq!(kinds(&db), vec![(x, AlertKind::Stuck, AlertSeverity::Critical)]);

        let old = db.alerts.iter().find(|a| a.id == first).unwrap();
        assert!(old.acknowledged);
        assert_eq!(old.resolved_at, Some(later));
        assert!(db.refresh_alerts(later, &AlertSettings::default()).raised.is_empty());
    }
}
