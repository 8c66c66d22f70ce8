//! Team energy estimation.
//!
//! A snapshot is a pure function of the task list and `now`; nothing here is
//! persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fields::{EnergyLevel, Priority, Status};
use crate::task::Task;

/// Tunables for the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergySettings {
    /// In Progress count above which every extra task is a breach.
    pub wip_limit: usize,
    /// Whole days in one status after which a task counts as stuck.
    pub stuck_after_days: i64,
}

impl Default for EnergySettings {
    fn default() -> Self {
        EnergySettings {
            wip_limit: 5,
            stuck_after_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyFactors {
    /// Percentage (0-100) of tasks that are high priority or overdue.
    pub task_load: u32,
    pub wip_breaches: usize,
    pub stuck_tasks: usize,
    pub reopened_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamEnergySnapshot {
    pub level: EnergyLevel,
    pub factors: EnergyFactors,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Measure the raw factors for a set of tasks.
pub fn measure(tasks: &[Task], now: DateTime<Utc>, settings: &EnergySettings) -> EnergyFactors {
    let pressured = tasks
        .iter()
        .filter(|t| t.priority == Priority::High || t.is_overdue(now))
        .count();
    let task_load = (100.0 * pressured as f64 / tasks.len().max(1) as f64)
        .round()
        .clamp(0.0, 100.0) as u32;

    let in_progress = tasks.iter().filter(|t| t.status == Status::InProgress).count();
    let wip_breaches = in_progress.saturating_sub(settings.wip_limit);

    let stuck_tasks = tasks
        .iter()
        .filter(|t| t.status != Status::Done)
        .filter(|t| {
            t.stuck_since
                .map(|s| (now - s).num_days() > settings.stuck_after_days)
                .unwrap_or(false)
        })
        .count();

    let reopened_tasks = tasks.iter().filter(|t| t.reopen_count > 0).count();

    EnergyFactors {
        task_load,
        wip_breaches,
        stuck_tasks,
        reopened_tasks,
    }
}

/// Weighted composite of the factors, in [0, 100].
pub fn score(f: &EnergyFactors) -> f64 {
    let capped = |n: usize, per: f64| (n as f64 * per).min(100.0);
    let raw = 0.4 * f.task_load as f64
        + 0.25 * capped(f.wip_breaches, 10.0)
        + 0.25 * capped(f.stuck_tasks, 15.0)
        + 0.1 * capped(f.reopened_tasks, 20.0);
    raw.clamp(0.0, 100.0)
}

pub fn level_for(score: f64) -> EnergyLevel {
    if score < 30.0 {
        EnergyLevel::Low
    } else if score < 60.0 {
        EnergyLevel::Medium
    } else if score < 80.0 {
        EnergyLevel::High
    } else {
        EnergyLevel::Critical
    }
}

pub fn compute_team_energy(tasks: &[Task], now: DateTime<Utc>, settings: &EnergySettings) -> TeamEnergySnapshot {
    let factors = measure(tasks, now, settings);
    let score = score(&factors);
    let level = level_for(score);
    tracing::debug!(?level, score, "team energy computed");
    TeamEnergySnapshot {
        level,
        factors,
        score,
        timestamp: now,
    }
}

/// Recommendations for the factors that are out of range.
pub fn insights(f: &EnergyFactors) -> Vec<String> {
    let mut out = Vec::new();
    if f.task_load > 70 {
        out.push(format!(
            "High task load ({}%): consider redistributing high-priority work or moving deadlines",
            f.task_load
        ));
    }
    if f.wip_breaches > 3 {
        out.push(format!(
            "{} tasks over the WIP limit: finish in-flight work before starting new tasks",
            f.wip_breaches
        ));
    }
    if f.stuck_tasks > 2 {
        out.push(format!(
            "{} tasks stuck in one status: check them for blockers",
            f.stuck_tasks
        ));
    }
    if f.reopened_tasks > 3 {
        out.push(format!(
            "{} tasks reopened: clarify requirements before work starts",
            f.reopened_tasks
        ));
    }
    if out.is_empty() {
        out.push("Team workload looks healthy".into());
    }
    out
}
