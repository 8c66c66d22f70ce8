//! Optional user configuration read from `~/.chronos/config.toml`.
//!
//! ```toml
//! user = "alex-johnson"
//!
//! [energy]
//! wip_limit = 5
//! stuck_after_days = 7
//!
//! [alerts]
//! deadline_window_days = 7
//! reopen_threshold = 3
//!
//! [wip]
//! in-progress = 4
//! review = 2
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alerts::AlertSettings;
use crate::db::Database;
use crate::energy::EnergySettings;
use crate::error::Result;
use crate::fields::Status;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Acting user id when `--as` is not given.
    pub user: Option<String>,
    pub energy: EnergyConfig,
    pub alerts: AlertConfig,
    /// Per-column WIP limits. Zero clears the limit.
    pub wip: BTreeMap<Status, usize>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnergyConfig {
    pub wip_limit: usize,
    pub stuck_after_days: i64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        let d = EnergySettings::default();
        EnergyConfig {
            wip_limit: d.wip_limit,
            stuck_after_days: d.stuck_after_days,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertConfig {
    pub stuck_after_days: i64,
    pub deadline_window_days: i64,
    pub reopen_threshold: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let d = AlertSettings::default();
        AlertConfig {
            stuck_after_days: d.stuck_after_days,
            deadline_window_days: d.deadline_window_days,
            reopen_threshold: d.reopen_threshold,
        }
    }
}

/// Directory holding the board and config: `$HOME/.chronos`.
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".chronos")
}

pub fn default_path() -> PathBuf {
    data_dir().join("config.toml")
}

impl Config {
    /// Read the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)?;
        let cfg = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn energy_settings(&self) -> EnergySettings {
        EnergySettings {
            wip_limit: self.energy.wip_limit,
            stuck_after_days: self.energy.stuck_after_days,
        }
    }

    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            stuck_after_days: self.alerts.stuck_after_days,
            deadline_window_days: self.alerts.deadline_window_days,
            reopen_threshold: self.alerts.reopen_threshold,
            ..AlertSettings::default()
        }
    }

    /// Apply column WIP overrides to the store.
    pub fn apply(&self, db: &mut Database) -> Result<()> {
        for (status, limit) in &self.wip {
            let limit = Some(*limit).filter(|l| *l > 0);
            db.set_wip_limit(*status, limit)?;
        }
        Ok(())
    }
}
