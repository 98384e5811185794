use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

const INTERVAL_HOURS: RangeInclusive<u64> = 1..=24;
const START_DELAY_MINUTES: RangeInclusive<u64> = 0..=60;

/// Settings for the background retention sweep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub start_delay_minutes: u64,
    /// Log per-category counts before purging.
    pub log_detailed: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
            start_delay_minutes: 5,
            log_detailed: true,
        }
    }
}

impl SweeperConfig {
    pub fn validate(&self) -> Result<()> {
        if !INTERVAL_HOURS.contains(&self.interval_hours) {
            return Err(Error::Config(format!(
                "sweeper.interval_hours must be between {} and {}",
                INTERVAL_HOURS.start(),
                INTERVAL_HOURS.end()
            )));
        }
        if !START_DELAY_MINUTES.contains(&self.start_delay_minutes) {
            return Err(Error::Config(format!(
                "sweeper.start_delay_minutes must be between {} and {}",
                START_DELAY_MINUTES.start(),
                START_DELAY_MINUTES.end()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }

    #[must_use]
    pub fn start_delay(&self) -> Duration {
        Duration::from_secs(self.start_delay_minutes * 60)
    }
}
