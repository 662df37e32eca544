//! Race configuration with validated defaults.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    FINISH_LINE, ROSTER_SIZE, ROUND_CAPACITY, ROUND_DELAY_MS, ROUND_DISTANCES, TICK_PERIOD_MS,
    catalog_capacity,
};

/// Timing and shape of a race. Missing JSON fields fall back to the
/// catalog constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    #[serde(default = "RaceConfig::default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default = "RaceConfig::default_round_delay_ms")]
    pub round_delay_ms: u64,
    #[serde(default = "RaceConfig::default_round_distances")]
    pub round_distances: Vec<u32>,
    #[serde(default = "RaceConfig::default_round_capacity")]
    pub round_capacity: usize,
    #[serde(default = "RaceConfig::default_roster_size")]
    pub roster_size: usize,
    #[serde(default = "RaceConfig::default_finish_line")]
    pub finish_line: f64,
}

impl RaceConfig {
    const fn default_tick_period_ms() -> u64 {
        TICK_PERIOD_MS
    }

    const fn default_round_delay_ms() -> u64 {
        ROUND_DELAY_MS
    }

    fn default_round_distances() -> Vec<u32> {
        ROUND_DISTANCES.to_vec()
    }

    const fn default_round_capacity() -> usize {
        ROUND_CAPACITY
    }

    const fn default_roster_size() -> usize {
        ROSTER_SIZE
    }

    const fn default_finish_line() -> f64 {
        FINISH_LINE
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    #[must_use]
    pub const fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `RaceConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), RaceConfigError> {
        if self.tick_period_ms == 0 {
            return Err(RaceConfigError::ZeroTickPeriod);
        }
        if self.round_distances.is_empty() {
            return Err(RaceConfigError::NoRounds);
        }
        if let Some(round) = self.round_distances.iter().position(|&d| d == 0) {
            return Err(RaceConfigError::ZeroDistance { round });
        }
        if self.round_capacity == 0 {
            return Err(RaceConfigError::ZeroCapacity);
        }
        self.validate_roster_size()?;
        if (self.finish_line - FINISH_LINE).abs() > f64::EPSILON {
            return Err(RaceConfigError::FinishLine {
                value: self.finish_line,
            });
        }
        Ok(())
    }

    fn validate_roster_size(&self) -> Result<(), RaceConfigError> {
        let max = catalog_capacity();
        if !(1..=max).contains(&self.roster_size) {
            return Err(RaceConfigError::RosterSize {
                value: self.roster_size,
                max,
            });
        }
        Ok(())
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: Self::default_tick_period_ms(),
            round_delay_ms: Self::default_round_delay_ms(),
            round_distances: Self::default_round_distances(),
            round_capacity: Self::default_round_capacity(),
            roster_size: Self::default_roster_size(),
            finish_line: Self::default_finish_line(),
        }
    }
}

/// Errors raised when race configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum RaceConfigError {
    #[error("tick period must be at least 1ms")]
    ZeroTickPeriod,
    #[error("at least one round distance is required")]
    NoRounds,
    #[error("round {round} has a zero distance")]
    ZeroDistance { round: usize },
    #[error("round capacity must be at least 1")]
    ZeroCapacity,
    #[error("roster size must be between 1 and {max} (got {value})")]
    RosterSize { value: usize, max: usize },
    #[error("finish line is fixed at 100 (got {value:.2})")]
    FinishLine { value: f64 },
}
