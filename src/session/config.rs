//! Session Configuration
//!
//! All gameplay tunables. Loadable from JSON; missing fields keep their
//! defaults.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::game::state::DEFAULT_MAX_LIVES;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON could not be parsed.
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lives at session start.
    pub max_lives: u32,
    /// Correct tap awards `points_per_level * level`.
    pub points_per_level: u32,
    /// Minimum interval between accepted taps (ms).
    pub debounce_ms: u64,
    /// Countdown after extra time is granted (seconds).
    pub extra_time_seconds: u32,
    /// Length of one countdown step (ms).
    pub tick_period_ms: u64,
    /// Grid-hide delay between a correct tap and the next round (ms).
    pub round_advance_delay_ms: u64,
    /// Delay between a wrong tap and the life loss (ms).
    pub incorrect_delay_ms: u64,
    /// First part of the wait between `RevealAnswer` and `GameOver` (ms).
    pub reveal_pause_ms: u64,
    /// Rest of the wait between `RevealAnswer` and `GameOver` (ms).
    pub reveal_hold_ms: u64,
    /// Delay before game over when there is nothing to reveal (ms).
    pub no_reveal_delay_ms: u64,
    /// UI event buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_lives: DEFAULT_MAX_LIVES,
            points_per_level: 10,
            debounce_ms: 200,
            extra_time_seconds: 5,
            tick_period_ms: 1000,
            round_advance_delay_ms: 400,
            incorrect_delay_ms: 600,
            reveal_pause_ms: 500,
            reveal_hold_ms: 1500,
            no_reveal_delay_ms: 300,
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lives == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_lives",
                reason: "must be at least 1",
            });
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_period_ms",
                reason: "must be at least 1",
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// One countdown step.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Grid-hide delay after a correct tap.
    pub fn round_advance_delay(&self) -> Duration {
        Duration::from_millis(self.round_advance_delay_ms)
    }

    /// Delay before a wrong tap costs a life.
    pub fn incorrect_delay(&self) -> Duration {
        Duration::from_millis(self.incorrect_delay_ms)
    }

    /// Settle time after the reveal, before the hold.
    pub fn reveal_pause(&self) -> Duration {
        Duration::from_millis(self.reveal_pause_ms)
    }

    /// Hold after the reveal.
    pub fn reveal_hold(&self) -> Duration {
        Duration::from_millis(self.reveal_hold_ms)
    }

    /// Game-over delay without a reveal.
    pub fn no_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.no_reveal_delay_ms)
    }
}
