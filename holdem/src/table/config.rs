//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::game::{
    GameSettings,
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    entities::{Blinds, Chips},
    state_machine::{DEFAULT_BIG_BLIND, DEFAULT_INITIAL_CHIPS, DEFAULT_SMALL_BLIND},
};

/// Table speed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSpeed {
    Normal,
    Turbo,
    Hyper,
}

impl std::fmt::Display for TableSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSpeed::Normal => write!(f, "normal"),
            TableSpeed::Turbo => write!(f, "turbo"),
            TableSpeed::Hyper => write!(f, "hyper"),
        }
    }
}

impl std::str::FromStr for TableSpeed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(TableSpeed::Normal),
            "turbo" => Ok(TableSpeed::Turbo),
            "hyper" => Ok(TableSpeed::Hyper),
            _ => Err(ConfigError::Invalid {
                field: "speed",
                reason: format!("unknown speed {s:?}"),
            }),
        }
    }
}

/// Rejected table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Maximum number of seats (2-9)
    pub max_players: usize,

    /// Small blind amount
    pub small_blind: Chips,

    /// Big blind amount
    pub big_blind: Chips,

    /// Stack every player sits down with
    pub initial_chips: Chips,

    /// Table speed
    pub speed: TableSpeed,

    /// Per-turn time limit override in seconds; 0 turns the clock off
    pub turn_timeout_secs: Option<u64>,

    /// Deal the next hand automatically after settlement
    pub auto_start_next_round: bool,

    /// Shuffle seed for reproducible tables
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: MAX_PLAYERS,
            small_blind: DEFAULT_SMALL_BLIND,
            big_blind: DEFAULT_BIG_BLIND,
            initial_chips: DEFAULT_INITIAL_CHIPS,
            speed: TableSpeed::Normal,
            turn_timeout_secs: None,
            auto_start_next_round: true,
            seed: None,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind == 0 {
            return Err(ConfigError::Invalid {
                field: "small_blind",
                reason: "must be positive".to_string(),
            });
        }

        if self.big_blind <= self.small_blind {
            return Err(ConfigError::Invalid {
                field: "big_blind",
                reason: "must be greater than the small blind".to_string(),
            });
        }

        if self.initial_chips < self.big_blind {
            return Err(ConfigError::Invalid {
                field: "initial_chips",
                reason: format!("must cover the big blind of {}", self.big_blind),
            });
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(ConfigError::Invalid {
                field: "max_players",
                reason: format!("must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            });
        }

        Ok(())
    }

    /// Get action timeout based on table speed
    pub fn action_timeout_secs(&self) -> u64 {
        match self.speed {
            TableSpeed::Normal => 30,
            TableSpeed::Turbo => 15,
            TableSpeed::Hyper => 5,
        }
    }

    /// Per-turn time limit, if the clock is on.
    pub fn turn_timeout(&self) -> Option<Duration> {
        match self.turn_timeout_secs.unwrap_or_else(|| self.action_timeout_secs()) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    /// Engine settings for a table built from this config.
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            blinds: self.blinds(),
            initial_chips: self.initial_chips,
            max_players: self.max_players,
            auto_start: self.auto_start_next_round,
            seed: self.seed,
        }
    }
}
