//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem::table::{self, TableConfig, TableSpeed};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of tables to create on startup
    pub num_tables: usize,
    /// Settings every startup table is created with
    pub table_defaults: TableConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to something that doesn't parse
    pub fn from_env(num_tables_override: Option<usize>) -> Result<Self, ConfigError> {
        let speed = match std::env::var("TABLE_SPEED") {
            Ok(value) => value.parse::<TableSpeed>().map_err(|e| ConfigError::Invalid {
                var: "TABLE_SPEED".to_string(),
                reason: e.to_string(),
            })?,
            Err(_) => TableSpeed::Normal,
        };

        let turn_timeout_secs = match std::env::var("TABLE_TURN_TIMEOUT_SECS") {
            Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                var: "TABLE_TURN_TIMEOUT_SECS".to_string(),
                reason: format!("{value:?} is not a number of seconds"),
            })?),
            Err(_) => None,
        };

        let table_defaults = TableConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", 9),
            small_blind: parse_env_or("TABLE_SMALL_BLIND", 10),
            big_blind: parse_env_or("TABLE_BIG_BLIND", 20),
            initial_chips: parse_env_or("TABLE_INITIAL_CHIPS", 1000),
            speed,
            turn_timeout_secs,
            ..TableConfig::default()
        };

        let num_tables = num_tables_override.unwrap_or_else(|| parse_env_or("MAX_TABLES", 1));

        Ok(ServerConfig {
            num_tables,
            table_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_TABLES".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        self.table_defaults.validate()?;

        Ok(())
    }

    /// Configuration for the `index`th startup table, counting from zero
    pub fn table_config(&self, index: usize) -> TableConfig {
        TableConfig {
            name: format!("Table {}", index + 1),
            ..self.table_defaults.clone()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid table defaults: {0}")]
    Table(#[from] table::ConfigError),
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
