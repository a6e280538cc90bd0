//! Runtime configuration for hosts embedding the check-in engine.
//!
//! # Responsibility
//! - Load database, logging and clock settings from the environment.
//!
//! # Invariants
//! - Every setting has a default except the optional log directory.
//! - Invalid values are rejected with the offending variable name.

use crate::clock::ClockPolicy;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "ROLLCALL_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "ROLLCALL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ROLLCALL_LOG_DIR";
pub const ENV_CLOCK: &str = "ROLLCALL_CLOCK";

const DEFAULT_DB_FILE_NAME: &str = "rollcall.sqlite3";

/// Configuration error naming the offending variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but empty or whitespace.
    Empty(&'static str),
    /// Variable holds an unsupported value.
    Invalid {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(variable) => write!(f, "{variable} is set but empty"),
            Self::Invalid {
                variable,
                value,
                expected,
            } => write!(f, "{variable}=`{value}` is invalid; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings for one engine host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollcallConfig {
    /// SQLite database file shared by all scanning stations.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging is off when `None`.
    pub log_dir: Option<PathBuf>,
    /// Timezone policy for the system clock.
    pub clock_policy: ClockPolicy,
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            clock_policy: ClockPolicy::default(),
        }
    }
}

impl RollcallConfig {
    /// Loads configuration from `.env` (when present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing `.env` is the normal production case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = non_empty(ENV_DB_PATH, lookup(ENV_DB_PATH))? {
            config.db_path = PathBuf::from(value);
        }

        if let Some(value) = non_empty(ENV_LOG_LEVEL, lookup(ENV_LOG_LEVEL))? {
            config.log_level = match value.to_ascii_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
                "warning" => "warn".to_string(),
                _ => {
                    return Err(ConfigError::Invalid {
                        variable: ENV_LOG_LEVEL,
                        value,
                        expected: "trace|debug|info|warn|error",
                    })
                }
            };
        }

        if let Some(value) = non_empty(ENV_LOG_DIR, lookup(ENV_LOG_DIR))? {
            let dir = PathBuf::from(&value);
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    variable: ENV_LOG_DIR,
                    value,
                    expected: "an absolute directory path",
                });
            }
            config.log_dir = Some(dir);
        }

        if let Some(value) = non_empty(ENV_CLOCK, lookup(ENV_CLOCK))? {
            config.clock_policy = ClockPolicy::parse(&value).ok_or(ConfigError::Invalid {
                variable: ENV_CLOCK,
                value,
                expected: "local|utc",
            })?;
        }

        Ok(config)
    }
}

fn non_empty(variable: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(variable)),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}
