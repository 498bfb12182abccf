//! Process-wide core configuration.
//!
//! # Responsibility
//! - Resolve store location, storage timeouts and allocation policy once at
//!   startup.
//! - Validate values before any component is constructed from them.
//!
//! # Invariants
//! - A `CoreConfig` is immutable after construction and is passed explicitly;
//!   no component reads the environment on its own.
//! - `max_alloc_attempts` is always at least 1.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Environment key for the SQLite database path.
pub const ENV_DB_PATH: &str = "SHORTNOTE_DB_PATH";
/// Environment key for the SQLite busy timeout in milliseconds.
pub const ENV_BUSY_TIMEOUT_MS: &str = "SHORTNOTE_BUSY_TIMEOUT_MS";
/// Environment key for the identifier allocation attempt cap.
pub const ENV_MAX_ALLOC_ATTEMPTS: &str = "SHORTNOTE_MAX_ALLOC_ATTEMPTS";
/// Environment key for the log level.
pub const ENV_LOG_LEVEL: &str = "SHORTNOTE_LOG_LEVEL";
/// Environment key for the rolling log directory.
pub const ENV_LOG_DIR: &str = "SHORTNOTE_LOG_DIR";

/// Default number of candidate identifiers tried before giving up.
pub const DEFAULT_MAX_ALLOC_ATTEMPTS: u32 = 10;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DB_FILE_NAME: &str = "shortnote.sqlite3";

/// Configuration rejected during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Core settings shared by the store gateway and allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
    /// Upper bound on candidate identifiers per allocation.
    pub max_alloc_attempts: u32,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            max_alloc_attempts: DEFAULT_MAX_ALLOC_ATTEMPTS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
                reason: "expected a non-negative integer",
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = read(ENV_MAX_ALLOC_ATTEMPTS) {
            config.max_alloc_attempts = parse_attempts(&raw)?;
        }

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        if let Some(dir) = read(ENV_LOG_DIR) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    value: dir.display().to_string(),
                    reason: "expected an absolute path",
                });
            }
            config.log_dir = Some(dir);
        }

        Ok(config)
    }

    /// Returns a copy pointing at another database file.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Returns a copy with a different allocation attempt cap.
    pub fn with_max_alloc_attempts(mut self, attempts: u32) -> Self {
        self.max_alloc_attempts = attempts.max(1);
        self
    }
}

fn parse_attempts(raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key: ENV_MAX_ALLOC_ATTEMPTS,
            value: raw.to_string(),
            reason: "expected an integer >= 1",
        }),
        Ok(value) => Ok(value),
    }
}
