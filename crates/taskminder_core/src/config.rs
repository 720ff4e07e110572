//! Runtime configuration.
//!
//! # Responsibility
//! - Parse the TOML configuration file shape.
//! - Apply `TASKMINDER_*` environment overrides on top of file values.
//!
//! # Invariants
//! - A loaded config has a parseable `daily_at` schedule.
//! - An empty `trigger_secret` is allowed to load but authorizes nothing.

use crate::logging::default_log_level;
use crate::reminder::schedule::{DailySchedule, ScheduleError};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "taskminder.sqlite3";
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DAILY_AT: &str = "06:00";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    InvalidSchedule(ScheduleError),
    InvalidEnv { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::InvalidSchedule(err) => write!(f, "invalid reminder.daily_at: {err}"),
            Self::InvalidEnv { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidSchedule(err) => Some(err),
            Self::InvalidEnv { .. } => None,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskminderConfig {
    pub database_path: PathBuf,
    pub reminder: ReminderConfig,
    pub logging: LoggingConfig,
}

impl Default for TaskminderConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            reminder: ReminderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Reminder dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReminderConfig {
    /// Shared secret every trigger must present.
    pub trigger_secret: String,
    pub recipient: String,
    pub sender: String,
    /// `0` disables the coordinator-side send timeout.
    pub send_timeout_secs: u64,
    /// `HH:MM`, UTC.
    pub daily_at: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            trigger_secret: String::new(),
            recipient: String::new(),
            sender: String::new(),
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
            daily_at: DEFAULT_DAILY_AT.to_string(),
        }
    }
}

impl ReminderConfig {
    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_secs > 0).then(|| Duration::from_secs(self.send_timeout_secs))
    }

    pub fn daily_schedule(&self) -> Result<DailySchedule, ConfigError> {
        self.daily_at
            .parse::<DailySchedule>()
            .map_err(ConfigError::InvalidSchedule)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl TaskminderConfig {
    /// Parses a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.reminder.daily_schedule()?;
        Ok(config)
    }

    /// Loads `path` when it exists, defaults otherwise, then applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("TASKMINDER_DATABASE_PATH") {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("TASKMINDER_TRIGGER_SECRET") {
            self.reminder.trigger_secret = value;
        }
        if let Some(value) = lookup("TASKMINDER_RECIPIENT") {
            self.reminder.recipient = value;
        }
        if let Some(value) = lookup("TASKMINDER_SENDER") {
            self.reminder.sender = value;
        }
        if let Some(value) = lookup("TASKMINDER_SEND_TIMEOUT_SECS") {
            self.reminder.send_timeout_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    key: "TASKMINDER_SEND_TIMEOUT_SECS",
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("TASKMINDER_DAILY_AT") {
            self.reminder.daily_at = value;
            self.reminder.daily_schedule()?;
        }
        if let Some(value) = lookup("TASKMINDER_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("TASKMINDER_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }
}
