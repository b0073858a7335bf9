//! Logging configuration
//!
//! Built once at startup, from TOML or from the process environment, and
//! handed to [`Logger::from_config`](crate::logger::Logger::from_config).
//! Nothing else in the crate reads the environment.

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

use serde::Deserialize;

use crate::{rotator::RotationPolicy, Error, Result};

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    /// Default
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// level = "info"
/// file_path = "/var/log/app/app.log"
/// enable_dual_sink = true
/// rotation_interval = "24h"
/// max_backups = 7
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Default: debug
    pub level: LogLevel,

    /// Log file. Without one, records only go to stderr.
    pub file_path: Option<PathBuf>,

    /// Also write to stderr when logging to a file.
    /// Default: true
    pub enable_dual_sink: bool,

    /// Rotate the log file every `rotation_interval`. When off, the file is
    /// appended to forever.
    /// Default: true
    pub rotate: bool,

    /// Default: 24h
    #[serde(with = "humantime_serde")]
    pub rotation_interval: Duration,

    /// Size cap of the active file in bytes.
    pub max_bytes: Option<u64>,

    /// Rotated files to keep. Default: all of them
    pub max_backups: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            file_path: None,
            enable_dual_sink: true,
            rotate: true,
            rotation_interval: Duration::from_secs(24 * 60 * 60),
            max_bytes: None,
            max_backups: None,
        }
    }
}

impl LogConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the `LOG_*` variables of the current process.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] but with a custom variable lookup.
    ///
    /// Unparseable values are ignored and leave the default in place.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).and_then(|v| parse_bool(&v)).unwrap_or(false);
        let mut config = Self::default();
        if flag("LOG_LEVEL_INFO") {
            config.level = LogLevel::Info;
        }
        config.file_path = lookup("LOG_FILE_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        config.enable_dual_sink = !flag("LOG_NOT_STDERR");
        config.rotate = !flag("LOG_NOT_ROTATE");
        if let Some(interval) = lookup("LOG_ROTATION_INTERVAL")
            .and_then(|v| humantime::parse_duration(v.trim()).ok())
        {
            config.rotation_interval = interval;
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.rotation_interval.is_zero() {
            return Err(Error::invalid_config(
                "rotation_interval",
                "must be greater than zero",
            ));
        }
        if self.max_bytes == Some(0) {
            return Err(Error::invalid_config(
                "max_bytes",
                "must be greater than zero",
            ));
        }
        if self.max_backups == Some(0) {
            return Err(Error::invalid_config(
                "max_backups",
                "must be greater than zero",
            ));
        }
        if let Some(path) = &self.file_path {
            if path.as_os_str().is_empty() {
                return Err(Error::invalid_config("file_path", "must not be empty"));
            }
            if path.file_name().is_none() {
                return Err(Error::invalid_config(
                    "file_path",
                    format!("`{}` does not name a file", path.display()),
                ));
            }
        }
        Ok(())
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_bytes: self.max_bytes.and_then(NonZeroU64::new),
            max_backups: self.max_backups.and_then(NonZeroUsize::new),
        }
    }
}

/// Accepts the spellings `1 t T TRUE true True` and their false counterparts.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
