//! Diagnostics setup
//!
//! Library code emits `tracing` events; the binary calls [`init`] once. When
//! `TIGER_DEBUG` is set, output goes to a file in the temp dir so it can be
//! inspected when stderr is not visible.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const ENV_DEBUG: &str = "TIGER_DEBUG";
pub const ENV_LOG_LEVEL: &str = "TIGER_LOG_LEVEL";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_FILE_NAME: &str = "tiger-debug.log";

/// Where the debug log is written when file logging is on
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE_NAME)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {message}")]
    Filter { directive: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How diagnostics should be emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `debug` or `tiger_core=trace`
    pub level: String,
    /// Write to this file instead of stderr
    pub debug_file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            debug_file: None,
        }
    }
}

impl LogSettings {
    /// Settings from `TIGER_LOG_LEVEL` and `TIGER_DEBUG`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup(ENV_LOG_LEVEL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let debug_file = lookup(ENV_DEBUG)
            .filter(|v| is_truthy(v))
            .map(|_| log_file_path());
        Self { level, debug_file }
    }

    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::Filter {
            directive: self.level.clone(),
            message: e.to_string(),
        })
    }
}

/// Install the global subscriber
///
/// A subscriber that is already installed (e.g. by a test harness) is left
/// in place.
pub fn init(settings: &LogSettings) -> Result<(), LoggingError> {
    let filter = settings.filter()?;

    let installed = match &settings.debug_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| OsStr::new(LOG_FILE_NAME));
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            tracing::subscriber::set_global_default(
                FmtSubscriber::builder()
                    .with_env_filter(filter)
                    .with_writer(appender)
                    .with_ansi(false)
                    .finish(),
            )
        }
        None => tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };

    if installed.is_err() {
        tracing::debug!("global subscriber already set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> LogSettings {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s, LogSettings::default());
        assert_eq!(s.level, "info");
        assert!(s.debug_file.is_none());
    }

    #[test]
    fn test_debug_flag() {
        assert_eq!(settings(&[(ENV_DEBUG, "1")]).debug_file, Some(log_file_path()));
        assert_eq!(settings(&[(ENV_DEBUG, "TRUE")]).debug_file, Some(log_file_path()));
        assert!(settings(&[(ENV_DEBUG, "0")]).debug_file.is_none());
        assert!(settings(&[(ENV_DEBUG, "")]).debug_file.is_none());
    }

    #[test]
    fn test_level() {
        assert_eq!(settings(&[(ENV_LOG_LEVEL, " debug ")]).level, "debug");
        assert_eq!(settings(&[(ENV_LOG_LEVEL, "")]).level, "info");
        assert!(settings(&[(ENV_LOG_LEVEL, "tiger_core=trace")]).filter().is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let s = LogSettings {
            level: "tiger_core=notalevel".to_string(),
            debug_file: None,
        };
        let err = s.filter().unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
    }

    #[test]
    fn test_log_file_name() {
        assert!(log_file_path().ends_with("tiger-debug.log"));
    }
}
