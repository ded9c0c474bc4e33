use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{DEFAULT_TIMEOUT, TIMEOUT_ENV, WORK_DIR_ENV};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    EmptyWorkDir { var: &'static str },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Wall-clock budget shared by the compile and run steps of one execution.
    pub timeout: Duration,
    /// Directory under which every workspace is staged.
    pub work_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            work_dir: std::env::temp_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(TIMEOUT_ENV) {
            config.timeout = parse_timeout(&value).ok_or(ConfigError::InvalidTimeout {
                var: TIMEOUT_ENV,
                value,
            })?;
        }

        if let Some(value) = lookup(WORK_DIR_ENV) {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyWorkDir { var: WORK_DIR_ENV });
            }
            config.work_dir = PathBuf::from(value);
        }

        Ok(config)
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_work_dir<P: Into<PathBuf>>(self, work_dir: P) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..self
        }
    }
}

fn parse_timeout(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}
