// src/config/settings.rs

//! Per-run tunables from the `settings` section of the package list

use crate::installer::RetryPolicy;
use crate::packages::brew::DEFAULT_BREW_BINARY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of concurrent installs
pub const DEFAULT_MAX_JOBS: usize = 4;

/// Default install attempts per package
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay before the first retry, in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Default backoff multiplier
pub const DEFAULT_BACKOFF: u32 = 2;

/// Run tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Maximum installs in flight at once
    pub max_jobs: usize,
    /// Install attempts per package (>= 1)
    pub retry_attempts: u32,
    /// Delay before the first retry, in seconds
    pub retry_delay: u64,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff: u32,
    /// Homebrew executable
    pub brew_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_jobs: DEFAULT_MAX_JOBS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
            backoff: DEFAULT_BACKOFF,
            brew_path: DEFAULT_BREW_BINARY.to_string(),
        }
    }
}

/// Command-line overrides for [`Settings`]
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub max_jobs: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_delay: Option<u64>,
}

impl Settings {
    /// Apply command-line overrides on top of the configured values
    ///
    /// Zero job or attempt counts are raised to one.
    pub fn with_overrides(&self, overrides: &SettingsOverrides) -> Self {
        Self {
            max_jobs: overrides.max_jobs.unwrap_or(self.max_jobs).max(1),
            retry_attempts: overrides.retry_attempts.unwrap_or(self.retry_attempts).max(1),
            retry_delay: overrides.retry_delay.unwrap_or(self.retry_delay),
            backoff: self.backoff,
            brew_path: self.brew_path.clone(),
        }
    }

    /// Retry policy described by these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_delay),
            self.backoff,
        )
    }

    /// Check value ranges, returning a description of the first problem
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.max_jobs == 0 {
            return Err("settings.max_jobs must be at least 1".to_string());
        }
        if self.retry_attempts == 0 {
            return Err("settings.retry_attempts must be at least 1".to_string());
        }
        if self.backoff == 0 {
            return Err("settings.backoff must be at least 1".to_string());
        }
        if self.brew_path.trim().is_empty() {
            return Err("settings.brew_path must not be empty".to_string());
        }
        Ok(())
    }
}
