// Execution settings (deserializable counterpart of Configuration)

use crate::domain::{Backoff, Configuration, ConfigurationBuilder};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of retries per phase
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default cap for exponential back-off (5s)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 5_000;

/// Plain settings loaded from files or the environment
///
/// `backoff_initial_ms = 0` disables back-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    pub connection_string: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default)]
    pub backoff_jitter: bool,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_max_ms() -> u64 {
    DEFAULT_BACKOFF_MAX_MS
}

impl ExecutionSettings {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_initial_ms: 0,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            backoff_jitter: false,
        }
    }

    /// Validate settings
    ///
    /// # Errors
    /// - `AppError::Config` if the connection string is blank or the back-off
    ///   cap is below its initial delay
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(AppError::Config(
                "connection_string must not be blank".to_string(),
            ));
        }
        if self.backoff_initial_ms > 0 && self.backoff_max_ms < self.backoff_initial_ms {
            return Err(AppError::Config(format!(
                "backoff_max_ms ({}) must be >= backoff_initial_ms ({})",
                self.backoff_max_ms, self.backoff_initial_ms
            )));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        if self.backoff_initial_ms == 0 {
            return Backoff::None;
        }
        Backoff::Exponential {
            initial: Duration::from_millis(self.backoff_initial_ms),
            max: Duration::from_millis(self.backoff_max_ms),
            jitter: self.backoff_jitter,
        }
    }

    /// Validated configuration builder with retries and back-off applied
    ///
    /// The retry predicate is left at its default; adapters set their own.
    pub fn into_builder<C, F>(self, factory: F) -> Result<ConfigurationBuilder<C>>
    where
        F: Fn(&str) -> Option<C> + Send + Sync + 'static,
    {
        self.validate()?;
        let backoff = self.backoff();
        Ok(Configuration::builder(self.connection_string, factory)
            .max_retries(self.max_retries)
            .backoff(backoff))
    }
}
