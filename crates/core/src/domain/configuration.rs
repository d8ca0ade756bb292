// Execution Configuration - immutable settings shared by command runners

use crate::domain::Backoff;
use crate::error::{AppError, Result};
use std::fmt;
use std::sync::Arc;

/// Produces a new, unopened connection handle for a connection string
///
/// Returning `None` means no handle could be produced; the runner reports
/// that as [`AppError::InvalidOperation`].
pub type ConnectionFactory<C> = Arc<dyn Fn(&str) -> Option<C> + Send + Sync>;

/// Decides whether an error should trigger another attempt
pub type RetryPredicate = Arc<dyn Fn(&AppError) -> bool + Send + Sync>;

/// Default retry predicate: retry transient errors only
pub fn retry_on_transient(error: &AppError) -> bool {
    error.is_transient()
}

/// Retry every error
pub fn retry_always(_error: &AppError) -> bool {
    true
}

/// Never retry
pub fn retry_never(_error: &AppError) -> bool {
    false
}

/// Immutable execution configuration
///
/// Built once and shared (`Arc<Configuration<C>>`) across any number of
/// runners. There are no setters: every field is fixed by
/// [`ConfigurationBuilder::build`].
pub struct Configuration<C> {
    connection_string: String,
    max_retries: u32,
    backoff: Backoff,
    connection_factory: ConnectionFactory<C>,
    retry_predicate: RetryPredicate,
}

impl<C> Configuration<C> {
    /// Start building a configuration
    ///
    /// Defaults: `max_retries = 0`, predicate [`retry_on_transient`],
    /// no back-off.
    pub fn builder<F>(connection_string: impl Into<String>, factory: F) -> ConfigurationBuilder<C>
    where
        F: Fn(&str) -> Option<C> + Send + Sync + 'static,
    {
        ConfigurationBuilder {
            connection_string: connection_string.into(),
            max_retries: 0,
            backoff: Backoff::None,
            connection_factory: Arc::new(factory),
            retry_predicate: Arc::new(retry_on_transient),
        }
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Additional attempts allowed after the first one, per phase
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn retry_predicate(&self) -> &RetryPredicate {
        &self.retry_predicate
    }

    /// Apply the retry predicate to an error
    pub fn should_retry(&self, error: &AppError) -> bool {
        (self.retry_predicate)(error)
    }

    /// Check the configuration is usable by a runner
    ///
    /// # Errors
    /// - `AppError::ArgumentInvalid` if the connection string is blank
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(AppError::ArgumentInvalid(
                "connection string must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Produce a new, unopened connection handle
    ///
    /// Not retried: building the handle is local, only opening it is fallible
    /// in practice.
    ///
    /// # Errors
    /// - `AppError::InvalidOperation` if the factory produced no handle
    pub fn create_connection(&self) -> Result<C> {
        (self.connection_factory)(&self.connection_string).ok_or_else(|| {
            AppError::InvalidOperation("connection factory returned no connection".to_string())
        })
    }
}

impl<C> fmt::Debug for Configuration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("connection_string", &self.connection_string)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Configuration`]
pub struct ConfigurationBuilder<C> {
    connection_string: String,
    max_retries: u32,
    backoff: Backoff,
    connection_factory: ConnectionFactory<C>,
    retry_predicate: RetryPredicate,
}

impl<C> ConfigurationBuilder<C> {
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AppError) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub fn build(self) -> Configuration<C> {
        Configuration {
            connection_string: self.connection_string,
            max_retries: self.max_retries,
            backoff: self.backoff,
            connection_factory: self.connection_factory,
            retry_predicate: self.retry_predicate,
        }
    }
}
