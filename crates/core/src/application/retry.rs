// Retry Strategy - wraps one fallible phase of a command run

use crate::domain::{Backoff, Configuration, Phase, RetryPredicate};
use crate::error::{AppError, Result};
use crate::port::{CommandLogger, RetryWarning, EVENT_CONNECTION_ERROR};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a retried phase
///
/// Failures are captured, never raised mid-strategy; the runner turns a
/// terminal `Failure` back into an `Err` at the boundary of `run`.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Failure { error: AppError, attempts: u32 },
}

impl<T> RetryOutcome<T> {
    /// Total attempts made, the first one included
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Failure { error, .. } => Err(error),
        }
    }
}

/// A fallible operation over borrowed state, attempted by a RetryStrategy
#[async_trait]
pub trait RetryableOperation<S: Send + ?Sized>: Send + Sync {
    type Output: Send;

    async fn attempt(&self, state: &mut S) -> Result<Self::Output>;
}

/// Retry strategy for a single phase
///
/// Attempts the operation up to `max_retries + 1` times. An error rejected
/// by the predicate is terminal immediately; an accepted one is reported to
/// the logger and retried after the back-off delay. When attempts run out,
/// the last error is terminal.
pub struct RetryStrategy {
    phase: Phase,
    command: String,
    max_retries: u32,
    backoff: Backoff,
    predicate: RetryPredicate,
    logger: Arc<dyn CommandLogger>,
}

impl RetryStrategy {
    pub fn new(
        phase: Phase,
        command: impl Into<String>,
        max_retries: u32,
        backoff: Backoff,
        predicate: RetryPredicate,
        logger: Arc<dyn CommandLogger>,
    ) -> Self {
        Self {
            phase,
            command: command.into(),
            max_retries,
            backoff,
            predicate,
            logger,
        }
    }

    /// Strategy for `phase` using the configuration's retry settings
    pub fn for_phase<C>(
        phase: Phase,
        command: impl Into<String>,
        configuration: &Configuration<C>,
        logger: Arc<dyn CommandLogger>,
    ) -> Self {
        Self::new(
            phase,
            command,
            configuration.max_retries(),
            configuration.backoff(),
            Arc::clone(configuration.retry_predicate()),
            logger,
        )
    }

    /// Run `operation` against `state` under this strategy
    pub async fn execute<S, O>(&self, state: &mut S, operation: &O) -> RetryOutcome<O::Output>
    where
        S: Send + ?Sized,
        O: RetryableOperation<S>,
    {
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let error = match operation.attempt(state).await {
                Ok(value) => return RetryOutcome::Success { value, attempts },
                Err(error) => error,
            };

            if !(self.predicate)(&error) {
                debug!(
                    command = %self.command,
                    phase = %self.phase,
                    attempts,
                    error = %error,
                    "Error is not retryable"
                );
                return RetryOutcome::Failure { error, attempts };
            }

            if attempts > self.max_retries {
                debug!(
                    command = %self.command,
                    phase = %self.phase,
                    attempts,
                    error = %error,
                    "Retries exhausted"
                );
                return RetryOutcome::Failure { error, attempts };
            }

            let delay = self.backoff.delay_for(attempts);
            self.logger.retry_warning(&RetryWarning {
                event: EVENT_CONNECTION_ERROR,
                command: &self.command,
                phase: self.phase,
                error: &error,
                retry_count: attempts,
                max_retries: self.max_retries,
                delay,
            });

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{retry_always, retry_never, retry_on_transient};
    use crate::port::logger::mocks::RecordingLogger;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fails with the errors produced by `fail_with` for the first
    /// `failures` attempts, then returns the attempt number
    struct Flaky {
        failures: u32,
        fail_with: fn() -> AppError,
    }

    #[async_trait]
    impl RetryableOperation<u32> for Flaky {
        type Output = u32;

        async fn attempt(&self, calls: &mut u32) -> Result<u32> {
            *calls += 1;
            if *calls <= self.failures {
                Err((self.fail_with)())
            } else {
                Ok(*calls)
            }
        }
    }

    fn transient() -> AppError {
        AppError::Connection("connection reset".to_string())
    }

    fn permanent() -> AppError {
        AppError::Execution("constraint violated".to_string())
    }

    fn strategy(
        max_retries: u32,
        predicate: fn(&AppError) -> bool,
        logger: Arc<RecordingLogger>,
    ) -> RetryStrategy {
        RetryStrategy::new(
            Phase::Execute,
            "test-command",
            max_retries,
            Backoff::None,
            Arc::new(predicate),
            logger,
        )
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = strategy(3, retry_always, logger.clone());
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 0, fail_with: transient })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 1);
        assert!(logger.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = strategy(3, retry_on_transient, logger.clone());
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 3, fail_with: transient })
            .await;

        assert_eq!(outcome.attempts(), 4);
        assert_eq!(outcome.into_result().unwrap(), 4);

        let warnings = logger.warnings();
        assert_eq!(warnings.len(), 3);
        assert_eq!(
            warnings.iter().map(|w| w.retry_count).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(warnings.iter().all(|w| w.event == EVENT_CONNECTION_ERROR));
        assert!(warnings.iter().all(|w| w.phase == Phase::Execute));
        assert_eq!(warnings[0].command, "test-command");
        assert!(warnings[0].error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = strategy(2, retry_always, logger.clone());
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 10, fail_with: transient })
            .await;

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(calls, 3);
        assert!(matches!(outcome.into_result(), Err(AppError::Connection(_))));
        // No warning for the final, unretried failure
        assert_eq!(logger.warnings().len(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = strategy(5, retry_on_transient, logger.clone());
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 1, fail_with: permanent })
            .await;

        assert_eq!(outcome.attempts(), 1);
        assert!(matches!(outcome.into_result(), Err(AppError::Execution(_))));
        assert!(logger.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_predicate_never_with_zero_retries() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = strategy(0, retry_never, logger.clone());
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 1, fail_with: transient })
            .await;

        assert_eq!(outcome.attempts(), 1);
        assert!(!outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_only_between_attempts() {
        let logger = Arc::new(RecordingLogger::new());
        let retry = RetryStrategy::new(
            Phase::Connect,
            "test-command",
            2,
            Backoff::Fixed(Duration::from_secs(1)),
            Arc::new(retry_always),
            logger,
        );
        let mut calls = 0u32;

        let start = Instant::now();
        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 10, fail_with: transient })
            .await;

        assert_eq!(outcome.attempts(), 3);
        // Two waits: after attempt 1 and after attempt 2, none after the last
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(3), "waited {:?}", waited);
    }

    #[tokio::test]
    async fn test_predicate_sees_raised_error() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_in_predicate = Arc::clone(&seen);
        let retry = RetryStrategy::new(
            Phase::Execute,
            "test-command",
            3,
            Backoff::None,
            Arc::new(move |err: &AppError| {
                seen_in_predicate.fetch_add(1, Ordering::SeqCst);
                matches!(err, AppError::Connection(_))
            }),
            Arc::new(RecordingLogger::new()),
        );
        let mut calls = 0u32;

        let outcome = retry
            .execute(&mut calls, &Flaky { failures: 2, fail_with: transient })
            .await;

        assert!(outcome.is_success());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
