// Logger Port (Interface)
// Structured diagnostics emitted by the runner and its retry strategies

use crate::domain::{CommandStatistics, Phase};
use crate::error::AppError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stable identifier of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventId {
    pub id: u32,
    pub name: &'static str,
}

/// Emitted once for every failed attempt that is going to be retried
pub const EVENT_CONNECTION_ERROR: EventId = EventId {
    id: 1001,
    name: "dbcommand.connection_error",
};

/// A failed attempt about to be retried
#[derive(Debug)]
pub struct RetryWarning<'a> {
    pub event: EventId,
    pub command: &'a str,
    pub phase: Phase,
    pub error: &'a AppError,
    /// 1-based number of the retry about to happen
    pub retry_count: u32,
    pub max_retries: u32,
    /// Back-off before the retry
    pub delay: Duration,
}

impl RetryWarning<'_> {
    /// Human-readable message
    pub fn message(&self) -> String {
        format!(
            "{} phase of command '{}' failed, retry {} of {}",
            self.phase, self.command, self.retry_count, self.max_retries
        )
    }
}

/// Logging collaborator of a command runner
pub trait CommandLogger: Send + Sync {
    /// A failed attempt is going to be retried
    fn retry_warning(&self, warning: &RetryWarning<'_>);

    /// The run's connection handle was given back, once per created handle
    fn connection_released(&self, command: &str) {
        let _ = command;
    }

    /// A run finished and its statistics were recorded
    fn run_completed(&self, statistics: &CommandStatistics) {
        let _ = statistics;
    }
}

/// Creates loggers keyed by category (the command's concrete type name)
pub trait LoggerFactory: Send + Sync {
    fn create_logger(&self, category: &str) -> Arc<dyn CommandLogger>;
}

/// `tracing` backed logger
pub struct TracingLogger {
    category: String,
}

impl TracingLogger {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

impl CommandLogger for TracingLogger {
    fn retry_warning(&self, warning: &RetryWarning<'_>) {
        warn!(
            event_id = warning.event.id,
            event = warning.event.name,
            category = %self.category,
            command = %warning.command,
            phase = %warning.phase,
            retry_count = warning.retry_count,
            max_retries = warning.max_retries,
            delay_ms = warning.delay.as_millis() as u64,
            error = %warning.error,
            "{}",
            warning.message()
        );
    }

    fn connection_released(&self, command: &str) {
        debug!(category = %self.category, command = %command, "Connection released");
    }

    fn run_completed(&self, statistics: &CommandStatistics) {
        info!(
            category = %self.category,
            command = %statistics.name(),
            elapsed_ms = statistics.last_elapsed().as_millis() as u64,
            exec_elapsed_ms = statistics.last_exec_elapsed().as_millis() as u64,
            connection_attempts = statistics.last_connection_attempts(),
            execution_attempts = statistics.last_execution_attempts(),
            outcome = ?statistics.last_outcome(),
            "Command run completed"
        );
    }
}

/// Factory producing [`TracingLogger`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLoggerFactory;

impl LoggerFactory for TracingLoggerFactory {
    fn create_logger(&self, category: &str) -> Arc<dyn CommandLogger> {
        debug!(category = %category, "Creating command logger");
        Arc::new(TracingLogger::new(category))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Owned copy of a [`RetryWarning`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedWarning {
        pub event: EventId,
        pub command: String,
        pub phase: Phase,
        pub error: String,
        pub retry_count: u32,
        pub max_retries: u32,
        pub message: String,
    }

    /// Logger that keeps every record in memory
    #[derive(Default)]
    pub struct RecordingLogger {
        warnings: Mutex<Vec<RecordedWarning>>,
        released: Mutex<Vec<String>>,
        completed_runs: Mutex<Vec<CommandStatistics>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn warnings(&self) -> Vec<RecordedWarning> {
            self.warnings.lock().unwrap().clone()
        }

        pub fn warnings_for(&self, phase: Phase) -> Vec<RecordedWarning> {
            self.warnings()
                .into_iter()
                .filter(|w| w.phase == phase)
                .collect()
        }

        /// Command names, one entry per released connection
        pub fn released_connections(&self) -> Vec<String> {
            self.released.lock().unwrap().clone()
        }

        pub fn completed_runs(&self) -> Vec<CommandStatistics> {
            self.completed_runs.lock().unwrap().clone()
        }
    }

    impl CommandLogger for RecordingLogger {
        fn retry_warning(&self, warning: &RetryWarning<'_>) {
            self.warnings.lock().unwrap().push(RecordedWarning {
                event: warning.event,
                command: warning.command.to_string(),
                phase: warning.phase,
                error: warning.error.to_string(),
                retry_count: warning.retry_count,
                max_retries: warning.max_retries,
                message: warning.message(),
            });
        }

        fn connection_released(&self, command: &str) {
            self.released.lock().unwrap().push(command.to_string());
        }

        fn run_completed(&self, statistics: &CommandStatistics) {
            self.completed_runs.lock().unwrap().push(statistics.clone());
        }
    }

    /// Factory handing out one shared RecordingLogger
    #[derive(Default)]
    pub struct RecordingLoggerFactory {
        logger: Arc<RecordingLogger>,
        categories: Mutex<Vec<String>>,
    }

    impl RecordingLoggerFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn logger(&self) -> Arc<RecordingLogger> {
            Arc::clone(&self.logger)
        }

        /// Categories requested so far, in order
        pub fn categories(&self) -> Vec<String> {
            self.categories.lock().unwrap().clone()
        }
    }

    impl LoggerFactory for RecordingLoggerFactory {
        fn create_logger(&self, category: &str) -> Arc<dyn CommandLogger> {
            self.categories.lock().unwrap().push(category.to_string());
            self.logger.clone()
        }
    }
}
