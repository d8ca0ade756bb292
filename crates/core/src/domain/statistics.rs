// Command Statistics - per-runner timing record

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;
use uuid::Uuid;

/// How the last run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// Measurements collected during a single run
///
/// Accumulated locally by the runner and applied to [`CommandStatistics`]
/// in one update when the run ends.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub exec_elapsed: Duration,
    pub connection_attempts: u32,
    pub execution_attempts: u32,
    pub outcome: RunOutcome,
}

impl RunRecord {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            elapsed: Duration::ZERO,
            exec_elapsed: Duration::ZERO,
            connection_attempts: 0,
            execution_attempts: 0,
            outcome: RunOutcome::Failed,
        }
    }
}

/// Timing statistics of a command runner
///
/// `last_exec_elapsed` is a sub-interval of `last_elapsed`, so
/// `last_exec_elapsed <= last_elapsed` holds after every run.
#[derive(Debug, Clone, Serialize)]
pub struct CommandStatistics {
    name: String,
    #[serde(rename = "last_elapsed_ms", serialize_with = "serialize_millis")]
    last_elapsed: Duration,
    #[serde(rename = "last_exec_elapsed_ms", serialize_with = "serialize_millis")]
    last_exec_elapsed: Duration,
    last_run_id: Option<Uuid>,
    last_started_at: Option<DateTime<Utc>>,
    last_connection_attempts: u32,
    last_execution_attempts: u32,
    last_outcome: Option<RunOutcome>,
    run_count: u64,
}

impl CommandStatistics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_elapsed: Duration::ZERO,
            last_exec_elapsed: Duration::ZERO,
            last_run_id: None,
            last_started_at: None,
            last_connection_attempts: 0,
            last_execution_attempts: 0,
            last_outcome: None,
            run_count: 0,
        }
    }

    /// Overwrite the "last run" fields with a finished run
    pub fn record(&mut self, run: RunRecord) {
        debug_assert!(
            run.exec_elapsed <= run.elapsed,
            "execution time must be a sub-interval of total time"
        );

        self.last_elapsed = run.elapsed;
        self.last_exec_elapsed = run.exec_elapsed;
        self.last_run_id = Some(run.run_id);
        self.last_started_at = Some(run.started_at);
        self.last_connection_attempts = run.connection_attempts;
        self.last_execution_attempts = run.execution_attempts;
        self.last_outcome = Some(run.outcome);
        self.run_count += 1;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock duration of the whole last run, connection included
    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// Wall-clock duration of the execution phase of the last run
    pub fn last_exec_elapsed(&self) -> Duration {
        self.last_exec_elapsed
    }

    pub fn last_run_id(&self) -> Option<Uuid> {
        self.last_run_id
    }

    pub fn last_started_at(&self) -> Option<DateTime<Utc>> {
        self.last_started_at
    }

    pub fn last_connection_attempts(&self) -> u32 {
        self.last_connection_attempts
    }

    pub fn last_execution_attempts(&self) -> u32 {
        self.last_execution_attempts
    }

    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.last_outcome
    }

    pub fn run_count(&self) -> u64 {
        self.run_count
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
