//! Retry behaviour with real SQLite failures

mod common;

use async_trait::async_trait;
use common::{missing_directory_url, TempDb};
use dbcommand_core::domain::{retry_always, Backoff, Phase, RunOutcome};
use dbcommand_core::port::logger::mocks::RecordingLoggerFactory;
use dbcommand_core::port::EVENT_CONNECTION_ERROR;
use dbcommand_core::{
    Command, CommandRunner, Configuration, Connection, ExecutionSettings, Result,
    TracingLoggerFactory,
};
use dbcommand_infra_sqlite::{
    is_transient_sqlite_error, map_sqlx_error, sqlite_configuration, sqlite_factory,
    ExecuteStatement, QueryScalar, SqliteHandle,
};
use sqlx::sqlite::SqliteConnection;
use sqlx::ConnectOptions;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

/// Handles that fail immediately on a locked database instead of waiting
fn no_wait_factory() -> impl Fn(&str) -> Option<SqliteHandle> + Send + Sync + 'static {
    let factory = sqlite_factory();
    move |url: &str| {
        let handle = factory(url)?;
        let options = handle.options().clone().busy_timeout(Duration::ZERO);
        Some(SqliteHandle::new(options))
    }
}

/// Inserts a row; on the first attempt a second connection holds the
/// write lock, so the insert fails with SQLITE_BUSY
struct ContendedInsert {
    blocker: Mutex<SqliteConnection>,
    attempts: AtomicU32,
}

#[async_trait]
impl Command<SqliteHandle> for ContendedInsert {
    type Output = u64;

    async fn execute(
        &self,
        connection: &mut SqliteHandle,
        _configuration: &Configuration<SqliteHandle>,
    ) -> Result<u64> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut blocker = self.blocker.lock().await;

        if attempt == 1 {
            sqlx::query("BEGIN IMMEDIATE")
                .execute(&mut *blocker)
                .await
                .map_err(map_sqlx_error)?;
        }

        let result = sqlx::query("INSERT INTO events (kind) VALUES ('contended')")
            .execute(connection.connection()?)
            .await
            .map_err(map_sqlx_error);

        if attempt == 1 {
            sqlx::query("ROLLBACK")
                .execute(&mut *blocker)
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(result?.rows_affected())
    }
}

#[tokio::test]
async fn test_missing_directory_exhausts_connect_retries() {
    let configuration = Arc::new(
        Configuration::builder(missing_directory_url(), sqlite_factory())
            .max_retries(2)
            .retry_predicate(retry_always)
            .build(),
    );
    let factory = RecordingLoggerFactory::new();

    let mut runner = CommandRunner::new(
        "open-missing",
        ExecuteStatement::new("SELECT 1"),
        configuration,
        &factory,
    )
    .unwrap();

    let err = assert_err!(runner.run().await);
    // SQLITE_CANTOPEN
    assert_eq!(err.code(), Some("14"), "got {}", err);

    let stats = runner.statistics();
    assert_eq!(stats.last_connection_attempts(), 3);
    assert_eq!(stats.last_execution_attempts(), 0);
    assert_eq!(stats.last_exec_elapsed(), Duration::ZERO);
    assert_eq!(stats.last_outcome(), Some(RunOutcome::Failed));

    let warnings = factory.logger().warnings_for(Phase::Connect);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.event == EVENT_CONNECTION_ERROR));
    assert_eq!(warnings[1].retry_count, 2);
}

#[tokio::test]
async fn test_missing_directory_is_not_transient_by_default() {
    let configuration = Arc::new(
        sqlite_configuration(ExecutionSettings {
            max_retries: 5,
            ..ExecutionSettings::new(missing_directory_url())
        })
        .unwrap(),
    );

    let mut runner = CommandRunner::new(
        "open-missing",
        ExecuteStatement::new("SELECT 1"),
        configuration,
        &TracingLoggerFactory,
    )
    .unwrap();

    let err = assert_err!(runner.run().await);
    assert!(!is_transient_sqlite_error(&err));
    assert_eq!(runner.statistics().last_connection_attempts(), 1);
}

#[tokio::test]
async fn test_backoff_between_connect_attempts() {
    let configuration = Arc::new(
        Configuration::builder(missing_directory_url(), sqlite_factory())
            .max_retries(2)
            .retry_predicate(retry_always)
            .backoff(Backoff::Fixed(Duration::from_millis(50)))
            .build(),
    );

    let mut runner = CommandRunner::new(
        "open-missing",
        ExecuteStatement::new("SELECT 1"),
        configuration,
        &TracingLoggerFactory,
    )
    .unwrap();

    let start = Instant::now();
    assert_err!(runner.run().await);

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(runner.statistics().last_elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_busy_write_is_retried_and_succeeds() {
    let db = TempDb::new("busy");
    let configuration = Arc::new(
        Configuration::builder(db.url(), no_wait_factory())
            .max_retries(2)
            .retry_predicate(is_transient_sqlite_error)
            .build(),
    );

    // Schema, plus the blocking connection (opened before the run)
    let mut setup = configuration.create_connection().unwrap();
    assert_ok!(setup.open().await);
    sqlx::query("CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT)")
        .execute(setup.connection().unwrap())
        .await
        .unwrap();
    assert_ok!(setup.close().await);

    let blocker = configuration
        .create_connection()
        .unwrap()
        .options()
        .connect()
        .await
        .unwrap();

    let factory = RecordingLoggerFactory::new();
    let mut runner = CommandRunner::new(
        "contended-insert",
        ContendedInsert {
            blocker: Mutex::new(blocker),
            attempts: AtomicU32::new(0),
        },
        Arc::clone(&configuration),
        &factory,
    )
    .unwrap();

    let rows = assert_ok!(runner.run().await);
    assert_eq!(rows, 1);
    assert_eq!(runner.statistics().last_execution_attempts(), 2);

    let warnings = factory.logger().warnings_for(Phase::Execute);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].retry_count, 1);
    assert!(warnings[0].error.contains("locked"), "got {}", warnings[0].error);

    let mut count = CommandRunner::new(
        "count-events",
        QueryScalar::<i64>::new("SELECT COUNT(*) FROM events"),
        configuration,
        &TracingLoggerFactory,
    )
    .unwrap();
    assert_eq!(assert_ok!(count.run().await), Some(1));
}
