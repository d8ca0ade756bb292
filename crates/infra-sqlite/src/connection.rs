// SQLite Connection Handle

use crate::error::{is_transient_sqlite_error, map_sqlx_error};
use async_trait::async_trait;
use dbcommand_core::{AppError, Configuration, Connection, ExecutionSettings, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection as _};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// How long SQLite waits on a locked database before returning SQLITE_BUSY
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite connection handle
///
/// Created unopened from connect options; `open` establishes the sqlx
/// connection, `close` shuts it down gracefully. Dropping an open handle
/// closes the underlying connection as well.
pub struct SqliteHandle {
    options: SqliteConnectOptions,
    connection: Option<SqliteConnection>,
}

impl SqliteHandle {
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self {
            options,
            connection: None,
        }
    }

    /// Parse a connection string (`sqlite::memory:`, `sqlite://path.db`, `path.db`)
    ///
    /// Applies WAL journaling, a busy timeout and create-if-missing.
    ///
    /// # Errors
    /// - `AppError::Config` if the string cannot be parsed
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| AppError::Config(format!("invalid SQLite connection string: {}", e)))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .create_if_missing(true);

        Ok(Self::new(options))
    }

    pub fn options(&self) -> &SqliteConnectOptions {
        &self.options
    }

    /// The open sqlx connection, for use by commands
    ///
    /// # Errors
    /// - `AppError::InvalidOperation` if the handle is not open
    pub fn connection(&mut self) -> Result<&mut SqliteConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| AppError::InvalidOperation("SQLite handle is not open".to_string()))
    }
}

#[async_trait]
impl Connection for SqliteHandle {
    async fn open(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let connection = self.options.connect().await.map_err(map_sqlx_error)?;
        debug!(
            filename = %self.options.get_filename().display(),
            "SQLite connection opened"
        );
        self.connection = Some(connection);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await.map_err(map_sqlx_error)?;
            debug!("SQLite connection closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

/// Connection factory for `Configuration::builder`
///
/// Unparsable connection strings produce no handle (the runner then fails
/// with `AppError::InvalidOperation`).
pub fn sqlite_factory() -> impl Fn(&str) -> Option<SqliteHandle> + Send + Sync + 'static {
    |connection_string: &str| match SqliteHandle::from_connection_string(connection_string) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Cannot create SQLite handle");
            None
        }
    }
}

/// Configuration for SQLite from settings, retrying transient SQLite errors
pub fn sqlite_configuration(settings: ExecutionSettings) -> Result<Configuration<SqliteHandle>> {
    Ok(settings
        .into_builder(sqlite_factory())?
        .retry_predicate(is_transient_sqlite_error)
        .build())
}
