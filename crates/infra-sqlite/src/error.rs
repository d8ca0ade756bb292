// sqlx::Error -> AppError mapping and SQLite transient classification
// (cannot implement From<sqlx::Error> for AppError here: orphan rules)

use dbcommand_core::AppError;

/// SQLite result codes worth retrying
///
/// 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED, 261 = SQLITE_BUSY_RECOVERY,
/// 262 = SQLITE_LOCKED_SHAREDCACHE, 517 = SQLITE_BUSY_SNAPSHOT,
/// 773 = SQLITE_BUSY_TIMEOUT
pub const TRANSIENT_SQLITE_CODES: &[&str] = &["5", "6", "261", "262", "517", "773"];

/// Convert sqlx::Error to AppError, keeping the SQLite result code
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => AppError::database(code.to_string(), db_err.message()),
            None => AppError::Database {
                code: None,
                message: db_err.message().to_string(),
            },
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::Connection(err.to_string()),
        sqlx::Error::Configuration(_) => AppError::Config(err.to_string()),
        sqlx::Error::RowNotFound => AppError::Execution("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Execution(format!("Column not found: {}", col))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            AppError::Execution(err.to_string())
        }
        _ => AppError::Database {
            code: None,
            message: err.to_string(),
        },
    }
}

/// Retry predicate for SQLite
///
/// Connection failures plus busy/locked result codes. Constraint
/// violations, syntax errors and missing files are not retried.
pub fn is_transient_sqlite_error(err: &AppError) -> bool {
    if err.is_transient() {
        return true;
    }
    err.code()
        .map(|code| TRANSIENT_SQLITE_CODES.contains(&code))
        .unwrap_or(false)
}
