// dbcommand Infrastructure - SQLite Adapter
// Implements: Connection (SqliteHandle), ready-made commands, SQLite retry predicate

mod commands;
mod connection;
mod error;

pub use commands::{ExecuteStatement, QueryScalar};
pub use connection::{sqlite_configuration, sqlite_factory, SqliteHandle, DEFAULT_BUSY_TIMEOUT};
pub use error::{is_transient_sqlite_error, map_sqlx_error, TRANSIENT_SQLITE_CODES};
