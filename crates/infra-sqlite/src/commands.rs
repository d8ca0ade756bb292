// Ready-made SQLite commands

use crate::connection::SqliteHandle;
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use dbcommand_core::{Command, Configuration, Result};
use sqlx::sqlite::SqliteRow;
use std::marker::PhantomData;
use tracing::debug;

/// Run a statement, returning the number of affected rows
///
/// Multiple `;`-separated statements are allowed; the count is summed.
#[derive(Debug, Clone)]
pub struct ExecuteStatement {
    sql: String,
}

impl ExecuteStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl Command<SqliteHandle> for ExecuteStatement {
    type Output = u64;

    async fn execute(
        &self,
        connection: &mut SqliteHandle,
        _configuration: &Configuration<SqliteHandle>,
    ) -> Result<u64> {
        let conn = connection.connection()?;
        let result = sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&self.sql))
            .await
            .map_err(map_sqlx_error)?;

        debug!(rows_affected = result.rows_affected(), "Statement executed");
        Ok(result.rows_affected())
    }
}

/// Fetch the first column of the first row
///
/// `None` when the query returns no rows.
pub struct QueryScalar<T> {
    sql: String,
    _output: PhantomData<fn() -> T>,
}

impl<T> QueryScalar<T> {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            _output: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for QueryScalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryScalar")
            .field("sql", &self.sql)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Command<SqliteHandle> for QueryScalar<T>
where
    T: Send + Unpin + 'static,
    (T,): for<'r> sqlx::FromRow<'r, SqliteRow>,
{
    type Output = Option<T>;

    async fn execute(
        &self,
        connection: &mut SqliteHandle,
        _configuration: &Configuration<SqliteHandle>,
    ) -> Result<Option<T>> {
        sqlx::query_scalar::<_, T>(&self.sql)
            .fetch_optional(connection.connection()?)
            .await
            .map_err(map_sqlx_error)
    }
}
