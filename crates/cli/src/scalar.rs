// Dynamically typed scalar query for ad-hoc SQL

use async_trait::async_trait;
use dbcommand_core::{AppError, Command, Configuration, Result};
use dbcommand_infra_sqlite::{map_sqlx_error, SqliteHandle};
use serde_json::Value;
use sqlx::{Row, TypeInfo, ValueRef};

/// First column of the first row as JSON, whatever its SQLite storage class
///
/// No rows yields `Value::Null`, same as a NULL cell.
pub struct ScalarValue {
    sql: String,
}

impl ScalarValue {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl Command<SqliteHandle> for ScalarValue {
    type Output = Value;

    async fn execute(
        &self,
        connection: &mut SqliteHandle,
        _configuration: &Configuration<SqliteHandle>,
    ) -> Result<Value> {
        let row = sqlx::query(&self.sql)
            .fetch_optional(connection.connection()?)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(Value::Null);
        };
        if row.columns().is_empty() {
            return Err(AppError::Execution(
                "query returned no columns".to_string(),
            ));
        }

        let raw = row.try_get_raw(0).map_err(map_sqlx_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let storage_class = raw.type_info().name().to_string();
        let value = match storage_class.as_str() {
            "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(0).map_err(map_sqlx_error)?),
            "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(0).map_err(map_sqlx_error)?),
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get(0).map_err(map_sqlx_error)?;
                Value::from(format!("<{} byte blob>", bytes.len()))
            }
            _ => Value::from(row.try_get::<String, _>(0).map_err(map_sqlx_error)?),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcommand_core::Connection;
    use dbcommand_infra_sqlite::sqlite_factory;

    async fn scalar(sql: &str) -> Value {
        let configuration = Configuration::builder("sqlite::memory:", sqlite_factory()).build();
        let mut handle = configuration.create_connection().unwrap();
        handle.open().await.unwrap();

        let value = ScalarValue::new(sql)
            .execute(&mut handle, &configuration)
            .await
            .unwrap();
        handle.close().await.unwrap();
        value
    }

    #[tokio::test]
    async fn test_storage_classes() {
        assert_eq!(scalar("SELECT 40 + 2").await, Value::from(42));
        assert_eq!(scalar("SELECT 'hello'").await, Value::from("hello"));
        assert_eq!(scalar("SELECT 1.5").await, Value::from(1.5));
        assert_eq!(scalar("SELECT NULL").await, Value::Null);
        assert_eq!(scalar("SELECT x'0102'").await, Value::from("<2 byte blob>"));
    }

    #[tokio::test]
    async fn test_no_rows_is_null() {
        assert_eq!(scalar("SELECT 1 WHERE 0").await, Value::Null);
    }
}
