// Command Port (Interface)
// The single step a concrete command implements

use crate::domain::Configuration;
use crate::error::Result;
use crate::port::Connection;
use async_trait::async_trait;

/// A unit of database work with a typed result
///
/// Per-call parameters are captured by the implementing type at
/// construction; `execute` only receives the open connection and the
/// configuration.
///
/// `execute` may be called several times against the same open handle when
/// earlier attempts failed with a retryable error, so it must be idempotent
/// or aware of its own side effects.
///
/// # Example
/// ```text
/// struct CountUsers;
///
/// #[async_trait]
/// impl Command<SqliteHandle> for CountUsers {
///     type Output = i64;
///
///     async fn execute(&self, conn: &mut SqliteHandle, _: &Configuration<SqliteHandle>) -> Result<i64> {
///         ...
///     }
/// }
/// ```
#[async_trait]
pub trait Command<C: Connection>: Send + Sync {
    /// Result type produced on success
    type Output: Send;

    /// Run the command against an open connection
    async fn execute(
        &self,
        connection: &mut C,
        configuration: &Configuration<C>,
    ) -> Result<Self::Output>;
}
