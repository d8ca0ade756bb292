// Scoped ownership of a connection handle during a run

use crate::port::{CommandLogger, Connection};
use std::sync::Arc;
use tracing::warn;

/// Owns the connection handle for the duration of a run
///
/// Normal exits call [`ConnectionGuard::release`], which closes the handle.
/// If the run unwinds or its future is dropped before that, the guard drops
/// the handle itself, releasing whatever the handle's own `Drop` releases.
/// Either way the logger hears about the release exactly once.
pub struct ConnectionGuard<C: Connection> {
    connection: C,
    logger: Arc<dyn CommandLogger>,
    command: String,
    released: bool,
}

impl<C: Connection> ConnectionGuard<C> {
    pub fn new(connection: C, logger: Arc<dyn CommandLogger>, command: impl Into<String>) -> Self {
        Self {
            connection,
            logger,
            command: command.into(),
            released: false,
        }
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Close the handle, whether or not it was ever opened
    ///
    /// A failing close is logged, not returned: it must not mask the
    /// outcome of the run.
    pub async fn release(mut self) {
        if let Err(e) = self.connection.close().await {
            warn!(error = %e, "Failed to close connection");
        }
        self.released = true;
        self.logger.connection_released(&self.command);
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Connection dropped without release (run aborted)");
            self.logger.connection_released(&self.command);
        }
    }
}
