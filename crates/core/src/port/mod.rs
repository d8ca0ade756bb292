// Port Layer - Interfaces for external collaborators

pub mod command;
pub mod connection;
pub mod logger;

// Re-exports
pub use command::Command;
pub use connection::Connection;
pub use logger::{
    CommandLogger, EventId, LoggerFactory, RetryWarning, TracingLogger, TracingLoggerFactory,
    EVENT_CONNECTION_ERROR,
};
