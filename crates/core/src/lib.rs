// dbcommand Core - Ports, configuration and the command runner
// NO database driver dependencies: adapters implement the ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{CommandRunner, CommandRunnerBuilder};
pub use domain::{Backoff, CommandStatistics, Configuration, ExecutionSettings};
pub use error::{AppError, Result};
pub use port::{Command, CommandLogger, Connection, LoggerFactory, TracingLoggerFactory};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
