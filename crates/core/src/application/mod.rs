// Application Layer - Retry strategies and the command runner

pub mod retry;
pub mod runner;

// Re-exports
pub use retry::{RetryOutcome, RetryStrategy, RetryableOperation};
pub use runner::{CommandRunner, CommandRunnerBuilder, ConnectionGuard};
