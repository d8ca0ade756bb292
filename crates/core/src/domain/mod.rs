// Domain Layer - Configuration, statistics and value objects

pub mod backoff;
pub mod configuration;
pub mod phase;
pub mod settings;
pub mod statistics;

// Re-exports
pub use backoff::Backoff;
pub use configuration::{
    retry_always, retry_never, retry_on_transient, Configuration, ConfigurationBuilder,
    ConnectionFactory, RetryPredicate,
};
pub use phase::Phase;
pub use settings::ExecutionSettings;
pub use statistics::{CommandStatistics, RunOutcome, RunRecord};
