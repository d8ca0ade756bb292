// Command Runner - connection, retries and timing around a Command

mod guard;

pub use guard::ConnectionGuard;

use crate::application::retry::{RetryStrategy, RetryableOperation};
use crate::domain::{CommandStatistics, Configuration, Phase, RunOutcome, RunRecord};
use crate::error::{AppError, Result};
use crate::port::{Command, CommandLogger, Connection, LoggerFactory};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

/// Opens the connection handle
struct OpenConnection;

#[async_trait]
impl<C: Connection> RetryableOperation<C> for OpenConnection {
    type Output = ();

    async fn attempt(&self, connection: &mut C) -> Result<()> {
        connection.open().await
    }
}

/// Runs the command's execution step
struct ExecuteStep<'a, K, C> {
    command: &'a K,
    configuration: &'a Configuration<C>,
}

#[async_trait]
impl<K, C> RetryableOperation<C> for ExecuteStep<'_, K, C>
where
    K: Command<C>,
    C: Connection,
{
    type Output = K::Output;

    async fn attempt(&self, connection: &mut C) -> Result<K::Output> {
        self.command.execute(connection, self.configuration).await
    }
}

/// Runs a [`Command`] with uniform retry handling and timing
///
/// Lifecycle of [`CommandRunner::run`]:
/// 1. obtain a handle from the connection factory (not retried)
/// 2. open it under the connect retry strategy
/// 3. call `Command::execute` under the execute retry strategy
/// 4. record timings, release the handle, return the value or the
///    terminal error unchanged
///
/// Both strategies use the configuration's predicate, retry count and
/// back-off but are independent: connect retries never consume execute
/// retries.
pub struct CommandRunner<K, C>
where
    K: Command<C>,
    C: Connection,
{
    name: String,
    command: K,
    configuration: Arc<Configuration<C>>,
    logger: Arc<dyn CommandLogger>,
    statistics: CommandStatistics,
    connect_retry: RetryStrategy,
    execute_retry: RetryStrategy,
}

impl<K, C> CommandRunner<K, C>
where
    K: Command<C>,
    C: Connection,
{
    pub fn builder() -> CommandRunnerBuilder<K, C> {
        CommandRunnerBuilder::default()
    }

    /// Shorthand for the builder with every collaborator supplied
    pub fn new(
        name: impl Into<String>,
        command: K,
        configuration: Arc<Configuration<C>>,
        logger_factory: &dyn LoggerFactory,
    ) -> Result<Self> {
        Self::builder()
            .name(name)
            .command(command)
            .configuration(configuration)
            .logger_factory(logger_factory)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &Arc<Configuration<C>> {
        &self.configuration
    }

    pub fn statistics(&self) -> &CommandStatistics {
        &self.statistics
    }

    /// Execute the command
    ///
    /// May be called repeatedly; every call runs the full lifecycle and
    /// overwrites the statistics.
    ///
    /// # Errors
    /// - `AppError::InvalidOperation` if the connection factory produced no handle
    /// - the terminal error of the connect phase (execute is never attempted)
    /// - the terminal error of the execute phase
    pub async fn run(&mut self) -> Result<K::Output> {
        let run_id = Uuid::new_v4();
        let span = info_span!("command.run", command = %self.name, run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid) -> Result<K::Output> {
        let total = Instant::now();
        let mut record = RunRecord::new(run_id, Utc::now());
        debug!("Command run started");

        let connection = match self.configuration.create_connection() {
            Ok(connection) => connection,
            Err(e) => {
                record.elapsed = total.elapsed();
                return self.finish(record, Err(e));
            }
        };
        let mut guard =
            ConnectionGuard::new(connection, Arc::clone(&self.logger), self.name.as_str());

        let opened = self
            .connect_retry
            .execute(guard.connection_mut(), &OpenConnection)
            .await;
        record.connection_attempts = opened.attempts();

        let result = match opened.into_result() {
            Err(e) => Err(e),
            Ok(()) => {
                let exec_start = Instant::now();
                let step = ExecuteStep {
                    command: &self.command,
                    configuration: self.configuration.as_ref(),
                };
                let executed = self
                    .execute_retry
                    .execute(guard.connection_mut(), &step)
                    .await;
                record.exec_elapsed = exec_start.elapsed();
                record.execution_attempts = executed.attempts();
                executed.into_result()
            }
        };
        record.elapsed = total.elapsed();

        guard.release().await;
        self.finish(record, result)
    }

    fn finish(&mut self, mut record: RunRecord, result: Result<K::Output>) -> Result<K::Output> {
        record.outcome = match &result {
            Ok(_) => RunOutcome::Succeeded,
            Err(e) => {
                error!(
                    error = %e,
                    connection_attempts = record.connection_attempts,
                    execution_attempts = record.execution_attempts,
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    "Command run failed"
                );
                RunOutcome::Failed
            }
        };

        self.statistics.record(record);
        self.logger.run_completed(&self.statistics);
        result
    }
}

/// Builder for [`CommandRunner`]
///
/// Every collaborator is mandatory; `build` reports the first missing or
/// invalid one before any connection activity.
pub struct CommandRunnerBuilder<K, C> {
    name: Option<String>,
    command: Option<K>,
    configuration: Option<Arc<Configuration<C>>>,
    logger: Option<Arc<dyn CommandLogger>>,
}

impl<K, C> Default for CommandRunnerBuilder<K, C> {
    fn default() -> Self {
        Self {
            name: None,
            command: None,
            configuration: None,
            logger: None,
        }
    }
}

impl<K, C> CommandRunnerBuilder<K, C>
where
    K: Command<C>,
    C: Connection,
{
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn command(mut self, command: K) -> Self {
        self.command = Some(command);
        self
    }

    pub fn configuration(mut self, configuration: Arc<Configuration<C>>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Create the logger from `factory`, keyed by the command's type name
    pub fn logger_factory(mut self, factory: &dyn LoggerFactory) -> Self {
        self.logger = Some(factory.create_logger(std::any::type_name::<K>()));
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// - `AppError::ArgumentNull` if name, command, configuration or logger is missing
    /// - `AppError::ArgumentInvalid` if the name or the connection string is blank
    pub fn build(self) -> Result<CommandRunner<K, C>> {
        let name = self.name.ok_or(AppError::ArgumentNull("name"))?;
        if name.trim().is_empty() {
            return Err(AppError::ArgumentInvalid(
                "command name must not be blank".to_string(),
            ));
        }
        let command = self.command.ok_or(AppError::ArgumentNull("command"))?;
        let configuration = self
            .configuration
            .ok_or(AppError::ArgumentNull("configuration"))?;
        configuration.validate()?;
        let logger = self.logger.ok_or(AppError::ArgumentNull("logger"))?;

        let connect_retry = RetryStrategy::for_phase(
            Phase::Connect,
            name.clone(),
            &*configuration,
            Arc::clone(&logger),
        );
        let execute_retry = RetryStrategy::for_phase(
            Phase::Execute,
            name.clone(),
            &*configuration,
            Arc::clone(&logger),
        );

        Ok(CommandRunner {
            statistics: CommandStatistics::new(name.clone()),
            name,
            command,
            configuration,
            logger,
            connect_retry,
            execute_retry,
        })
    }
}
