//! dbcommand CLI - run SQL through a retrying, timed command runner

mod scalar;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dbcommand_core::domain::RunOutcome;
use dbcommand_core::{Command, CommandRunner, CommandStatistics, TracingLoggerFactory};
use dbcommand_infra_sqlite::{sqlite_configuration, ExecuteStatement, SqliteHandle};
use scalar::ScalarValue;
use serde_json::{json, Value};
use settings::{load_settings, SettingsOverrides};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dbcommand")]
#[command(about = "Run SQL against SQLite with retries and timing", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL (overrides config file and DBCOMMAND_CONNECTION_STRING)
    #[arg(long)]
    database_url: Option<String>,

    /// Retries per phase (overrides config file and DBCOMMAND_MAX_RETRIES)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Settings file (default: ./dbcommand.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log format
    #[arg(long, env = "DBCOMMAND_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Result output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute statements and report affected rows
    Exec {
        /// SQL text (`;`-separated statements allowed)
        sql: String,
    },

    /// Fetch the first column of the first row
    Scalar {
        /// SQL query
        sql: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct StatisticsRow {
    command: String,
    outcome: String,
    connection_attempts: u32,
    execution_attempts: u32,
    elapsed_ms: u128,
    exec_elapsed_ms: u128,
}

impl From<&CommandStatistics> for StatisticsRow {
    fn from(stats: &CommandStatistics) -> Self {
        let outcome = match stats.last_outcome() {
            Some(RunOutcome::Succeeded) => "succeeded",
            Some(RunOutcome::Failed) => "failed",
            None => "-",
        };
        Self {
            command: stats.name().to_string(),
            outcome: outcome.to_string(),
            connection_attempts: stats.last_connection_attempts(),
            execution_attempts: stats.last_execution_attempts(),
            elapsed_ms: stats.last_elapsed().as_millis(),
            exec_elapsed_ms: stats.last_exec_elapsed().as_millis(),
        }
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("dbcommand=info"))
        .context("Failed to create env filter")?;

    // stdout carries results, logs go to stderr
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

/// Run `command` once and print its result and statistics
async fn run_and_report<K>(
    name: &str,
    command: K,
    configuration: Arc<dbcommand_core::Configuration<SqliteHandle>>,
    output: OutputFormat,
) -> Result<()>
where
    K: Command<SqliteHandle>,
    K::Output: Clone + Into<Value>,
{
    let mut runner = CommandRunner::new(name, command, configuration, &TracingLoggerFactory)
        .context("Failed to build command runner")?;

    let result = runner.run().await;
    let stats = runner.statistics();

    match output {
        OutputFormat::Json => {
            let report = match &result {
                Ok(value) => json!({ "result": value_ref(value), "statistics": stats }),
                Err(e) => json!({ "error": e.to_string(), "statistics": stats }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            match &result {
                Ok(value) => {
                    println!("{}", "✓ Command succeeded".green().bold());
                    println!("{}", value_ref(value));
                }
                Err(e) => println!("{} {}", "✗ Command failed:".red().bold(), e),
            }
            println!();
            println!("{}", Table::new(vec![StatisticsRow::from(stats)]));
        }
    }

    result
        .map(|_| ())
        .with_context(|| format!("Command '{}' failed", name))
}

fn value_ref<T: Clone + Into<Value>>(value: &T) -> Value {
    value.clone().into()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let overrides = SettingsOverrides {
        connection_string: cli.database_url.clone(),
        max_retries: cli.max_retries,
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    info!(
        max_retries = settings.max_retries,
        backoff_initial_ms = settings.backoff_initial_ms,
        "dbcommand v{} starting",
        dbcommand_core::VERSION
    );

    let configuration = Arc::new(sqlite_configuration(settings)?);

    match cli.command {
        Commands::Exec { sql } => {
            run_and_report("exec", ExecuteStatement::new(sql), configuration, cli.output).await
        }
        Commands::Scalar { sql } => {
            run_and_report("scalar", ScalarValue::new(sql), configuration, cli.output).await
        }
    }
}
