// Settings loading: dbcommand.toml < DBCOMMAND_* environment < CLI flags

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use dbcommand_core::ExecutionSettings;
use std::path::Path;

pub const ENV_PREFIX: &str = "DBCOMMAND";
const DEFAULT_CONFIG_NAME: &str = "dbcommand";

/// Values given on the command line, highest precedence
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub connection_string: Option<String>,
    pub max_retries: Option<u32>,
}

/// Load settings from the process environment
pub fn load_settings(
    config_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<ExecutionSettings> {
    load_settings_from(
        config_path,
        Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        overrides,
    )
}

/// Load settings with an explicit environment source
///
/// An explicit `config_path` must exist; otherwise `dbcommand.{toml,json,...}`
/// in the working directory is used when present.
pub fn load_settings_from(
    config_path: Option<&Path>,
    environment: Environment,
    overrides: &SettingsOverrides,
) -> Result<ExecutionSettings> {
    let file = match config_path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let settings: ExecutionSettings = Config::builder()
        .add_source(file)
        .add_source(environment)
        .set_override_option("connection_string", overrides.connection_string.clone())?
        .set_override_option("max_retries", overrides.max_retries.map(u64::from))?
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration (is a database URL set?)")?;

    settings.validate()?;
    Ok(settings)
}
