// Central Error Type for command execution

use thiserror::Error;

/// Application-level error type
///
/// Every error raised by a connection, a command or the runner itself is an
/// `AppError`. The runner never wraps a terminal error: what the command (or
/// the connection) returned is what the caller receives.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Argument null: {0}")]
    ArgumentNull(&'static str),

    #[error("Invalid argument: {0}")]
    ArgumentInvalid(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error{}: {message}", code_suffix(.code))]
    Database {
        code: Option<String>,
        message: String,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Database error carrying the engine's result code
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Database {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Engine-specific result code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            AppError::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Engine-independent transient classification
    ///
    /// Only connection failures qualify. Adapters know which database codes
    /// are transient for their engine and provide richer predicates.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Connection(_))
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
