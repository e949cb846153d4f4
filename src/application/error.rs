//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add execution context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("cannot split command into words (unbalanced quotes?): {command}")]
    Tokenize { command: String },

    #[error("empty command")]
    EmptyCommand,

    #[error("command failed ({status}): {command}")]
    CommandFailed {
        command: String,
        status: String,
        code: Option<i32>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Failure of a spawned process with a non-zero (or missing) exit code.
    pub fn command_failed(command: impl Into<String>, code: Option<i32>) -> Self {
        let status = match code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        Self::CommandFailed {
            command: command.into(),
            status,
            code,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
