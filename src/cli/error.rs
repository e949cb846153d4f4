//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    /// Rejected by the argument parser; clap renders its own usage text.
    #[error("{0}")]
    Parse(#[from] clap::Error),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(e.into())
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Parse(e) => e.exit_code(),
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Application(app) => match app {
                    // a failed child reports its own code, signals count as plain failure
                    ApplicationError::CommandFailed { code, .. } => {
                        code.filter(|c| *c != 0).unwrap_or(exitcode::FAILURE)
                    }
                    ApplicationError::InvalidArgument(_) => exitcode::USAGE,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Domain(_)
                    | ApplicationError::Tokenize { .. }
                    | ApplicationError::EmptyCommand
                    | ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
                },
            },
        }
    }
}
