//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent registration and assembly mistakes.
/// These are independent of process or terminal concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid argument for command '{command}': {reason}")]
    InvalidArgSpec { command: String, reason: String },

    #[error("no handler registered for command: {0}")]
    UnknownCommand(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
