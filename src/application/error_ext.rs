//! Error conversion helpers for I/O operations
//!
//! Provides an extension trait for attaching context to `io::Result`.

use std::fmt::Display;
use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add an action and its subject to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// runner.run(&spec).with_context("spawn", &spec.program)?;
    /// ```
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_context(self, action: &str, subject: impl Display) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, subject),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_io_error_when_with_context_then_operation_failed_names_subject() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.with_context("spawn", "cargo").unwrap_err();
        assert_eq!(err.to_string(), "operation failed: spawn: cargo");
    }
}
