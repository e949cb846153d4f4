//! Application layer: shell executor and the project's task commands
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod commands;
pub mod error;
pub mod error_ext;
pub mod services;

pub use commands::{registry, CommandFn, CommandRegistry};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
