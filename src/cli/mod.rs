//! CLI layer: assembly from the registry, parsing and dispatch

pub mod builder;
pub mod error;
pub mod output;

pub use builder::{Cli, Parsed, BIN_NAME};
pub use error::{CliError, CliResult};
