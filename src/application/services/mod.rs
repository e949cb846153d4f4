//! Application services
//!
//! Services depend on I/O boundary traits (CommandRunner)
//! but are themselves concrete structs, not traits.

mod shell;

pub use shell::{quote, split, RunOptions, Shell};
