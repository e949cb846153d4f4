//! Infrastructure layer: process spawning and the handler context
//!
//! This layer implements the I/O boundary traits and wires up services.

pub mod context;
pub mod error;
pub mod traits;

pub use context::Context;
pub use error::InfraError;
