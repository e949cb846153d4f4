//! Domain layer: command metadata, the registry and the invocation record
//!
//! This layer is independent of external concerns (no I/O, no process spawning, no config loading).

pub mod entities;
pub mod error;
pub mod invocation;
pub mod registry;

pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use invocation::{ArgValue, Invocation};
pub use registry::{arg, cmd, effect, Binding, Decorator, Registry};
