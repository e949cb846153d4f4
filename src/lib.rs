//! Declarative development task runner.
//!
//! Command functions are registered with stacked decorators ([`domain::cmd`],
//! [`domain::arg`], [`domain::effect`]) in a [`domain::Registry`]; the
//! [`cli::Cli`] builder turns the registry into a clap command tree, parses
//! process input and dispatches to the selected function. Commands run their
//! external tools through the synchronous [`application::services::Shell`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
