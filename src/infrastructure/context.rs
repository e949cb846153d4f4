//! Handler context: settings, shell executor and the assembled CLI
//!
//! Wires up the shell executor with its process runner.

use std::sync::Arc;

use crate::application::services::Shell;
use crate::config::{self, Settings};
use crate::infrastructure::traits::{CommandRunner, RealCommandRunner};

/// Everything a command handler may touch.
///
/// Built once in `main`, after the CLI has been assembled.
pub struct Context {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Shell executor rooted at the project directory
    pub shell: Shell,

    /// Assembled command tree, for handlers that introspect the CLI
    pub cli: clap::Command,
}

impl Context {
    /// Create a context with the real process runner.
    pub fn new(settings: Settings, cli: clap::Command) -> Self {
        Self::with_deps(settings, Arc::new(RealCommandRunner), cli)
    }

    /// Create a context with a custom runner (for testing).
    pub fn with_deps(
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        cli: clap::Command,
    ) -> Self {
        let root = settings.resolved_root(&config::default_project_root());
        let shell = Shell::new(root, runner).with_env(settings.env.clone());
        let settings = Arc::new(settings);

        Self {
            settings,
            shell,
            cli,
        }
    }
}
