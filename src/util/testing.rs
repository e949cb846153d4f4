use std::env;
use std::io;
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::infrastructure::traits::{CommandRunner, ProcessOutput, ProcessSpec};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else if let Err(e) = subscriber.try_init() {
        eprintln!(
            "Error: Failed to set up logging: {} (RUST_LOG={:?})",
            e,
            env::var("RUST_LOG").ok()
        );
    }
}

/// Process runner double: records every request, spawns nothing.
///
/// Exit codes are scripted by command-line prefix; everything else exits 0.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<ProcessSpec>>,
    failures: Vec<(String, i32)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` when the command line starts with `prefix`.
    pub fn fail_on(mut self, prefix: impl Into<String>, code: i32) -> Self {
        self.failures.push((prefix.into(), code));
        self
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<ProcessSpec> {
        self.calls().pop()
    }

    /// Recorded requests as `program arg...` strings.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ProcessSpec::command_line).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(spec.clone());

        let line = spec.command_line();
        let code = self
            .failures
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        Ok(ProcessOutput {
            code: Some(code),
            stdout: spec.capture_stdout.then(String::new),
        })
    }
}
