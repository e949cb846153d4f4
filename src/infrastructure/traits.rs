//! I/O boundary traits for testability
//!
//! Process spawning sits behind [`CommandRunner`] so the shell executor and
//! the command handlers can be exercised without running real tools.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

/// Fully resolved child process request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the child
    pub cwd: PathBuf,
    /// Variables set on top of the inherited parent environment
    pub env: BTreeMap<String, String>,
    /// Pipe stdout back to the caller instead of inheriting it
    pub capture_stdout: bool,
}

impl ProcessSpec {
    /// Program and arguments as one display string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; None when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout (lossy UTF-8), only when requested
    pub stdout: Option<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run the process to completion, blocking the caller.
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        let mut command = std::process::Command::new(&spec.program);
        // envs() layers onto the inherited environment, nothing is cleared
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env);

        if spec.capture_stdout {
            let output = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .output()?;
            Ok(ProcessOutput {
                code: output.status.code(),
                stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            })
        } else {
            let status = command.status()?;
            Ok(ProcessOutput {
                code: status.code(),
                stdout: None,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str]) -> ProcessSpec {
        ProcessSpec {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: BTreeMap::new(),
            capture_stdout: true,
        }
    }

    #[test]
    fn given_failing_process_when_run_then_reports_code() {
        let out = RealCommandRunner
            .run(&spec("sh", &["-c", "exit 3"]))
            .expect("spawn sh");
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
    }

    #[test]
    fn given_cwd_when_run_then_child_starts_there() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut s = spec("pwd", &[]);
        s.cwd = dir.path().to_path_buf();

        let out = RealCommandRunner.run(&s).expect("spawn pwd");

        let printed = std::path::PathBuf::from(out.stdout.unwrap().trim());
        assert_eq!(
            printed.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn given_missing_program_when_run_then_io_error() {
        let result = RealCommandRunner.run(&spec("xtask-no-such-program-4711", &[]));
        assert!(result.is_err());
    }

    #[test]
    fn given_spec_when_command_line_then_joined() {
        assert_eq!(spec("cargo", &["test", "--release"]).command_line(), "cargo test --release");
    }
}
