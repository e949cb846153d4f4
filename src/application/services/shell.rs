//! Shell executor: run one command line synchronously in the project root
//!
//! The command line is split with shell word rules (no shell is involved),
//! echoed as `:: tok1 tok2 ...` and spawned through a [`CommandRunner`].
//! Non-zero exit aborts the caller unless `check` is switched off.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::infrastructure::traits::{CommandRunner, ProcessOutput, ProcessSpec};

/// Per-call process options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Treat non-zero exit as an error
    pub check: bool,
    /// Working directory override (default: project root)
    pub cwd: Option<PathBuf>,
    /// Capture stdout instead of inheriting it
    pub capture_stdout: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: true,
            cwd: None,
            capture_stdout: false,
        }
    }
}

impl RunOptions {
    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

/// Synchronous command executor bound to a project root.
pub struct Shell {
    root: PathBuf,
    env: BTreeMap<String, String>,
    runner: Arc<dyn CommandRunner>,
}

impl Shell {
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            env: BTreeMap::new(),
            runner,
        }
    }

    /// Variables applied to every invocation, below per-call overrides.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `command` with default options and no extra environment.
    pub fn sh(&self, command: &str) -> ApplicationResult<ProcessOutput> {
        self.sh_with(command, Vec::<(String, String)>::new(), RunOptions::default())
    }

    /// Run `command` with environment overrides and process options.
    pub fn sh_with<I, K, V>(
        &self,
        command: &str,
        env: I,
        options: RunOptions,
    ) -> ApplicationResult<ProcessOutput>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tokens = split(command)?.into_iter();
        let program = tokens.next().ok_or(ApplicationError::EmptyCommand)?;

        let mut merged = self.env.clone();
        merged.extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));

        let spec = ProcessSpec {
            program,
            args: tokens.collect(),
            cwd: options.cwd.unwrap_or_else(|| self.root.clone()),
            env: merged,
            capture_stdout: options.capture_stdout,
        };
        let line = spec.command_line();

        println!(":: {}", line);
        debug!(
            "sh: cwd={}, env={:?}, check={}",
            spec.cwd.display(),
            spec.env,
            options.check
        );

        let output = self.runner.run(&spec).with_context("spawn", &spec.program)?;

        if options.check && !output.success() {
            return Err(ApplicationError::command_failed(line, output.code));
        }
        debug!("sh: done, code={:?}", output.code);
        Ok(output)
    }
}

/// Split a command line into words; newlines count as plain whitespace.
pub fn split(command: &str) -> ApplicationResult<Vec<String>> {
    shlex::split(&command.replace('\n', " ")).ok_or_else(|| ApplicationError::Tokenize {
        command: command.to_string(),
    })
}

/// Quote any displayable value as one shell word.
///
/// Values `shlex` refuses (interior NUL) are single-quote wrapped.
pub fn quote(value: impl Display) -> String {
    let raw = value.to_string();
    match shlex::try_quote(&raw) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => format!("'{}'", raw.replace('\'', r"'\''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::RecordingRunner;
    use rstest::rstest;

    fn shell(runner: &Arc<RecordingRunner>) -> Shell {
        Shell::new("/project", runner.clone())
    }

    #[test]
    fn given_multiline_command_when_sh_then_newlines_are_whitespace() {
        let runner = Arc::new(RecordingRunner::new());

        shell(&runner)
            .sh("cargo test\n  --release\n  -- --nocapture")
            .unwrap();

        let spec = runner.last().unwrap();
        assert_eq!(spec.program, "cargo");
        assert_eq!(spec.args, vec!["test", "--release", "--", "--nocapture"]);
        assert_eq!(spec.cwd, PathBuf::from("/project"));
    }

    #[test]
    fn given_quoted_words_when_sh_then_kept_together() {
        let runner = Arc::new(RecordingRunner::new());

        shell(&runner).sh("echo 'my dir/file' \"a b\"").unwrap();

        assert_eq!(runner.last().unwrap().args, vec!["my dir/file", "a b"]);
    }

    #[test]
    fn given_env_layers_when_sh_with_then_call_overrides_shell_env() {
        let runner = Arc::new(RecordingRunner::new());
        let shell = shell(&runner).with_env(BTreeMap::from([
            ("A".to_string(), "base".to_string()),
            ("B".to_string(), "base".to_string()),
        ]));

        shell
            .sh_with("true", [("B", "call"), ("C", "call")], RunOptions::default())
            .unwrap();

        let env = runner.last().unwrap().env;
        assert_eq!(env["A"], "base");
        assert_eq!(env["B"], "call");
        assert_eq!(env["C"], "call");
    }

    #[test]
    fn given_cwd_option_when_sh_with_then_overrides_root() {
        let runner = Arc::new(RecordingRunner::new());

        shell(&runner)
            .sh_with(
                "ls",
                Vec::<(String, String)>::new(),
                RunOptions::default().cwd("/elsewhere"),
            )
            .unwrap();

        assert_eq!(runner.last().unwrap().cwd, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn given_nonzero_exit_when_sh_then_command_failed() {
        let runner = Arc::new(RecordingRunner::new().fail_on("cargo clippy", 101));

        let err = shell(&runner).sh("cargo clippy").unwrap_err();

        match err {
            ApplicationError::CommandFailed { command, code, .. } => {
                assert_eq!(command, "cargo clippy");
                assert_eq!(code, Some(101));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_unchecked_when_nonzero_exit_then_returns_output() {
        let runner = Arc::new(RecordingRunner::new().fail_on("false", 1));

        let out = shell(&runner)
            .sh_with(
                "false",
                Vec::<(String, String)>::new(),
                RunOptions::default().unchecked(),
            )
            .unwrap();

        assert_eq!(out.code, Some(1));
    }

    #[rstest]
    #[case("")]
    #[case("  \n ")]
    fn given_blank_command_when_sh_then_empty_command(#[case] command: &str) {
        let runner = Arc::new(RecordingRunner::new());
        assert!(matches!(
            shell(&runner).sh(command),
            Err(ApplicationError::EmptyCommand)
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn given_unbalanced_quote_when_sh_then_tokenize_error_and_no_spawn() {
        let runner = Arc::new(RecordingRunner::new());
        assert!(matches!(
            shell(&runner).sh("echo 'oops"),
            Err(ApplicationError::Tokenize { .. })
        ));
        assert!(runner.calls().is_empty());
    }

    #[rstest]
    #[case("my dir/file")]
    #[case("plain")]
    #[case("it's")]
    #[case("$HOME `x` \"q\"")]
    #[case("")]
    fn given_value_when_quote_then_split_round_trips(#[case] value: &str) {
        let words = split(&quote(value)).unwrap();
        assert_eq!(words, vec![value.to_string()]);
    }

    #[test]
    fn given_non_string_value_when_quote_then_uses_display() {
        assert_eq!(quote(42), "42");
        let quoted = quote(Path::new("/tmp/a b").display());
        assert_eq!(split(&quoted).unwrap(), vec!["/tmp/a b".to_string()]);
    }

    #[test]
    fn given_nul_byte_when_quote_then_falls_back_to_single_quotes() {
        assert_eq!(quote("a\0b"), "'a\0b'");
    }
}
