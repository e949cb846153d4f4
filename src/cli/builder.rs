//! CLI assembly from the command registry, parsing and dispatch
//!
//! Three phases, run once per process:
//! 1. Discovery: registry bindings with command metadata, sorted by name
//! 2. Assembly: one clap subcommand per binding, arguments in declaration order
//! 3. Dispatch: parse into an [`Invocation`], take the handler key, call it
//!    (or print help when no subcommand was given)

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, ValueParser};
use clap::{Arg, ArgMatches, Command};
use tracing::{debug, instrument};

use crate::application::{CommandFn, CommandRegistry};
use crate::domain::{
    ArgAction, ArgSpec, ArgValue, Binding, DomainError, DomainResult, Invocation, Metadata, Nargs,
    ValueKind,
};
use crate::cli::{CliError, CliResult};
use crate::infrastructure::{Context, InfraError};

/// Name of the binary and the root command.
pub const BIN_NAME: &str = "x";

const DEBUG_ARG: &str = "debug";

/// Result of parsing process input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    /// Number of `-d` flags given
    pub verbosity: u8,
    pub invocation: Invocation,
}

/// Assembled command line interface over a registry.
pub struct Cli<'r> {
    registry: &'r CommandRegistry,
    command: Command,
}

impl<'r> Cli<'r> {
    /// Discover registered commands and assemble the clap command tree.
    pub fn build(registry: &'r CommandRegistry) -> DomainResult<Self> {
        let mut command = Command::new(BIN_NAME)
            .about("Development tasks for this repository")
            .version(env!("CARGO_PKG_VERSION"))
            .arg(
                Arg::new(DEBUG_ARG)
                    .short('d')
                    .long("debug")
                    .action(clap::ArgAction::Count)
                    .global(true)
                    .help("Increase log verbosity (-d info, -dd debug, -ddd trace)"),
            );

        for binding in registry.discover() {
            command = command.subcommand(subcommand(binding)?);
        }
        debug!(
            "build: subcommands={:?}",
            command
                .get_subcommands()
                .map(|s| s.get_name())
                .collect::<Vec<_>>()
        );

        Ok(Self { registry, command })
    }

    /// The assembled (unparsed) command tree.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Subcommand names in registration order of the tree.
    pub fn subcommand_names(&self) -> Vec<String> {
        self.command
            .get_subcommands()
            .map(|s| s.get_name().to_string())
            .collect()
    }

    pub fn render_help(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// Parse process input into an invocation record.
    ///
    /// The first item is the program name, as with `std::env::args_os()`.
    pub fn parse_from<I, T>(&self, args: I) -> CliResult<Parsed>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(args)?;
        let verbosity = matches.get_count(DEBUG_ARG);

        let invocation = match matches.subcommand() {
            Some((name, sub_matches)) => {
                let binding = self
                    .registry
                    .get(name)
                    .ok_or_else(|| DomainError::UnknownCommand(name.to_string()))?;
                Invocation::new(
                    Some(binding.name.clone()),
                    collect_values(&binding.metadata, sub_matches),
                )
            }
            None => Invocation::default(),
        };

        Ok(Parsed {
            verbosity,
            invocation,
        })
    }

    /// Run the handler named by the invocation, or print help if there is none.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn dispatch(&self, ctx: &Context, mut invocation: Invocation) -> CliResult<()> {
        match invocation.take_handler() {
            Some(name) => {
                let handler: CommandFn = self.registry.handler(&name)?;
                debug!("dispatch: {}", name);
                handler(ctx, &invocation)?;
                Ok(())
            }
            None => self
                .command
                .clone()
                .print_help()
                .map_err(|e| CliError::from(InfraError::io("print help", e))),
        }
    }

    /// Parse and dispatch in one go.
    pub fn run_from<I, T>(&self, ctx: &Context, args: I) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let parsed = self.parse_from(args)?;
        self.dispatch(ctx, parsed.invocation)
    }
}

fn subcommand(binding: &Binding<CommandFn>) -> DomainResult<Command> {
    let options = binding.metadata.command.clone().unwrap_or_default();
    let mut sub = Command::new(binding.name.clone());

    if let Some(about) = options.about {
        sub = sub.about(about);
    }
    if let Some(long_about) = options.long_about {
        sub = sub.long_about(long_about);
    }
    if !options.aliases.is_empty() {
        sub = sub.visible_aliases(options.aliases);
    }
    if let Some(hide) = options.hide {
        sub = sub.hide(hide);
    }

    let mut taken = reserved_names();
    for spec in binding.metadata.args_in_declaration_order() {
        let arg = clap_arg(&binding.name, spec)?;
        claim_names(&binding.name, &arg, &mut taken)?;
        sub = sub.arg(arg);
    }
    Ok(sub)
}

/// Ids and flags every subcommand already carries: the global `-d/--debug`
/// counter and clap's generated `-h/--help`.
fn reserved_names() -> BTreeSet<String> {
    [
        format!("id {DEBUG_ARG}"),
        format!("--{DEBUG_ARG}"),
        "-d".to_string(),
        "id help".to_string(),
        "--help".to_string(),
        "-h".to_string(),
    ]
    .into_iter()
    .collect()
}

/// Record the id and flags of `arg`; any of them already taken is an error.
fn claim_names(command: &str, arg: &Arg, taken: &mut BTreeSet<String>) -> DomainResult<()> {
    let mut names = vec![format!("id {}", arg.get_id())];
    names.extend(arg.get_long().map(|long| format!("--{long}")));
    names.extend(arg.get_short().map(|short| format!("-{short}")));

    for name in names {
        if !taken.insert(name.clone()) {
            return Err(DomainError::InvalidArgSpec {
                command: command.to_string(),
                reason: format!("{name} is already in use"),
            });
        }
    }
    Ok(())
}

/// Translate one argument declaration into a clap argument.
fn clap_arg(command: &str, spec: &ArgSpec) -> DomainResult<Arg> {
    let invalid = |reason: &str| DomainError::InvalidArgSpec {
        command: command.to_string(),
        reason: format!("{reason}: {:?}", spec.names),
    };

    if spec.names.is_empty() {
        return Err(invalid("no names given"));
    }
    let positional = spec.is_positional();
    if !positional && spec.names.iter().any(|n| !n.starts_with('-')) {
        return Err(invalid("mixes positional and flag names"));
    }
    if positional && spec.names.len() > 1 {
        return Err(invalid("several positional names"));
    }

    let opts = &spec.options;
    let mut arg = Arg::new(spec.dest_key());

    if positional {
        if opts.action == ArgAction::SetTrue {
            return Err(invalid("switches need a flag name"));
        }
        let value_name = opts.value_name.clone().unwrap_or_else(|| spec.names[0].clone());
        arg = arg.value_name(value_name);
    } else {
        if opts.nargs == Nargs::Remainder {
            return Err(invalid("remainder needs a positional name"));
        }
        for name in &spec.names {
            if let Some(long) = name.strip_prefix("--") {
                if long.is_empty() {
                    return Err(invalid("empty long flag"));
                }
                arg = arg.long(long.to_string());
            } else {
                let mut chars = name[1..].chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => arg = arg.short(c),
                    _ => return Err(invalid("short flags take exactly one character")),
                }
            }
        }
        if let Some(value_name) = &opts.value_name {
            arg = arg.value_name(value_name.clone());
        }
    }

    if let Some(help) = &opts.help {
        arg = arg.help(help.clone());
    }

    if opts.action == ArgAction::SetTrue {
        return Ok(arg
            .action(clap::ArgAction::SetTrue)
            .required(opts.required.unwrap_or(false)));
    }

    let action = if opts.action == ArgAction::Append || opts.nargs.is_many() {
        clap::ArgAction::Append
    } else {
        clap::ArgAction::Set
    };
    arg = arg.action(action).value_parser(value_parser(spec));

    arg = match opts.nargs {
        Nargs::One => arg.num_args(1),
        Nargs::Optional if positional => arg.num_args(1),
        Nargs::Optional => arg.num_args(0..=1),
        Nargs::ZeroOrMore => arg.num_args(0..),
        Nargs::OneOrMore => arg.num_args(1..),
        Nargs::Remainder => arg.num_args(0..).last(true),
    };

    if let Some(default) = &opts.default {
        arg = arg.default_value(default.clone());
    }

    // positionals follow argparse: required unless they may be empty
    let required_by_default =
        positional && matches!(opts.nargs, Nargs::One | Nargs::OneOrMore) && opts.default.is_none();
    Ok(arg.required(opts.required.unwrap_or(required_by_default)))
}

fn effective_kind(spec: &ArgSpec) -> ValueKind {
    if spec.options.choices.is_empty() {
        spec.options.kind
    } else {
        ValueKind::Str
    }
}

fn value_parser(spec: &ArgSpec) -> ValueParser {
    if !spec.options.choices.is_empty() {
        return ValueParser::new(PossibleValuesParser::new(spec.options.choices.clone()));
    }
    match spec.options.kind {
        ValueKind::Str => ValueParser::string(),
        ValueKind::Int => ValueParser::new(clap::value_parser!(i64)),
        ValueKind::Path => ValueParser::path_buf(),
    }
}

/// Build the keyword inputs for a handler from its subcommand matches.
fn collect_values(metadata: &Metadata, matches: &ArgMatches) -> BTreeMap<String, ArgValue> {
    let mut values = BTreeMap::new();
    for spec in metadata.args_in_declaration_order() {
        let key = spec.dest_key();
        if let Some(value) = extract(spec, &key, matches) {
            values.insert(key, value);
        }
    }
    values
}

fn extract(spec: &ArgSpec, key: &str, matches: &ArgMatches) -> Option<ArgValue> {
    let opts = &spec.options;
    if opts.action == ArgAction::SetTrue {
        return Some(ArgValue::Flag(matches.get_flag(key)));
    }

    let kind = effective_kind(spec);
    if opts.action == ArgAction::Append || opts.nargs.is_many() {
        let items: Vec<String> = match kind {
            ValueKind::Str => matches
                .get_many::<String>(key)
                .map(|v| v.cloned().collect())
                .unwrap_or_default(),
            ValueKind::Int => matches
                .get_many::<i64>(key)
                .map(|v| v.map(|i| i.to_string()).collect())
                .unwrap_or_default(),
            ValueKind::Path => matches
                .get_many::<PathBuf>(key)
                .map(|v| v.map(|p| p.to_string_lossy().into_owned()).collect())
                .unwrap_or_default(),
        };
        return Some(ArgValue::List(items));
    }

    match kind {
        ValueKind::Str => matches.get_one::<String>(key).cloned().map(ArgValue::Str),
        ValueKind::Int => matches.get_one::<i64>(key).copied().map(ArgValue::Int),
        ValueKind::Path => matches.get_one::<PathBuf>(key).cloned().map(ArgValue::Path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplicationError, ApplicationResult};
    use crate::config::Settings;
    use crate::domain::{arg, cmd, CommandOptions};
    use crate::util::testing::{init_test_setup, RecordingRunner};
    use clap::error::ErrorKind;
    use std::sync::Arc;

    #[ctor::ctor]
    fn init() {
        init_test_setup();
    }

    fn echo_values(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
        let mut line = String::from("echo");
        for (k, v) in inv.values() {
            line.push(' ');
            line.push_str(&crate::application::services::quote(format!("{k}={v:?}")));
        }
        ctx.shell.sh(&line)?;
        Ok(())
    }

    fn fail(_: &Context, _: &Invocation) -> ApplicationResult<()> {
        Err(ApplicationError::command_failed("false", Some(1)))
    }

    fn noop(_: &Context, _: &Invocation) -> ApplicationResult<()> {
        Ok(())
    }

    fn context(cli: &Cli, runner: Arc<RecordingRunner>) -> Context {
        Context::with_deps(Settings::default(), runner, cli.command().clone())
    }

    #[test]
    fn verify_cli() {
        let reg = crate::application::registry();
        let cli = Cli::build(&reg).unwrap();
        cli.command().clone().debug_assert();
    }

    #[test]
    fn given_args_declared_in_source_order_when_build_then_parser_sees_same_order() {
        let mut reg = CommandRegistry::new();
        reg.define(
            "copy",
            noop,
            [
                cmd(CommandOptions::default()),
                arg(ArgSpec::new(["src"])),
                arg(ArgSpec::new(["dst"])),
                arg(ArgSpec::new(["-f", "--force"]).flag()),
            ],
        );

        let cli = Cli::build(&reg).unwrap();
        let sub = cli.command().find_subcommand("copy").unwrap();
        let ids: Vec<_> = sub.get_arguments().map(|a| a.get_id().to_string()).collect();
        assert_eq!(ids, vec!["src", "dst", "force"]);

        let parsed = cli.parse_from(["x", "copy", "a", "b", "-f"]).unwrap();
        assert_eq!(parsed.invocation.str("src"), Some("a"));
        assert_eq!(parsed.invocation.str("dst"), Some("b"));
        assert!(parsed.invocation.flag("force"));
    }

    #[test]
    fn given_cmd_with_default_options_when_help_requested_then_displays_help() {
        let mut reg = CommandRegistry::new();
        reg.define("plain", noop, [cmd(CommandOptions::default())]);
        let cli = Cli::build(&reg).unwrap();

        let err = cli.parse_from(["x", "plain", "--help"]).unwrap_err();

        match err {
            CliError::Parse(e) => {
                assert_eq!(e.kind(), ErrorKind::DisplayHelp);
                assert_eq!(e.exit_code(), 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_commands_registered_b_a_c_when_build_then_listed_a_b_c() {
        let mut reg = CommandRegistry::new();
        for name in ["b", "a", "c"] {
            reg.define(name, noop, [cmd(CommandOptions::default())]);
        }

        let cli = Cli::build(&reg).unwrap();

        assert_eq!(cli.subcommand_names(), vec!["a", "b", "c"]);
        let help = cli.render_help();
        let (a, b, c) = (
            help.find("  a").unwrap(),
            help.find("  b").unwrap(),
            help.find("  c").unwrap(),
        );
        assert!(a < b && b < c, "help lists commands alphabetically:\n{help}");
    }

    #[test]
    fn given_no_arguments_when_run_then_prints_help_and_succeeds() {
        let reg = crate::application::registry();
        let cli = Cli::build(&reg).unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let ctx = context(&cli, runner.clone());

        let parsed = cli.parse_from(["x"]).unwrap();
        assert_eq!(parsed.invocation.handler(), None);

        cli.dispatch(&ctx, parsed.invocation).unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn given_unknown_subcommand_when_parse_then_nonzero_exit() {
        let reg = crate::application::registry();
        let cli = Cli::build(&reg).unwrap();

        let err = cli.parse_from(["x", "no-such-command"]).unwrap_err();

        assert_ne!(err.exit_code(), 0);
        assert!(matches!(err, CliError::Parse(ref e) if e.kind() == ErrorKind::InvalidSubcommand));
    }

    #[test]
    fn given_debug_flags_when_parse_then_counts_verbosity() {
        let reg = crate::application::registry();
        let cli = Cli::build(&reg).unwrap();

        assert_eq!(cli.parse_from(["x", "-dd"]).unwrap().verbosity, 2);
        assert_eq!(cli.parse_from(["x", "doc", "-d"]).unwrap().verbosity, 1);
    }

    #[test]
    fn given_typed_args_when_dispatch_then_handler_receives_values() {
        let mut reg = CommandRegistry::new();
        reg.define(
            "show",
            echo_values,
            [
                cmd(CommandOptions::new().about("Show parsed values").alias("s")),
                arg(ArgSpec::new(["-j", "--jobs"]).kind(ValueKind::Int).default_value("4")),
                arg(ArgSpec::new(["--tag"]).append()),
                arg(ArgSpec::new(["--color"]).choices(["auto", "never"])),
                arg(ArgSpec::new(["files"]).kind(ValueKind::Path).nargs(Nargs::ZeroOrMore)),
            ],
        );
        let cli = Cli::build(&reg).unwrap();

        let parsed = cli
            .parse_from(["x", "s", "--tag", "a", "--tag", "b", "--color", "never", "f1", "f2"])
            .unwrap();
        let inv = &parsed.invocation;

        assert_eq!(inv.handler(), Some("show"));
        assert_eq!(inv.int("jobs"), Some(4));
        assert_eq!(inv.list("tag"), ["a".to_string(), "b".to_string()]);
        assert_eq!(inv.str("color"), Some("never"));
        assert_eq!(inv.list("files"), ["f1".to_string(), "f2".to_string()]);

        let runner = Arc::new(RecordingRunner::new());
        cli.dispatch(&context(&cli, runner.clone()), parsed.invocation)
            .unwrap();
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.command_lines()[0].contains("jobs=Int(4)"));
    }

    #[test]
    fn given_invalid_choice_or_int_when_parse_then_parse_error() {
        let mut reg = CommandRegistry::new();
        reg.define(
            "show",
            noop,
            [
                cmd(CommandOptions::default()),
                arg(ArgSpec::new(["-j"]).kind(ValueKind::Int)),
                arg(ArgSpec::new(["--color"]).choices(["auto", "never"])),
            ],
        );
        let cli = Cli::build(&reg).unwrap();

        assert!(matches!(
            cli.parse_from(["x", "show", "-j", "many"]),
            Err(CliError::Parse(_))
        ));
        assert!(matches!(
            cli.parse_from(["x", "show", "--color", "always"]),
            Err(CliError::Parse(_))
        ));
    }

    #[test]
    fn given_remainder_when_parse_then_collects_after_double_dash() {
        let mut reg = CommandRegistry::new();
        reg.define(
            "run",
            noop,
            [
                cmd(CommandOptions::default()),
                arg(ArgSpec::new(["target"]).nargs(Nargs::Optional)),
                arg(ArgSpec::new(["rest"]).nargs(Nargs::Remainder)),
            ],
        );
        let cli = Cli::build(&reg).unwrap();

        let parsed = cli
            .parse_from(["x", "run", "t", "--", "--nocapture", "-q"])
            .unwrap();

        assert_eq!(parsed.invocation.str("target"), Some("t"));
        assert_eq!(
            parsed.invocation.list("rest"),
            ["--nocapture".to_string(), "-q".to_string()]
        );

        let bare = cli.parse_from(["x", "run"]).unwrap();
        assert_eq!(bare.invocation.str("target"), None);
        assert!(bare.invocation.list("rest").is_empty());
    }

    #[test]
    fn given_missing_required_positional_when_parse_then_parse_error() {
        let mut reg = CommandRegistry::new();
        reg.define(
            "open",
            noop,
            [cmd(CommandOptions::default()), arg(ArgSpec::new(["file"]))],
        );
        let cli = Cli::build(&reg).unwrap();

        let err = cli.parse_from(["x", "open"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[rstest::rstest]
    #[case(vec![ArgSpec::new(Vec::<String>::new())])]
    #[case(vec![ArgSpec::new(["name", "--name"])])]
    #[case(vec![ArgSpec::new(["a", "b"])])]
    #[case(vec![ArgSpec::new(["-ab"])])]
    #[case(vec![ArgSpec::new(["--"])])]
    #[case(vec![ArgSpec::new(["name"]).flag()])]
    #[case(vec![ArgSpec::new(["--rest"]).nargs(Nargs::Remainder)])]
    #[case(vec![ArgSpec::new(["--debug"]).flag()])]
    #[case(vec![ArgSpec::new(["-d"]).dest("dry_run").flag()])]
    #[case(vec![ArgSpec::new(["--help"]).flag()])]
    #[case(vec![ArgSpec::new(["-v"]).flag(), ArgSpec::new(["--v"]).flag()])]
    #[case(vec![
        ArgSpec::new(["-x"]).dest("first"),
        ArgSpec::new(["-x"]).dest("second"),
    ])]
    fn given_malformed_spec_when_build_then_invalid_arg_spec(#[case] specs: Vec<ArgSpec>) {
        let mut reg = CommandRegistry::new();
        reg.define(
            "bad",
            noop,
            std::iter::once(cmd(CommandOptions::default())).chain(specs.into_iter().map(arg)),
        );

        let result = Cli::build(&reg);

        assert!(matches!(
            result,
            Err(DomainError::InvalidArgSpec { ref command, .. }) if command == "bad"
        ));
    }

    #[test]
    fn given_failing_handler_when_dispatch_then_error_propagates() {
        let mut reg = CommandRegistry::new();
        reg.define("boom", fail, [cmd(CommandOptions::default())]);
        let cli = Cli::build(&reg).unwrap();
        let ctx = context(&cli, Arc::new(RecordingRunner::new()));

        let err = cli.run_from(&ctx, ["x", "boom"]).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("false"));
    }

    #[test]
    fn given_args_only_function_when_build_then_not_a_subcommand() {
        let mut reg = CommandRegistry::new();
        reg.define("stray", noop, [arg(ArgSpec::new(["--x"]))]);
        reg.define("real", noop, [cmd(CommandOptions::default())]);

        let cli = Cli::build(&reg).unwrap();

        assert_eq!(cli.subcommand_names(), vec!["real"]);
    }
}
