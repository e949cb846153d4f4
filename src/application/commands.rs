//! Task commands for this repository
//!
//! Each command is a plain function; [`registry`] binds them together with
//! their subcommand options and argument declarations. Argument decorators
//! are listed in the order the arguments appear on the command line.

use std::io;

use tracing::{info, instrument};

use crate::application::services::quote;
use crate::application::{ApplicationError, ApplicationResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{arg, cmd, effect, ArgSpec, CommandOptions, Invocation, Nargs, Registry};
use crate::infrastructure::Context;

/// Signature shared by every command handler.
pub type CommandFn = fn(&Context, &Invocation) -> ApplicationResult<()>;

/// Registry of command handlers.
pub type CommandRegistry = Registry<CommandFn>;

/// Attribute set on commands a generic `test` sweep must not pick up.
///
/// Informational only: dispatch never reads it. It stays in the metadata for
/// tooling that inspects the registry.
pub const COLLECT_ATTR: &str = "collect";

/// Build the command table. Called once, at startup.
pub fn registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();

    reg.define(
        "precommit",
        precommit,
        [cmd(CommandOptions::new().about("Run format, check and test"))],
    );

    reg.define(
        "format",
        format,
        [
            cmd(CommandOptions::new().about("Format sources with rustfmt").alias("fmt")),
            arg(ArgSpec::new(["--check"]).flag().help("Report unformatted files, change nothing")),
        ],
    );

    reg.define(
        "check",
        check,
        [
            cmd(CommandOptions::new().about("Type-check and lint (cargo check, cargo clippy)")),
            arg(ArgSpec::new(["--all-targets"]).flag().help("Include tests, benches and examples")),
        ],
    );

    reg.define(
        "test",
        test,
        [
            cmd(CommandOptions::new().about("Run the test suite")),
            effect(|meta| {
                meta.attrs
                    .entry(COLLECT_ATTR.to_string())
                    .or_insert_with(|| "false".to_string());
            }),
            arg(ArgSpec::new(["filter"])
                .nargs(Nargs::Optional)
                .help("Only run tests whose name contains this string")),
            arg(ArgSpec::new(["-r", "--release"]).flag().help("Build in release mode")),
            arg(ArgSpec::new(["args"])
                .nargs(Nargs::Remainder)
                .value_name("TEST_ARGS")
                .help("Arguments passed to the test binaries (after --)")),
        ],
    );

    reg.define(
        "doc",
        doc,
        [
            cmd(CommandOptions::new().about("Build the documentation")),
            arg(ArgSpec::new(["--open"]).flag().help("Open the docs in a browser")),
        ],
    );

    reg.define(
        "config",
        config,
        [
            cmd(CommandOptions::new().about("Show the effective settings")),
            arg(ArgSpec::new(["--template"])
                .flag()
                .help("Print a commented config template instead")),
        ],
    );

    reg.define(
        "completion",
        completion,
        [
            cmd(CommandOptions::new().about("Generate shell completions")),
            arg(ArgSpec::new(["shell"])
                .choices(["bash", "elvish", "fish", "powershell", "zsh"])
                .help("Shell type")),
        ],
    );

    reg
}

fn cargo(ctx: &Context) -> String {
    quote(&ctx.settings.cargo)
}

/// format, check and test with default arguments; stops at the first failure.
#[instrument(skip_all)]
pub fn precommit(ctx: &Context, _inv: &Invocation) -> ApplicationResult<()> {
    let defaults = Invocation::default();
    format(ctx, &defaults)?;
    check(ctx, &defaults)?;
    test(ctx, &defaults)?;
    output::success("precommit passed");
    Ok(())
}

#[instrument(skip_all)]
pub fn format(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    let mut line = format!("{} fmt", cargo(ctx));
    if inv.flag("check") {
        line.push_str(" --check");
    }
    ctx.shell.sh(&line)?;
    Ok(())
}

#[instrument(skip_all)]
pub fn check(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    let targets = if inv.flag("all_targets") {
        " --all-targets"
    } else {
        ""
    };
    ctx.shell.sh(&format!("{} check{}", cargo(ctx), targets))?;
    ctx.shell.sh(&format!("{} clippy{}", cargo(ctx), targets))?;
    Ok(())
}

#[instrument(skip_all)]
pub fn test(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    let mut line = format!("{} test", cargo(ctx));
    if inv.flag("release") {
        line.push_str(" --release");
    }
    if let Some(filter) = inv.str("filter") {
        line.push(' ');
        line.push_str(&quote(filter));
    }
    let passthrough = inv.list("args");
    if !passthrough.is_empty() {
        line.push_str(" --");
        for a in passthrough {
            line.push(' ');
            line.push_str(&quote(a));
        }
    }
    ctx.shell.sh(&line)?;
    Ok(())
}

#[instrument(skip_all)]
pub fn doc(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    let open = if inv.flag("open") { " --open" } else { "" };
    ctx.shell.sh(&format!("{} doc{}", cargo(ctx), open))?;
    Ok(())
}

pub fn config(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    if inv.flag("template") {
        output::info(&Settings::template());
    } else {
        info!("config: project root {}", ctx.shell.root().display());
        output::info(&ctx.settings.to_toml()?);
    }
    Ok(())
}

pub fn completion(ctx: &Context, inv: &Invocation) -> ApplicationResult<()> {
    let shell: clap_complete::Shell = inv
        .str("shell")
        .ok_or_else(|| ApplicationError::InvalidArgument("missing shell".into()))?
        .parse()
        .map_err(ApplicationError::InvalidArgument)?;

    let mut cli = ctx.cli.clone();
    let name = cli.get_name().to_string();
    eprintln!("Generating completion file for {shell:?}...");
    clap_complete::generate(shell, &mut cli, name, &mut io::stdout());
    Ok(())
}
