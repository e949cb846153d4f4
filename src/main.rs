use std::process;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use xtask::application::registry;
use xtask::cli::{output, Cli, CliError};
use xtask::config::{self, Settings};
use xtask::exitcode;
use xtask::infrastructure::Context;

fn main() {
    let registry = registry();
    let cli = Cli::build(&registry).unwrap_or_else(|e| {
        output::error(&e);
        process::exit(exitcode::SOFTWARE);
    });

    let parsed = match cli.parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(CliError::Parse(e)) => e.exit(),
        Err(e) => {
            output::error(&e);
            process::exit(e.exit_code());
        }
    };

    setup_logging(parsed.verbosity);

    let settings = Settings::load(&config::default_project_root()).unwrap_or_else(|e| {
        output::error(&e);
        process::exit(CliError::from(e).exit_code());
    });
    let ctx = Context::new(settings, cli.command().clone());

    if let Err(e) = cli.dispatch(&ctx, parsed.invocation) {
        output::error(&e);
        process::exit(e.exit_code());
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
