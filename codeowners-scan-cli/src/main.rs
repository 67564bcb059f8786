use std::process::ExitCode;

use anyhow::Result;
use clap::{builder::BoolishValueParser, ArgAction, Parser, Subcommand, ValueEnum};
use codeowners_scan::ClassifiedResult;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod local;
mod pr;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Log debug output from the scan
    #[arg(
        long,
        global = true,
        env = "ENABLE_DEBUG_LOG",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the changed files of a GitHub pull request and report on it
    Pr(pr::PrArgs),
    /// Scan files in a local checkout
    Local(local::LocalArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Pr(args) => pr::run(args),
        Command::Local(args) => local::run(args),
    }
}

fn init_tracing(debug: bool) {
    let mut directives =
        std::env::var("CODEOWNERS_SCAN_LOG").unwrap_or_else(|_| "info".to_owned());
    if debug {
        directives.push_str(",codeowners_scan=debug,codeowners_scan_cli=debug");
    }
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(debug))
        .with(filter)
        .init();
}

fn render_json(result: &ClassifiedResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Exit code for a finished scan, printing the violation summary if there is one.
fn finish(result: &ClassifiedResult, fail_on_violation: bool) -> ExitCode {
    match result.summary() {
        Some(summary) if fail_on_violation => {
            eprintln!("error: {}", summary);
            ExitCode::FAILURE
        }
        Some(summary) => {
            warn!("{}", summary);
            ExitCode::SUCCESS
        }
        None => ExitCode::SUCCESS,
    }
}
