mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::inspect::{handle_inspect, InspectArgs};
use commands::preprocess::{handle_preprocess, PreprocessArgs};
use commands::route::{handle_route, RouteArgs};

/// Exit code used when a query has no route.
const EXIT_NO_ROUTE: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline route finding over GeoJSON line networks")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a routing graph from a GeoJSON network and store it.
    Preprocess(PreprocessArgs),
    /// Find the cheapest route between two coordinates.
    Route(RouteArgs),
    /// Print statistics about a stored routing graph.
    Inspect(InspectArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Preprocess(args) => handle_preprocess(&args)?,
        Command::Route(args) => {
            if !handle_route(&args)? {
                return Ok(ExitCode::from(EXIT_NO_ROUTE));
            }
        }
        Command::Inspect(args) => handle_inspect(&args)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
