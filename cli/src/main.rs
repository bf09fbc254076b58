//! CLI for perfkit
//!
//! Commands:
//! - server: run the collector
//! - capture: pull pprof profiles from a Go process and upload them
//! - session / get: browse what the collector holds
//! - compare: print deltas between profiles of one kind

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod client;
mod commands;
mod output;
mod retry;

#[derive(Parser)]
#[command(name = "perfkit")]
#[command(about = "perfkit - pprof and k6 performance data collector", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the collector server
    #[command(alias = "s")]
    Server(commands::server::ServerArgs),

    /// Capture profiles from a pprof endpoint
    Capture(commands::capture::CaptureArgs),

    /// Inspect sessions
    #[command(subcommand)]
    Session(commands::session::SessionCommand),

    /// Get a profile from a session
    Get(commands::get::GetArgs),

    /// Compare profiles of the same type
    Compare(commands::compare::CompareArgs),

    /// Show the getting started guide
    #[command(alias = "q")]
    Quickstart,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Server(args) => commands::server::run(args, config).await,
        Commands::Capture(args) => commands::capture::run(args, config).await,
        Commands::Session(cmd) => commands::session::run(cmd, config).await,
        Commands::Get(args) => commands::get::run(args, config).await,
        Commands::Compare(args) => commands::compare::run(args, config).await,
        Commands::Quickstart => {
            commands::quickstart::run();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries command output, including raw profile bytes
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
