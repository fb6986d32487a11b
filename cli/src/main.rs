mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{moran, weights};
use tracing_subscriber::EnvFilter;

/// Log to stderr; `-v` raises the default level, `RUST_LOG` overrides it.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("geomoran={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Weights(args) => weights::run(&cli, args),
        Commands::Moran(args) => moran::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
