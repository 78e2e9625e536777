mod accounts;
mod categorizer;
mod cli;
mod columns;
mod error;
mod exporter;
mod filter;
mod fmt;
mod importer;
mod models;
mod pipeline;
mod settings;
mod synthetic;
mod transform;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init { force } => cli::init::run(config, force),
        Commands::Run {
            input,
            output,
            no_archive,
        } => cli::run::run(config, input, output, no_archive),
        Commands::Preview { input, limit } => cli::preview::run(config, input, limit),
        Commands::Accounts => cli::accounts::list(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Without RUST_LOG, only this crate logs.
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
