pub mod accounts;
pub mod init;
pub mod preview;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Merge bank statements into one categorized transaction ledger."
)]
pub struct Cli {
    /// Path to the configuration file (default: ~/.config/tally/config.json)
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// The logging verbosity. One of: off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, global = true, default_value_t = LevelFilter::INFO)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter configuration file.
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Import every statement, categorize, export and archive the inputs.
    Run {
        /// Folder holding the statement files (overrides input_folder)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Folder the exports are written to (overrides output_folder)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave the statement files where they are
        #[arg(long = "no-archive")]
        no_archive: bool,
    },
    /// Run the pipeline and print the result without writing anything.
    Preview {
        /// Folder holding the statement files (overrides input_folder)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Number of rows to show
        #[arg(long, default_value = "25")]
        limit: usize,
    },
    /// List the known account families and how each one is read.
    Accounts,
}
