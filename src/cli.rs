//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rulegen",
    about = "Aggregates remote domain/IP rule lists into minimal canonical rulesets",
    version
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, canonicalize and write all configured rulesets
    Generate {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and list the tasks it defines
    Check,

    /// Print version information
    Version,
}
