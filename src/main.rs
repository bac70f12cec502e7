//! rulegen - Canonical ruleset aggregation engine.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use rulegen::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate { json } => rulegen::commands::generate::run(json, &cli.config).await,
        Commands::Check => rulegen::commands::check::run(&cli.config),
        Commands::Version => {
            println!("rulegen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
