//! Check command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

/// Validate the configuration file and print the task overview.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    println!("Configuration OK: {} task(s)", config.tasks.len());
    for (name, task) in &config.tasks {
        println!(
            "  {} ({}, {} source(s){})",
            name,
            task.kind,
            task.sources.len(),
            if task.compile { ", compiled" } else { "" }
        );
    }

    if config.converter.binary.is_none() {
        let compiling = config.tasks.values().filter(|t| t.compile).count();
        if compiling > 0 {
            println!(
                "note: {} task(s) request compilation but no converter binary is configured",
                compiling
            );
        }
    }

    Ok(())
}
