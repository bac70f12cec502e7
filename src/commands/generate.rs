//! Generate command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info};

use crate::config::Config;
use crate::task::Pipeline;

/// Run the full aggregation pipeline and report per-task outcomes.
pub async fn run(json: bool, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    let task_count = config.tasks.len();
    info!("Generating {} ruleset(s)...", task_count);

    let pipeline = Pipeline::new(config)?;
    let summary = pipeline.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for task in &summary.tasks {
            match &task.error {
                None => {
                    let compiled = match (&task.compiled_artifact, &task.compile_error) {
                        (Some(path), _) => format!(", compiled {}", path.display()),
                        (None, Some(e)) => format!(", compile failed: {}", e),
                        (None, None) => String::new(),
                    };
                    println!(
                        "ok   {} -> {}{}",
                        task.name,
                        task.text_artifact
                            .as_deref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                        compiled
                    );
                }
                Some(e) => println!("FAIL {}: {}", task.name, e),
            }
            for warning in &task.warnings {
                println!("     warning: {}", warning);
            }
        }
    }

    if !summary.all_succeeded() {
        error!("{}/{} task(s) failed", summary.failed(), task_count);
        anyhow::bail!("{} task(s) failed", summary.failed());
    }

    Ok(())
}
