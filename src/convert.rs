//! External converter abstraction for compiled rule-table artifacts.
//!
//! The converter is an opaque external binary (`convert-ruleset` style
//! contract). The trait boundary lets tests substitute a mock that records
//! its inputs instead of spawning a process.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::config::{OutputFormat, RuleKind};
use crate::error::{Error, Result};

#[cfg(test)]
use mockall::automock;

/// Trait for compiling a canonical text artifact into a binary match table.
///
/// Implementations are synchronous; the orchestrator runs them on a
/// blocking thread.
#[cfg_attr(test, automock)]
pub trait Converter: Send + Sync {
    /// Compile `input` (canonical text of the given kind and format) into
    /// a binary artifact at `output`.
    fn convert(
        &self,
        kind: RuleKind,
        format: OutputFormat,
        input: &Path,
        output: &Path,
    ) -> Result<()>;
}

/// Converter that shells out to a configured external binary.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    binary: PathBuf,
}

impl CommandConverter {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl Converter for CommandConverter {
    fn convert(
        &self,
        kind: RuleKind,
        format: OutputFormat,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        if !self.binary.exists() {
            return Err(Error::Conversion(format!(
                "converter binary not found: {}",
                self.binary.display()
            )));
        }

        debug!(
            "Converting {} ({} {}) -> {}",
            input.display(),
            kind,
            format.converter_tag(),
            output.display()
        );

        let result = Command::new(&self.binary)
            .arg("convert-ruleset")
            .arg(kind.converter_tag())
            .arg(format.converter_tag())
            .arg(input)
            .arg(output)
            .output()
            .map_err(|e| Error::Conversion(format!("failed to spawn converter: {e}")))?;

        if !result.status.success() {
            return Err(Error::Conversion(format!(
                "converter exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        // A zero-byte artifact means the converter silently failed
        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(Error::Conversion(format!(
                "converter produced no output at {}",
                output.display()
            )));
        }

        Ok(())
    }
}
