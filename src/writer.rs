//! Atomic persistence of canonical rule text.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::OutputFormat;
use crate::error::{Error, Result};

/// Render canonical lines in the requested output format.
///
/// Text format is one rule per line. Yaml format wraps the rules in a
/// Clash-style `payload:` list. Both end with exactly one final newline.
pub fn render(lines: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = lines.join("\n");
            out.push('\n');
            out
        }
        OutputFormat::Yaml => {
            let mut out = String::from("payload:\n");
            for line in lines {
                out.push_str("  - '");
                // single-quoted YAML scalars escape ' by doubling it
                out.push_str(&line.replace('\'', "''"));
                out.push_str("'\n");
            }
            out
        }
    }
}

/// Write canonical text to `path` atomically (temp file + rename), so a
/// crash mid-write never leaves a truncated artifact.
pub fn write_canonical(path: &Path, lines: &[String], format: OutputFormat) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::Processing(format!(
            "refusing to write empty artifact: {}",
            path.display()
        )));
    }

    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let content = render(lines, format);

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| Error::FileSystem(e.error))?;

    Ok(())
}
