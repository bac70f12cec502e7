//! Error types for rulegen.

use thiserror::Error;

/// Pipeline error taxonomy.
///
/// `Config` aborts the whole run before any task starts. `Download` and
/// `Processing` are fatal only to the task that produced them. `Conversion`
/// is fatal only to that task's compiled artifact; the canonical text
/// artifact is still written.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn download(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
