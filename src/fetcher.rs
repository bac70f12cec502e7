//! HTTP fetcher for downloading rule list sources.

use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SecureString;
use crate::error::{Error, Result};

const RETRY_DELAY_MS: u64 = 2000;

/// Maximum size per source download (10 MB)
const MAX_SOURCE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum total size for all downloads combined (100 MB)
const MAX_TOTAL_SIZE: usize = 100 * 1024 * 1024;

/// HTTP client for fetching rule list sources.
///
/// Shared across all tasks in a run; the cumulative size counter spans the
/// whole run, not a single task.
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    /// Optional bearer credential, attached opportunistically to every
    /// request. Absence falls back to unauthenticated requests.
    token: SecureString,
    /// Cumulative download size tracker (thread-safe for concurrent fetches)
    total_downloaded: AtomicUsize,
}

impl Fetcher {
    /// Create a new fetcher.
    ///
    /// `timeout_secs` applies independently to each attempt.
    pub fn new(timeout_secs: u64, max_retries: u32, token: SecureString) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(format!("rulegen/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_retries,
            token,
            total_downloaded: AtomicUsize::new(0),
        })
    }

    /// Get the total bytes downloaded so far.
    pub fn total_downloaded(&self) -> usize {
        self.total_downloaded.load(Ordering::Relaxed)
    }

    /// Fetch one URL with retry and size validation.
    ///
    /// Retries with exponential backoff up to `max_retries` attempts. A
    /// final failure is a `Download` error, fatal to the owning task only.
    /// Nothing is persisted on failure.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut last_error: Option<String> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = RETRY_DELAY_MS * (1 << (attempt - 1));
                debug!("Retry {} after {}ms for {}", attempt, delay, url);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let mut request = self.client.get(url);
            if !self.token.is_empty() {
                request = request.bearer_auth(self.token.as_str());
            }

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        if let Some(content_length) = response.content_length() {
                            if content_length as usize > MAX_SOURCE_SIZE {
                                return Err(Error::download(
                                    url,
                                    format!(
                                        "response too large: {} bytes (max: {} bytes)",
                                        content_length, MAX_SOURCE_SIZE
                                    ),
                                ));
                            }
                        }

                        let body = match response.text().await {
                            Ok(body) => body,
                            Err(e) => {
                                last_error = Some(format!("failed to read body: {e}"));
                                continue;
                            }
                        };

                        // Double-check actual size after download
                        if body.len() > MAX_SOURCE_SIZE {
                            return Err(Error::download(
                                url,
                                format!(
                                    "downloaded content too large: {} bytes (max: {} bytes)",
                                    body.len(),
                                    MAX_SOURCE_SIZE
                                ),
                            ));
                        }

                        let new_total = self
                            .total_downloaded
                            .fetch_add(body.len(), Ordering::Relaxed)
                            + body.len();
                        if new_total > MAX_TOTAL_SIZE {
                            return Err(Error::download(
                                url,
                                format!(
                                    "cumulative download limit exceeded: {} bytes (max: {} bytes)",
                                    new_total, MAX_TOTAL_SIZE
                                ),
                            ));
                        }

                        if body.is_empty() {
                            warn!("Empty response body from {}", url);
                        }

                        return Ok(body);
                    }
                    last_error = Some(format!("HTTP {}", response.status()));
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(Error::download(
            url,
            last_error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}
