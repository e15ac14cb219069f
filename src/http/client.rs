//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::io::Write;
use std::time::Duration;

use super::retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable};

/// Some download origins reject anything that does not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Overrides the pause between retry attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Performs a single GET request and returns the response status.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self, url: &str) -> Result<StatusCode> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        Ok(response.status())
    }

    /// Performs a GET request and returns the body as text.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}...", url);

        self.with_retry("GET", || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("Failed to send request")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            response
                .text()
                .await
                .context("Failed to read response body")
        })
        .await
    }

    /// Downloads `url` into the writer produced by `create_writer`, aborting
    /// once more than `max_bytes` would be written.
    /// The request identifies itself as a browser.
    /// Automatically retries on transient errors; a fresh writer is created per attempt.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, max_bytes: u64, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.download_file_once(url, max_bytes, &create_writer).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if e.downcast_ref::<NonRetryableError>().is_some() {
                        return Err(e);
                    }

                    if attempt < MAX_RETRIES {
                        warn!(
                            "Download attempt {}/{} failed ({}), retrying...",
                            attempt, MAX_RETRIES, e
                        );
                        last_error = Some(e);
                        tokio::time::sleep(self.retry_delay).await;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Download failed after {} attempts", MAX_RETRIES)))
    }

    /// Single download attempt without retry.
    async fn download_file_once<W, F>(&self, url: &str, max_bytes: u64, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .context("Failed to start download request")?;

        let mut response = response.error_for_status().map_err(check_retryable)?;

        if let Some(length) = response.content_length()
            && length > max_bytes
        {
            return Err(NonRetryableError::TooLarge { limit: max_bytes }.into());
        }

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            downloaded_bytes += chunk.len() as u64;
            if downloaded_bytes > max_bytes {
                return Err(NonRetryableError::TooLarge { limit: max_bytes }.into());
            }
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
        }
        writer.flush().context("Failed to flush download")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }

    /// Executes an async operation with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.downcast_ref::<NonRetryableError>().is_some() {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if attempt < MAX_RETRIES {
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {:?}...",
                            operation_name, attempt, MAX_RETRIES, e, self.retry_delay
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, MAX_RETRIES)
        }))
    }
}
