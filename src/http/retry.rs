//! Retry logic for network operations with error classification.

use reqwest::StatusCode;

/// Maximum number of retry attempts for network operations.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that should not be retried.
#[derive(Debug, thiserror::Error)]
pub enum NonRetryableError {
    /// HTTP 429
    #[error("Rate limited: {0}. Try again later.")]
    RateLimited(String),
    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),
    /// HTTP 401/403, commonly returned to non-browser clients
    #[error("Access forbidden: {0}")]
    Forbidden(String),
    /// Other 4xx errors that won't succeed on retry
    #[error("Request error: {0}")]
    ClientError(String),
    /// The payload is larger than the configured download limit
    #[error("Payload exceeds the download limit of {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    if let Some(status) = error.status() {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(NonRetryableError::Forbidden(format!(
                    "HTTP {} from {}",
                    status.as_u16(),
                    url_of(error)
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(NonRetryableError::RateLimited(url_of(error)));
            }
            StatusCode::NOT_FOUND => {
                return Err(NonRetryableError::NotFound(url_of(error)));
            }
            s if s.is_client_error() => {
                return Err(NonRetryableError::ClientError(format!(
                    "HTTP {} error",
                    s.as_u16()
                )));
            }
            // 5xx server errors are retryable
            _ => {}
        }
    }

    // Connection errors, timeouts, etc. are retryable
    Ok(())
}

/// Checks if an error from `error_for_status()` should be retried.
/// Returns the original error if retryable, or a NonRetryableError if not.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

fn url_of(error: &reqwest::Error) -> String {
    error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "the requested resource".to_string())
}
