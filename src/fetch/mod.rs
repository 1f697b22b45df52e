//! # Fetch Module
//!
//! Retry/backoff state machine over a [`PageSession`]. Navigation attempts
//! are bounded by a per-attempt timeout and a fixed retry ceiling; the delay
//! between attempts grows strictly with the attempt number so a struggling
//! origin is not hammered.
//!
//! Classification rules:
//!
//! - transport/navigation failures and empty responses are retried
//! - a received HTTP status >= 400 is definitive and never retried
//! - exhausting all retries is a terminal failure with its own error code,
//!   distinct from a single definitive error
//!
//! The state machine is independent of the navigation primitive, so it can
//! be unit-tested against a scripted session without a real browser.

use crate::browser::PageSession;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Error code recorded when the retry budget is exhausted
pub const CODE_MAX_RETRIES: &str = "MAX_RETRIES_EXCEEDED";

/// Error code recorded when a page produced no usable response
pub const CODE_NO_RESPONSE: &str = "NO_RESPONSE";

const EMPTY_RESPONSE: &str = "empty response";

/// Terminal failure for one URL
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin answered with a definitive error status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// All navigation attempts failed
    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Failure reported by the final attempt
        last_error: String,
    },
}

impl FetchError {
    /// Error code stored on the crawl error record.
    pub fn code(&self) -> String {
        match self {
            FetchError::HttpStatus(status) => status.to_string(),
            FetchError::RetriesExhausted { last_error, .. } if last_error == EMPTY_RESPONSE => {
                CODE_NO_RESPONSE.to_string()
            }
            FetchError::RetriesExhausted { .. } => CODE_MAX_RETRIES.to_string(),
        }
    }
}

/// Retry schedule for page navigation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of navigation attempts per URL
    pub max_attempts: u32,

    /// Base backoff; the delay after attempt `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// Linear in the attempt number, so strictly increasing.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Fetch the rendered markup for one URL, applying the retry policy.
///
/// Returns the rendered HTML on success, or a classified terminal failure.
/// Never blocks past `timeout * max_attempts` plus the backoff schedule.
pub async fn fetch_page(
    session: &dyn PageSession,
    url: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=policy.max_attempts {
        match session.navigate(url, timeout).await {
            Ok(status) => {
                if let Some(code) = status.http_status {
                    if code >= 400 {
                        warn!("Definitive HTTP {} for {}", code, url);
                        return Err(FetchError::HttpStatus(code));
                    }
                }
                match session.rendered_html().await {
                    Ok(html) if !html.trim().is_empty() => return Ok(html),
                    Ok(_) => last_error = EMPTY_RESPONSE.to_string(),
                    Err(e) => last_error = e.to_string(),
                }
            }
            Err(e) => last_error = e.to_string(),
        }

        if attempt < policy.max_attempts {
            let delay = policy.backoff_after(attempt);
            debug!(
                "Attempt {}/{} for {} failed ({}), backing off {:?}",
                attempt, policy.max_attempts, url, last_error, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    Err(FetchError::RetriesExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}
