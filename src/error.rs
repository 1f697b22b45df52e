//! Error types for the docrawl crate

use thiserror::Error;

/// Result type for docrawl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for docrawl operations
#[derive(Debug, Error)]
pub enum Error {
    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Headless browser error
    #[error("Browser error: {0}")]
    Browser(String),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration or request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
