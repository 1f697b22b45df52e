//! Error types for the store module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for persistence operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data conversion error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization error for persisted columns
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for CrateError {
    fn from(err: StoreError) -> Self {
        CrateError::Store(err.to_string())
    }
}
