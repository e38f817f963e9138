//! Error types for yardkeep-core

use thiserror::Error;

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Main error type for inventory operations
#[derive(Error, Debug)]
pub enum InventoryError {
    /// A mandatory field was absent or had the wrong shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed part does not exist in the snapshot
    #[error("Not found: {0}")]
    NotFound(String),

    /// A part with this number already exists
    #[error("Duplicate part number: {0}")]
    Duplicate(String),

    /// Reading or writing a collection failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    pub fn missing_fields() -> Self {
        InventoryError::Validation("Missing required fields".to_string())
    }
}

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
