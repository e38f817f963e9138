//! Error types for yardkeep-sync

use thiserror::Error;

use yardkeep_core::InventoryError;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while talking to the remote list store
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request never produced a response (connect failure, timeout)
    #[error("Transport error ({context}): {message}")]
    Transport {
        context: String,
        message: String,
        timed_out: bool,
    },

    /// The remote answered with a non-success status
    #[error("HTTP {status} from {context}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    /// No access token in the identity response
    #[error("Could not retrieve access token: {0}")]
    Auth(String),

    /// No write digest in the context info response
    #[error("Could not get form digest: {0}")]
    Digest(String),

    /// No entity type in the list metadata response
    #[error("Could not fetch entity type for '{list}': {message}")]
    Schema { list: String, message: String },

    /// A success response without the expected shape
    #[error("Unexpected response from {context}: {message}")]
    Response { context: String, message: String },

    /// Part not found locally
    #[error("Part not found: {0}")]
    NotFound(String),

    /// Local record was never synced
    #[error("Local record for '{0}' has no remote id; cannot update it remotely")]
    MissingRemoteId(String),

    /// Part number already present locally
    #[error("Inventory already has part number '{0}'")]
    Duplicate(String),

    /// Millisecond timestamp outside the representable range
    #[error("Timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// Bad or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local inventory failure
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
}

impl SyncError {
    pub(crate) fn transport(context: &str, err: reqwest::Error) -> Self {
        SyncError::Transport {
            context: context.to_string(),
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    /// Failures worth retrying later: timeouts and server-side errors
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport { .. } => true,
            SyncError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
