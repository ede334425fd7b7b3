//! Error types for the cycle tracking core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to collaborators.
///
/// Remote failures are deliberately absent here: the coordinator degrades
/// them to pending-local state and logs an advisory instead of failing the
/// operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any I/O. Message is surfaced verbatim.
    #[error("{0}")]
    Validation(String),

    /// Update target is not in the canonical collection.
    #[error("cycle not found: {0}")]
    NotFound(String),

    /// JSON encode/decode error (export, snapshot serialization)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local cache write error
    #[error("local storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Failures a remote store adapter may surface to the coordinator.
///
/// Exactly two shapes by design: the coordinator treats both the same way
/// (fall back to local-only persistence), so finer distinctions would be
/// unused.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// Network error, timeout, or non-2xx response.
    #[error("transport failure: {message}")]
    Transport { status: Option<u16>, message: String },

    /// Response could not be parsed into cycle rows.
    #[error("shape failure: {0}")]
    Shape(String),
}

impl RemoteStoreError {
    /// Create a transport failure
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Create a shape failure
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }

    /// HTTP status if this failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Shape(_) => None,
        }
    }
}
