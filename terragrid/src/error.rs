//! Error types for the geodata pipeline.
//!
//! Missing data is not an error: operations return `Ok(None)` for it. The
//! variants here are the failures that travel through the data-op graph.
//! They are `Clone` because a single failed fetch or column computation is
//! handed to every coalesced waiter.

use thiserror::Error;

/// Failures produced while loading or deriving data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// Transport failure or non-success response from a remote endpoint
    #[error("network error: {0}")]
    Network(String),

    /// Payload was short, corrupt or otherwise undecodable
    #[error("decode error: {0}")]
    Decode(String),

    /// Local file system failure
    #[error("I/O error: {0}")]
    Io(String),

    /// A pooled or spawned task panicked or was aborted
    #[error("task failed: {0}")]
    Task(String),
}

impl DataError {
    /// Builds a decode error from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode(cause.to_string())
    }

    /// Returns true if the failure came from the network.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DataError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result of evaluating a data operation: `Ok(None)` means absent.
pub type DataResult<T> = Result<Option<T>, DataError>;
