//! Error types for the SkyReplay environment abstraction.

use thiserror::Error;

/// Errors raised by collaborators on the far side of the environment boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// Remote collaborator failed (HTTP error, tile server down, etc.)
    #[error("Source error: {0}")]
    SourceError(String),

    /// Payload could not be decoded into an image or track
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::SourceError(msg.into())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Creates a timeout error from the elapsed budget.
    pub fn timeout(budget: std::time::Duration) -> Self {
        Self::Timeout(budget.as_millis() as u64)
    }
}
