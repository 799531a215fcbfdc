//! Error types for the replay driver.

use skyreplay_core::ReplayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Scenario error: {0}")]
    Scenario(String),
}
