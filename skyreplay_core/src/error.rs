//! Error types for the replay engine.
//!
//! Only genuine misuse or total absence of data crosses the public API as an
//! error. Everything else (missing optional fields, out-of-range seeks, stale
//! proximity alignment, basemap failures) degrades silently.

use thiserror::Error;

/// Errors surfaced by ingestion and session construction.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// No track carried a single usable sample
    #[error("No usable track data")]
    NoData,

    /// The requested track is not part of this session
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    /// Two tracks in one session share an id
    #[error("Duplicate track id: {0}")]
    DuplicateTrack(String),

    /// A track had samples, but none survived validation
    #[error("Track {0} has no valid samples")]
    EmptyTrack(String),

    /// Upstream payload could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ReplayError {
    /// Creates an unknown-track error.
    pub fn unknown(track_id: impl Into<String>) -> Self {
        Self::UnknownTrack(track_id.into())
    }

    /// True when the UI should show its "no data" state.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData | Self::EmptyTrack(_))
    }
}
