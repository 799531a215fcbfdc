//! SkyReplay Core - Spatiotemporal Flight Replay Engine
//!
//! Turns recorded aircraft tracks into a per-frame render description:
//! 1. **Scene geometry**: equirectangular projection anchored to one shared bounding box
//! 2. **Time alignment**: nearest-by-time lookup for playback and cross-track proximity
//! 3. **Presentation state**: playback, smoothed follow camera, highlight jump-to, basemap ground

pub mod basemap;
pub mod bounds;
pub mod camera;
pub mod config;
pub mod error;
pub mod highlight;
pub mod kinematics;
pub mod playback;
pub mod projection;
pub mod proximity;
pub mod report;
pub mod session;
pub mod timeline;
pub mod track;

// Re-export key types for convenience
pub use basemap::{BasemapBridge, BasemapHandle, BasemapRaster, BasemapSource, GroundPlane, GroundSummary};
pub use bounds::{BoundingBox, LatLon};
pub use camera::{AircraftPose, CameraController, CameraMode, CameraState};
pub use config::ReplayConfig;
pub use error::ReplayError;
pub use highlight::{HighlightKind, HighlightOutcome, HighlightRequest, HighlightResolver, Resolution};
pub use kinematics::{Attitude, KinematicEstimator};
pub use playback::{PlaybackController, ReplayState};
pub use projection::{GeoProjector, ScenePoint};
pub use proximity::{PrimaryFix, ProximityEngine, ProximityResult, SeparationThresholds, Severity};
pub use report::{AnomalyReport, ProximityEvent};
pub use session::{FrameSnapshot, HighlightGeometry, ReplaySession, TrackPose};
pub use timeline::{TimeMatch, Timeline};
pub use track::{GeoSample, IngestReport, RawTrack, Track};
