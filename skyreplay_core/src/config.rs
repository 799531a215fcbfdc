//! Engine configuration.
//!
//! Every presentation-tuned constant (vertical exaggeration, pitch scale,
//! lerp factors) lives here rather than in module-level statics, so tests can
//! run the engine under varied parameters. All sections deserialize with
//! defaults, so a partial JSON file is a valid config.

use crate::bounds::BoundingBox;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// PROJECTION
// ============================================================================

/// Geodetic -> scene projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Multiplier applied to altitude after ft -> km conversion (default: 7.0)
    pub vertical_exaggeration: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            vertical_exaggeration: 7.0,
        }
    }
}

// ============================================================================
// SCENE EXTENT
// ============================================================================

/// Scene bounding-box parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    /// Region the baked basemap must always cover
    pub min_region: BoundingBox,

    /// Fraction of the span added on each side after fitting the tracks (default: 0.1)
    pub padding_fraction: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            // Israel / eastern Mediterranean operating area
            min_region: BoundingBox::new(29.5, 33.5, 34.0, 36.0),
            padding_fraction: 0.1,
        }
    }
}

// ============================================================================
// KINEMATICS
// ============================================================================

/// Heading / pitch estimation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Linear vertical-rate -> pitch scale, degrees per ft/min (default: 0.01)
    pub pitch_deg_per_fpm: f64,

    /// Symmetric clamp on the pitch estimate (default: 30°)
    pub max_pitch_deg: f64,

    /// Samples considered on each side for the averaged vertical rate (default: 5)
    pub window: usize,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            pitch_deg_per_fpm: 0.01,
            max_pitch_deg: 30.0,
            window: 5,
        }
    }
}

// ============================================================================
// PROXIMITY
// ============================================================================

/// Proximity alignment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Max |Δt| between the primary instant and a secondary sample (default: 60s)
    pub time_window_sec: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            time_window_sec: 60.0,
        }
    }
}

// ============================================================================
// PLAYBACK
// ============================================================================

/// Playback advancement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Samples advanced per second of wall time at 1× (default: 1.0)
    pub samples_per_second: f64,

    /// Initial speed multiplier (default: 1.0)
    pub initial_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            samples_per_second: 1.0,
            initial_speed: 1.0,
        }
    }
}

// ============================================================================
// CAMERA
// ============================================================================

/// Camera smoothing and chase geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Per-frame lerp factor for the look-at target in orbit mode (default: 0.08)
    pub orbit_target_lerp: f64,

    /// Per-frame lerp factor for the camera position in chase mode (default: 0.06)
    pub chase_position_lerp: f64,

    /// Per-frame lerp factor for the look-at target in chase mode (default: 0.1)
    pub chase_target_lerp: f64,

    /// Distance behind the aircraft in chase mode, km (default: 3.0)
    pub chase_distance_km: f64,

    /// Height above the aircraft in chase mode, km (default: 1.0)
    pub chase_height_km: f64,

    /// Initial camera position for orbit mode, scene km
    pub initial_position: [f64; 3],

    /// Follow the aircraft automatically (default: true)
    pub auto_follow: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_target_lerp: 0.08,
            chase_position_lerp: 0.06,
            chase_target_lerp: 0.1,
            chase_distance_km: 3.0,
            chase_height_km: 1.0,
            initial_position: [0.0, 60.0, 120.0],
            auto_follow: true,
        }
    }
}

// ============================================================================
// BASEMAP
// ============================================================================

/// Basemap bake parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasemapConfig {
    /// Zoom / resolution hint forwarded to the raster source (default: 9)
    pub zoom: u8,

    /// Bake budget before falling back to the grid, ms (default: 8000)
    pub timeout_ms: u64,
}

impl BasemapConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            zoom: 9,
            timeout_ms: 8000,
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Full replay engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub projection: ProjectionConfig,
    pub bounds: BoundsConfig,
    pub kinematics: KinematicsConfig,
    pub proximity: ProximityConfig,
    pub playback: PlaybackConfig,
    pub camera: CameraConfig,
    pub basemap: BasemapConfig,
}

impl ReplayConfig {
    /// Parses a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ReplayConfig::from_json(
            r#"{ "projection": { "vertical_exaggeration": 3.5 }, "camera": { "auto_follow": false } }"#,
        )
        .unwrap();

        assert_eq!(config.projection.vertical_exaggeration, 3.5);
        assert!(!config.camera.auto_follow);
        assert_eq!(config.kinematics, KinematicsConfig::default());
        assert_eq!(config.proximity.time_window_sec, 60.0);
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = ReplayConfig::from_json("{}").unwrap();
        assert_eq!(config, ReplayConfig::default());
    }

    #[test]
    fn test_basemap_timeout() {
        let config = BasemapConfig { zoom: 10, timeout_ms: 250 };
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }
}
