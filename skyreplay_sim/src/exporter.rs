//! JSON exporter for replay frames.
//!
//! Flattens each [`FrameSnapshot`] into plain numbers so an external viewer
//! can redraw the replay without linking the engine.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use skyreplay_core::proximity::{SeparationThresholds, Severity};
use skyreplay_core::{CameraMode, FrameSnapshot, GroundSummary, TrackPose};
use std::fs::File;
use std::io::Write;

/// A single exported frame.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayFrame {
    /// Virtual time in seconds
    pub time_sec: f64,

    pub frame: u64,
    pub index: usize,
    pub is_playing: bool,
    pub primary: PosePoint,
    pub secondaries: Vec<PosePoint>,
    pub proximity: Vec<ProximityRecord>,
    pub camera: CameraRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_index: Option<usize>,

    pub ground: GroundSummary,

    /// Ground plane width and depth, km
    pub ground_extent_km: [f64; 2],
}

/// Scene position and attitude of one aircraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosePoint {
    pub track_id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading_deg: f64,
    pub pitch_deg: f64,
    pub aligned: bool,
}

impl PosePoint {
    pub fn new(pose: &TrackPose) -> Self {
        Self {
            track_id: pose.track_id.clone(),
            label: pose.label.clone(),
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
            heading_deg: pose.heading_deg,
            pitch_deg: pose.pitch_deg,
            aligned: pose.aligned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProximityRecord {
    pub track_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_nm: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_ft: Option<f64>,

    pub time_error_sec: f64,
    pub in_range: bool,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraRecord {
    pub mode: CameraMode,
    pub position: [f64; 3],
    pub target: [f64; 3],
}

impl ReplayFrame {
    pub fn from_snapshot(snapshot: &FrameSnapshot, time_sec: f64, thresholds: &SeparationThresholds) -> Self {
        let xyz = |v: &Vector3<f64>| [v.x, v.y, v.z];
        Self {
            time_sec,
            frame: snapshot.frame,
            index: snapshot.replay.current_index,
            is_playing: snapshot.replay.is_playing,
            primary: PosePoint::new(&snapshot.primary_pose),
            secondaries: snapshot.secondary_poses.iter().map(PosePoint::new).collect(),
            proximity: snapshot
                .proximity
                .iter()
                .map(|r| ProximityRecord {
                    track_id: r.track_id.clone(),
                    horizontal_nm: r.horizontal_distance_nm,
                    vertical_ft: r.vertical_distance_ft,
                    time_error_sec: r.time_alignment_error_sec,
                    in_range: r.in_range,
                    severity: Severity::classify(r, thresholds),
                })
                .collect(),
            camera: CameraRecord {
                mode: snapshot.camera.mode,
                position: xyz(&snapshot.camera.position),
                target: xyz(&snapshot.camera.target),
            },
            highlight_index: snapshot.highlight.as_ref().map(|h| h.index),
            ground: snapshot.ground.summary(),
            ground_extent_km: [snapshot.ground_extent_km.0, snapshot.ground_extent_km.1],
        }
    }
}

/// Complete replay export.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<ReplayFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_separation_nm: Option<f64>,
}

impl ReplayExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            min_separation_nm: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: ReplayFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, min_separation_nm: Option<f64>) {
        self.passed = passed;
        self.min_separation_nm = min_separation_nm;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
