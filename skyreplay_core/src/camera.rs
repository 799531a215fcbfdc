//! The Camera Controller: smoothed follow camera with orbit and chase modes.
//!
//! - **Orbit**: only the look-at target chases the aircraft; the eye position
//!   belongs to the user's orbit drag.
//! - **Chase**: the eye trails behind and above the aircraft along its
//!   heading, the target tracks the aircraft. Position lerps slower than the
//!   target so fast turns don't jitter the view.
//!
//! Switching modes snaps straight to the new mode's desired pose instead of
//! interpolating from the previous mode's camera.

use crate::config::CameraConfig;
use crate::projection::ScenePoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Orbit,
    Chase,
}

impl std::str::FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orbit" => Ok(CameraMode::Orbit),
            "chase" => Ok(CameraMode::Chase),
            other => Err(format!("unknown camera mode '{}' (expected orbit|chase)", other)),
        }
    }
}

/// The aircraft's scene-space pose for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftPose {
    pub position: ScenePoint,
    pub heading_deg: f64,
    pub pitch_deg: f64,
}

/// What the renderer reads each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub mode: CameraMode,
    pub position: ScenePoint,
    pub target: ScenePoint,
}

/// Owns and mutates [`CameraState`]; nothing else does.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    auto_follow: bool,

    /// Highlight override for the look-at target
    pinned_target: Option<ScenePoint>,

    /// Mode changed while auto-follow was off; snap on the next followed update
    pending_snap: bool,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let [x, y, z] = config.initial_position;
        Self {
            state: CameraState {
                mode: CameraMode::Orbit,
                position: ScenePoint::new(x, y, z),
                target: ScenePoint::zeros(),
            },
            auto_follow: config.auto_follow,
            pinned_target: None,
            pending_snap: false,
            config,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn mode(&self) -> CameraMode {
        self.state.mode
    }

    pub fn auto_follow(&self) -> bool {
        self.auto_follow
    }

    pub fn pinned_target(&self) -> Option<ScenePoint> {
        self.pinned_target
    }

    /// With auto-follow off the controller leaves the camera entirely alone.
    pub fn set_auto_follow(&mut self, enabled: bool) {
        self.auto_follow = enabled;
    }

    /// Overrides (or with `None`, releases) the look-at target.
    pub fn pin_target(&mut self, target: Option<ScenePoint>) {
        self.pinned_target = target;
    }

    /// User orbit drag / manual placement. Ignored while chase owns the eye.
    pub fn set_user_position(&mut self, position: ScenePoint) {
        if self.state.mode == CameraMode::Orbit || !self.auto_follow {
            self.state.position = position;
        }
    }

    /// Switches mode, snapping to the new mode's desired pose.
    pub fn set_mode(&mut self, mode: CameraMode, pose: &AircraftPose) {
        if mode == self.state.mode {
            return;
        }
        self.state.mode = mode;
        if self.auto_follow {
            self.snap(pose);
        } else {
            self.pending_snap = true;
        }
    }

    /// Per-frame smoothing step toward the aircraft.
    pub fn update(&mut self, pose: &AircraftPose) {
        if !self.auto_follow {
            return;
        }
        if self.pending_snap {
            self.snap(pose);
            return;
        }

        let target = self.desired_target(pose);
        match self.state.mode {
            CameraMode::Orbit => {
                self.state.target = lerp(&self.state.target, &target, self.config.orbit_target_lerp);
            }
            CameraMode::Chase => {
                let eye = self.chase_position(pose);
                self.state.position = lerp(&self.state.position, &eye, self.config.chase_position_lerp);
                self.state.target = lerp(&self.state.target, &target, self.config.chase_target_lerp);
            }
        }
    }

    /// Where the chase eye wants to be: behind along heading, then up.
    pub fn chase_position(&self, pose: &AircraftPose) -> ScenePoint {
        let heading = pose.heading_deg.to_radians();
        // north is -z, east is +x
        let forward = ScenePoint::new(heading.sin(), 0.0, -heading.cos());
        let up = ScenePoint::new(0.0, 1.0, 0.0);
        pose.position - forward * self.config.chase_distance_km + up * self.config.chase_height_km
    }

    fn snap(&mut self, pose: &AircraftPose) {
        self.pending_snap = false;
        self.state.target = self.desired_target(pose);
        if self.state.mode == CameraMode::Chase {
            self.state.position = self.chase_position(pose);
        }
    }

    fn desired_target(&self, pose: &AircraftPose) -> ScenePoint {
        self.pinned_target.unwrap_or(pose.position)
    }
}

#[inline]
fn lerp(from: &ScenePoint, to: &ScenePoint, factor: f64) -> ScenePoint {
    from + (to - from) * factor.clamp(0.0, 1.0)
}
