//! The replay session: one frame of the data flow, end to end.
//!
//! A session owns every track, the shared [`BoundingBox`], and each
//! controller. [`ReplaySession::frame`] is called once per rendered frame and
//! runs the stages in a fixed order:
//!
//! 1. apply the pending highlight (may seek, may pin the camera)
//! 2. advance playback
//! 3. read the current index and primary fix **once**
//! 4. kinematics, proximity and camera from that single read
//! 5. assemble the [`FrameSnapshot`] for the renderer
//!
//! Nothing in a frame re-reads playback state, so heading, camera and
//! proximity always agree on the index.

use crate::basemap::{BasemapHandle, GroundPlane};
use crate::bounds::BoundingBox;
use crate::camera::{AircraftPose, CameraController, CameraMode, CameraState};
use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::highlight::{HighlightOutcome, HighlightRequest, HighlightResolver};
use crate::kinematics::KinematicEstimator;
use crate::playback::{PlaybackController, ReplayState};
use crate::projection::{GeoProjector, ScenePoint};
use crate::proximity::{PrimaryFix, ProximityEngine, ProximityResult};
use crate::report::{AnomalyReport, ProximityEvent};
use crate::timeline::Timeline;
use crate::track::Track;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// RENDER SURFACE
// ============================================================================

/// Where one aircraft is drawn this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPose {
    pub track_id: String,
    pub label: String,
    pub index: usize,
    pub timestamp_sec: f64,
    pub position: ScenePoint,
    pub heading_deg: f64,
    pub pitch_deg: f64,

    /// False when a secondary's nearest sample is outside the time window
    pub aligned: bool,
}

#[derive(Debug, Clone)]
pub struct SecondaryPath {
    pub track_id: String,
    pub points: Arc<[ScenePoint]>,
}

/// Geometry of the active highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightGeometry {
    pub request_id: Uuid,
    pub index: usize,

    /// Projected sub-path for segment highlights
    pub segment_path: Option<Vec<ScenePoint>>,

    /// Point marker / camera pin
    pub marker: Option<ScenePoint>,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub replay: ReplayState,
    pub bbox: BoundingBox,

    /// Full projected primary path (empty with fewer than two samples)
    pub primary_path: Arc<[ScenePoint]>,

    /// Prefix of `primary_path` already flown
    pub so_far_len: usize,

    pub secondary_paths: Vec<SecondaryPath>,
    pub primary_pose: TrackPose,
    pub secondary_poses: Vec<TrackPose>,
    pub proximity: Vec<ProximityResult>,
    pub highlight: Option<HighlightGeometry>,
    pub camera: CameraState,
    pub ground: GroundPlane,

    /// Scene-space (width, depth) of the ground plane, km
    pub ground_extent_km: (f64, f64),
}

impl FrameSnapshot {
    /// The "so-far" subset of the primary path.
    pub fn primary_so_far(&self) -> &[ScenePoint] {
        &self.primary_path[..self.so_far_len.min(self.primary_path.len())]
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub struct ReplaySession {
    config: ReplayConfig,
    timelines: Vec<Timeline>,
    primary: usize,
    bbox: BoundingBox,
    projector: GeoProjector,
    kinematics: KinematicEstimator,
    proximity: ProximityEngine,
    playback: PlaybackController,
    camera: CameraController,
    highlight: HighlightResolver,

    /// Latest value from the highlight source
    highlight_input: Option<HighlightRequest>,

    basemap: Option<BasemapHandle>,
    frame: u64,
}

impl ReplaySession {
    /// Builds a session over `tracks` with `primary_id` as the followed aircraft.
    ///
    /// Empty tracks are dropped. Fails when nothing usable remains, the
    /// primary is missing, or two tracks share an id.
    pub fn new(tracks: Vec<Track>, primary_id: &str, config: ReplayConfig) -> Result<Self, ReplayError> {
        let primary_is_empty = tracks.iter().any(|t| t.id == primary_id && t.is_empty());
        let tracks: Vec<Track> = tracks
            .into_iter()
            .filter(|t| {
                if t.is_empty() {
                    warn!("Dropping empty track {}", t.id);
                }
                !t.is_empty()
            })
            .collect();

        if tracks.is_empty() {
            return Err(ReplayError::NoData);
        }
        if primary_is_empty {
            return Err(ReplayError::EmptyTrack(primary_id.to_string()));
        }
        let mut seen = HashSet::with_capacity(tracks.len());
        if let Some(duplicate) = tracks.iter().find(|t| !seen.insert(t.id.as_str())) {
            return Err(ReplayError::DuplicateTrack(duplicate.id.clone()));
        }
        let primary = tracks
            .iter()
            .position(|t| t.id == primary_id)
            .ok_or_else(|| ReplayError::unknown(primary_id))?;

        let bbox = BoundingBox::compute(&tracks, config.bounds.min_region, config.bounds.padding_fraction);
        let timelines: Vec<Timeline> = tracks.into_iter().map(Timeline::new).collect();
        let playback = PlaybackController::new(primary_id, timelines[primary].len(), config.playback);

        info!(
            "Replay session: {} tracks, primary {} ({} samples), bbox [{:.3}, {:.3}] x [{:.3}, {:.3}]",
            timelines.len(),
            primary_id,
            timelines[primary].len(),
            bbox.min_lat,
            bbox.max_lat,
            bbox.min_lon,
            bbox.max_lon
        );

        Ok(Self {
            projector: GeoProjector::new(config.projection),
            kinematics: KinematicEstimator::new(config.kinematics),
            proximity: ProximityEngine::new(config.proximity),
            camera: CameraController::new(config.camera),
            highlight: HighlightResolver::new(),
            highlight_input: None,
            basemap: None,
            frame: 0,
            config,
            timelines,
            primary,
            bbox,
            playback,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// The single bbox shared by projection and basemap.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn projector(&self) -> &GeoProjector {
        &self.projector
    }

    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    pub fn timeline(&self, track_id: &str) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.id() == track_id)
    }

    pub fn primary(&self) -> &Timeline {
        &self.timelines[self.primary]
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &Timeline> {
        self.secondary_slots().map(move |slot| &self.timelines[slot])
    }

    fn secondary_slots(&self) -> impl Iterator<Item = usize> {
        let primary = self.primary;
        (0..self.timelines.len()).filter(move |slot| *slot != primary)
    }

    pub fn replay_state(&self) -> &ReplayState {
        self.playback.state()
    }

    pub fn camera(&self) -> &CameraState {
        self.camera.state()
    }

    pub fn ground_plane(&self) -> GroundPlane {
        self.basemap
            .as_ref()
            .map(BasemapHandle::ground_plane)
            .unwrap_or(GroundPlane::Grid)
    }

    /// Inclusive scrub range `[0, len - 1]`.
    pub fn scrub_range(&self) -> (usize, usize) {
        (0, self.playback.last_index())
    }

    // ------------------------------------------------------------------------
    // Playback UI
    // ------------------------------------------------------------------------

    pub fn play(&mut self) {
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn toggle(&mut self) {
        self.playback.toggle();
    }

    pub fn seek(&mut self, index: usize) {
        self.playback.seek(index);
    }

    pub fn set_speed(&mut self, multiplier: f64) {
        self.playback.set_speed(multiplier);
    }

    // ------------------------------------------------------------------------
    // Camera UI
    // ------------------------------------------------------------------------

    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        let pose = self.aircraft_pose(self.playback.current_index());
        self.camera.set_mode(mode, &pose);
    }

    pub fn set_auto_follow(&mut self, enabled: bool) {
        self.camera.set_auto_follow(enabled);
    }

    pub fn set_user_camera_position(&mut self, position: ScenePoint) {
        self.camera.set_user_position(position);
    }

    // ------------------------------------------------------------------------
    // External collaborators
    // ------------------------------------------------------------------------

    /// Latest value from the highlight source; `None` clears.
    pub fn set_highlight(&mut self, request: Option<HighlightRequest>) {
        self.highlight_input = request;
    }

    /// Focuses the moment of closest approach named by a report, if any.
    pub fn apply_report(&mut self, report: &AnomalyReport) -> Option<ProximityEvent> {
        let event = report.proximity_event()?;
        if let Some(request) = event.focus_request() {
            self.set_highlight(Some(request));
        }
        Some(event)
    }

    /// Attaches a basemap bridge and requests the bake for this session's bbox.
    pub fn attach_basemap(&mut self, handle: BasemapHandle) {
        if let Some(previous) = self.basemap.replace(handle.clone()) {
            previous.cancel();
        }
        handle.request(self.bbox);
    }

    /// Switches the followed aircraft.
    ///
    /// Resets playback and highlight state and re-requests the basemap; any
    /// bake in flight is cancelled first.
    pub fn set_primary(&mut self, track_id: &str) -> Result<(), ReplayError> {
        let primary = self
            .timelines
            .iter()
            .position(|t| t.id() == track_id)
            .ok_or_else(|| ReplayError::unknown(track_id))?;
        if primary == self.primary {
            return Ok(());
        }

        self.primary = primary;
        self.playback.reset(track_id, self.timelines[primary].len());
        self.highlight.reset();
        self.highlight_input = None;
        self.camera.pin_target(None);

        if let Some(basemap) = &self.basemap {
            basemap.cancel();
            basemap.request(self.bbox);
        }
        info!("Primary track switched to {}", track_id);
        Ok(())
    }

    /// Closes the replay view, cancelling any basemap bake in flight.
    pub fn close(self) {
        info!("Replay session closed after {} frames", self.frame);
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    /// Advances by `delta_time_sec` and returns the frame to draw.
    pub fn frame(&mut self, delta_time_sec: f64) -> FrameSnapshot {
        self.frame += 1;

        // 1. highlight
        let outcome = self.highlight.apply(
            self.highlight_input.as_ref(),
            &self.timelines[self.primary],
            &self.projector,
            &self.bbox,
        );
        match outcome {
            HighlightOutcome::Applied(resolution) => {
                self.playback.seek(resolution.index);
                self.camera.pin_target(resolution.scene_position);
            }
            HighlightOutcome::Cleared => self.camera.pin_target(None),
            HighlightOutcome::Unchanged => {}
        }

        // 2. playback
        self.playback.tick(delta_time_sec);

        // 3. single read
        let index = self.playback.current_index();
        let replay = self.playback.state().clone();
        let primary_pose = self.track_pose(self.primary, index, true);
        let fix = PrimaryFix::from(&self.primary().samples()[index]);

        // 4. proximity, camera
        let proximity = self.proximity.compute(&fix, self.secondaries());
        // every kept timeline is non-empty, so results line up with secondary slots
        let secondary_poses: Vec<TrackPose> = self
            .secondary_slots()
            .zip(&proximity)
            .map(|(slot, result)| self.track_pose(slot, result.aligned_index, result.in_range))
            .collect();

        self.camera.update(&AircraftPose {
            position: primary_pose.position,
            heading_deg: primary_pose.heading_deg,
            pitch_deg: primary_pose.pitch_deg,
        });

        debug!(
            "Frame {}: index {} hdg {:.1} pitch {:.1}",
            self.frame, index, primary_pose.heading_deg, primary_pose.pitch_deg
        );

        // 5. snapshot
        let primary_path = self.path_of(&self.timelines[self.primary]);
        let secondary_paths = self
            .secondaries()
            .filter(|t| t.has_path())
            .map(|t| SecondaryPath {
                track_id: t.id().to_string(),
                points: t.projected_path(&self.projector, &self.bbox),
            })
            .collect();

        FrameSnapshot {
            frame: self.frame,
            replay,
            bbox: self.bbox,
            so_far_len: if primary_path.is_empty() { 0 } else { index + 1 },
            highlight: self.highlight_geometry(&primary_path),
            primary_path,
            secondary_paths,
            primary_pose,
            secondary_poses,
            proximity,
            camera: *self.camera.state(),
            ground: self.ground_plane(),
            ground_extent_km: self.projector.ground_extent(&self.bbox),
        }
    }

    fn path_of(&self, timeline: &Timeline) -> Arc<[ScenePoint]> {
        if timeline.has_path() {
            timeline.projected_path(&self.projector, &self.bbox)
        } else {
            Arc::from(Vec::new())
        }
    }

    fn track_pose(&self, slot: usize, index: usize, aligned: bool) -> TrackPose {
        let timeline = &self.timelines[slot];
        let sample = timeline.samples()[index.min(timeline.last_index())];
        let attitude = self.kinematics.estimate(timeline, index);
        TrackPose {
            track_id: timeline.id().to_string(),
            label: timeline.track().label().to_string(),
            index,
            timestamp_sec: sample.timestamp_sec,
            position: self.projector.project_sample(&sample, &self.bbox),
            heading_deg: attitude.heading_deg,
            pitch_deg: attitude.pitch_deg,
            aligned,
        }
    }

    fn aircraft_pose(&self, index: usize) -> AircraftPose {
        let pose = self.track_pose(self.primary, index, true);
        AircraftPose {
            position: pose.position,
            heading_deg: pose.heading_deg,
            pitch_deg: pose.pitch_deg,
        }
    }

    fn highlight_geometry(&self, primary_path: &[ScenePoint]) -> Option<HighlightGeometry> {
        let (request, resolution) = self.highlight.active()?;
        let segment_path = resolution.segment.and_then(|(start, end)| {
            primary_path.get(start..=end).map(<[ScenePoint]>::to_vec)
        });
        Some(HighlightGeometry {
            request_id: request.id,
            index: resolution.index,
            segment_path,
            marker: resolution.scene_position,
        })
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        if let Some(basemap) = self.basemap.take() {
            basemap.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::GeoSample;
    use approx::assert_relative_eq;

    const NM_LAT_DEG: f64 = 1.0 / 60.0;

    /// Primary flying north along 35°E; "other" 3 NM east and 500 ft above.
    fn tracks() -> Vec<Track> {
        let primary = (0..100)
            .map(|i| GeoSample::new(31.0 + i as f64 * 0.01, 35.0, 10_000.0, i as f64))
            .collect();
        let lon_offset = 3.0 * NM_LAT_DEG / 31.5_f64.to_radians().cos();
        let other = (0..100)
            .map(|i| GeoSample::new(31.0 + i as f64 * 0.01, 35.0 + lon_offset, 10_500.0, i as f64))
            .collect();
        vec![
            Track::new("ELY001", primary).with_callsign("ELY001"),
            Track::new("OTHER", other),
        ]
    }

    fn session() -> ReplaySession {
        ReplaySession::new(tracks(), "ELY001", ReplayConfig::default()).unwrap()
    }

    #[test]
    fn test_new_errors() {
        assert!(matches!(
            ReplaySession::new(vec![], "x", ReplayConfig::default()),
            Err(ReplayError::NoData)
        ));
        assert!(matches!(
            ReplaySession::new(tracks(), "nope", ReplayConfig::default()),
            Err(ReplayError::UnknownTrack(_))
        ));

        let mut with_empty = tracks();
        with_empty.push(Track::new("EMPTY", vec![]));
        let err = ReplaySession::new(with_empty, "EMPTY", ReplayConfig::default()).err().unwrap();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_duplicate_track_ids_rejected() {
        let mut twins = tracks();
        let mut clone = twins[1].clone();
        clone.id = "ELY001".to_string();
        twins.push(clone);

        let err = ReplaySession::new(twins, "ELY001", ReplayConfig::default()).err().unwrap();
        assert!(matches!(err, ReplayError::DuplicateTrack(ref id) if id == "ELY001"));
    }

    #[test]
    fn test_secondary_pose_matches_its_own_track() {
        let mut s = session();
        let snapshot = s.frame(0.0);

        assert_eq!(snapshot.secondary_poses.len(), 1);
        let pose = &snapshot.secondary_poses[0];
        assert_eq!(pose.track_id, "OTHER");
        assert_eq!(pose.track_id, snapshot.proximity[0].track_id);
        // 500 ft above the primary
        assert!(pose.position.y > snapshot.primary_pose.position.y);
        assert_ne!(pose.position, snapshot.primary_pose.position);
    }

    #[test]
    fn test_frame_consistency() {
        let mut s = session();
        s.set_speed(10.0);
        s.play();

        let snap = s.frame(1.0);

        assert_eq!(snap.replay.current_index, 10);
        assert_eq!(snap.primary_pose.index, 10);
        assert_eq!(snap.so_far_len, 11);
        assert_eq!(snap.primary_so_far().len(), 11);
        assert_eq!(snap.primary_path.len(), 100);
        assert_eq!(snap.primary_pose.position, snap.primary_path[10]);

        // proximity aligned to the same timestamp
        assert_eq!(snap.proximity.len(), 1);
        assert_eq!(snap.proximity[0].aligned_index, 10);
        assert_eq!(snap.secondary_poses[0].index, 10);
        assert_eq!(snap.secondary_paths.len(), 1);
    }

    #[test]
    fn test_three_nm_five_hundred_ft_in_session() {
        let mut s = session();
        s.seek(50);
        let snap = s.frame(0.0);

        let r = &snap.proximity[0];
        assert!(r.in_range);
        assert_relative_eq!(r.horizontal_distance_nm.unwrap(), 3.0, epsilon = 0.05);
        assert_relative_eq!(r.vertical_distance_ft.unwrap(), 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_highlight_seeks_once() {
        let mut s = session();
        s.set_highlight(Some(HighlightRequest::segment(40, 45)));

        let snap = s.frame(0.0);
        assert_eq!(snap.replay.current_index, 40);
        let geometry = snap.highlight.unwrap();
        assert_eq!(geometry.segment_path.unwrap().len(), 6);

        // user scrubs away; the same request must not pull playback back
        s.seek(70);
        let snap = s.frame(0.0);
        assert_eq!(snap.replay.current_index, 70);

        s.set_highlight(None);
        let snap = s.frame(0.0);
        assert!(snap.highlight.is_none());
    }

    #[test]
    fn test_point_highlight_pins_camera() {
        let mut s = session();
        s.set_highlight(Some(HighlightRequest::point(31.5, 35.0)));

        let snap = s.frame(0.0);
        assert_eq!(snap.replay.current_index, 50);
        let marker = snap.highlight.unwrap().marker.unwrap();

        for _ in 0..400 {
            s.frame(0.0);
        }
        assert!((s.camera().target - marker).norm() < 1e-6);

        s.set_highlight(None);
        s.frame(0.0);
        assert!(s.camera.pinned_target().is_none());
    }

    #[test]
    fn test_set_primary_resets_state() {
        let mut s = session();
        s.seek(30);
        s.set_highlight(Some(HighlightRequest::segment(5, 10)));
        s.frame(0.0);

        s.set_primary("OTHER").unwrap();
        assert_eq!(s.replay_state().primary_track_id, "OTHER");
        assert_eq!(s.replay_state().current_index, 0);
        assert_eq!(s.primary().id(), "OTHER");

        let snap = s.frame(0.0);
        assert!(snap.highlight.is_none());
        assert_eq!(snap.secondary_poses[0].track_id, "ELY001");

        assert!(matches!(s.set_primary("nope"), Err(ReplayError::UnknownTrack(_))));
    }

    #[test]
    fn test_single_sample_primary_is_static_marker() {
        let tracks = vec![Track::new("SOLO", vec![GeoSample::new(32.0, 35.0, 5000.0, 0.0)])];
        let mut s = ReplaySession::new(tracks, "SOLO", ReplayConfig::default()).unwrap();
        s.play();

        let snap = s.frame(5.0);
        assert!(snap.primary_path.is_empty());
        assert_eq!(snap.so_far_len, 0);
        assert!(!snap.replay.is_playing);
        assert_eq!(snap.primary_pose.pitch_deg, 0.0);
        assert!(snap.proximity.is_empty());
    }

    #[test]
    fn test_apply_report_focuses_closest_approach() {
        let mut s = session();
        let report = AnomalyReport::from_json(
            r#"{ "proximity": { "other_flight_id": "OTHER", "min_distance_nm": 3.0, "time": 62.4 } }"#,
        )
        .unwrap();

        let event = s.apply_report(&report).unwrap();
        assert_eq!(event.other_track_id.as_deref(), Some("OTHER"));

        let snap = s.frame(0.0);
        assert_eq!(snap.replay.current_index, 62);
    }

    struct FlatSource;

    #[async_trait::async_trait]
    impl crate::basemap::BasemapSource for FlatSource {
        async fn bake(
            &self,
            _bbox: BoundingBox,
            _zoom: u8,
        ) -> Result<crate::basemap::BasemapRaster, skyreplay_env::EnvError> {
            crate::basemap::BasemapRaster::new(1, 1, vec![0, 0, 0, 255])
        }
    }

    #[tokio::test]
    async fn test_basemap_uses_session_bbox_and_survives_primary_switch() {
        use crate::basemap::BasemapBridge;
        use skyreplay_env::TokioContext;

        let mut s = session();
        let handle = BasemapBridge::new(TokioContext::shared(), FlatSource, Default::default()).into_handle();
        s.attach_basemap(handle);
        s.set_primary("OTHER").unwrap();

        for _ in 0..100 {
            if s.ground_plane().is_textured() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        match s.ground_plane() {
            GroundPlane::Textured { bbox, .. } => {
                let config = ReplayConfig::default();
                assert_eq!(bbox, s.bbox());
                assert_eq!(
                    bbox,
                    BoundingBox::compute(&tracks(), config.bounds.min_region, config.bounds.padding_fraction)
                );
            }
            other => panic!("expected texture, got {:?}", other),
        }
    }

    #[test]
    fn test_ground_is_grid_without_basemap() {
        let mut s = session();
        assert!(matches!(s.frame(0.0).ground, GroundPlane::Grid));
    }

    #[test]
    fn test_ground_extent_spans_bbox_corners() {
        let mut s = session();
        let snapshot = s.frame(0.0);
        let bbox = snapshot.bbox;

        let sw = s.projector().project(bbox.min_lat, bbox.min_lon, 0.0, &bbox);
        let ne = s.projector().project(bbox.max_lat, bbox.max_lon, 0.0, &bbox);
        let (width, depth) = snapshot.ground_extent_km;
        assert_relative_eq!(width, ne.x - sw.x, epsilon = 1e-9);
        assert_relative_eq!(depth, sw.z - ne.z, epsilon = 1e-9);
    }
}
