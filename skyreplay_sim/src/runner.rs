//! Replay runner - drives a session frame by frame on the virtual clock.

use crate::basemap::SyntheticBasemap;
use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{ReplayExport, ReplayFrame};
use crate::scenarios::{Scenario, ScenarioId};

use skyreplay_core::proximity::{SeparationThresholds, Severity};
use skyreplay_core::{BasemapBridge, CameraMode, GroundSummary, ReplayConfig, ReplaySession};
use skyreplay_env::ReplayContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Driver configuration.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Frames per second of the simulated render loop
    pub fps: u32,

    /// Maximum wall duration in seconds
    pub max_duration_secs: f64,

    /// Playback speed multiplier
    pub speed: f64,

    pub camera_mode: CameraMode,

    /// Virtual latency of the synthetic basemap bake
    pub basemap_latency_ms: u64,

    /// Make every basemap bake fail
    pub basemap_fails: bool,

    /// Export every Nth frame
    pub export_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fps: 30,
            max_duration_secs: 300.0,
            speed: 1.0,
            camera_mode: CameraMode::Orbit,
            basemap_latency_ms: 250,
            basemap_fails: false,
            export_interval: 10,
        }
    }
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub scenario: String,
    pub seed: u64,
    pub passed: bool,
    pub total_frames: u64,

    /// Virtual time at the end of the run
    pub final_time_secs: f64,

    pub final_index: usize,
    pub reached_end: bool,

    /// Closest time-aligned horizontal separation seen
    pub min_separation_nm: Option<f64>,

    pub worst_severity: Severity,
    pub max_abs_pitch_deg: f64,
    pub highlight_seen: bool,
    pub ground: GroundSummary,
    pub failure_reason: Option<String>,
}

/// Runs replay scenarios.
pub struct ReplayRunner {
    config: SimConfig,
    replay: ReplayConfig,
    thresholds: SeparationThresholds,
}

impl ReplayRunner {
    pub fn new(config: SimConfig, replay: ReplayConfig) -> Self {
        Self {
            config,
            replay,
            thresholds: SeparationThresholds::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replays `scenario`; with `expect` set, the run is checked against
    /// that scenario's known outcome.
    pub async fn run(
        &self,
        scenario: &Scenario,
        expect: Option<ScenarioId>,
    ) -> Result<(RunResult, ReplayExport), SimError> {
        info!("Starting replay: {} (seed={})", scenario.name, self.config.seed);

        let ctx = SimContext::shared(self.config.seed);
        let mut session = ReplaySession::new(scenario.tracks.clone(), &scenario.primary_id, self.replay)?;

        let mut source = SyntheticBasemap::new(
            Arc::clone(&ctx),
            Duration::from_millis(self.config.basemap_latency_ms),
        );
        if self.config.basemap_fails {
            source = source.failing();
        }
        session.attach_basemap(BasemapBridge::new(Arc::clone(&ctx), source, self.replay.basemap).into_handle());

        session.set_camera_mode(self.config.camera_mode);
        session.set_speed(self.config.speed);
        if let Some(event) = scenario.report.as_ref().and_then(|r| session.apply_report(r)) {
            info!(
                "Report: closest approach {:?} NM / {:?} ft with {}",
                event.min_horizontal_nm,
                event.min_vertical_ft,
                event.other_callsign.as_deref().or(event.other_track_id.as_deref()).unwrap_or("unknown")
            );
        } else if let Some(request) = scenario.highlight {
            session.set_highlight(Some(request));
        }
        session.play();

        let fps = self.config.fps.max(1);
        let dt = 1.0 / fps as f64;
        let max_frames = (self.config.max_duration_secs.max(0.0) * fps as f64).ceil() as u64;
        let export_interval = self.config.export_interval.max(1);
        let last_index = session.scrub_range().1;

        let mut export = ReplayExport::new(&scenario.name, self.config.seed);
        let mut result = RunResult {
            scenario: scenario.name.clone(),
            seed: self.config.seed,
            passed: false,
            total_frames: 0,
            final_time_secs: 0.0,
            final_index: 0,
            reached_end: false,
            min_separation_nm: None,
            worst_severity: Severity::Unknown,
            max_abs_pitch_deg: 0.0,
            highlight_seen: false,
            ground: GroundSummary::Pending,
            failure_reason: None,
        };

        for frame in 0..max_frames {
            ctx.advance_time(Duration::from_secs_f64(dt));
            let snapshot = session.frame(dt);

            // let the basemap bake run
            tokio::task::yield_now().await;

            for r in &snapshot.proximity {
                let severity = Severity::classify(r, &self.thresholds);
                if rank(severity) > rank(result.worst_severity) {
                    result.worst_severity = severity;
                }
                if let Some(h) = r.horizontal_distance_nm.filter(|_| r.in_range) {
                    result.min_separation_nm = Some(result.min_separation_nm.map_or(h, |m| m.min(h)));
                }
            }
            result.max_abs_pitch_deg = result.max_abs_pitch_deg.max(snapshot.primary_pose.pitch_deg.abs());
            result.highlight_seen |= snapshot.highlight.is_some();
            result.total_frames = frame + 1;
            result.final_index = snapshot.replay.current_index;

            let time_sec = ctx.now().as_secs_f64();
            if frame % export_interval == 0 {
                export.add_frame(ReplayFrame::from_snapshot(&snapshot, time_sec, &self.thresholds));
            }
            if frame % fps as u64 == 0 {
                debug!(
                    "  frame={} | index={}/{} | playing={}",
                    frame, snapshot.replay.current_index, last_index, snapshot.replay.is_playing
                );
            }

            if !snapshot.replay.is_playing && snapshot.replay.current_index == last_index {
                result.reached_end = true;
                break;
            }
        }

        result.final_time_secs = ctx.now().as_secs_f64();
        result.ground = session.ground_plane().summary();
        session.close();

        result.failure_reason = expect.and_then(|id| check(id, &result, self.config.basemap_fails).err());
        result.passed = result.failure_reason.is_none();
        export.finalize(result.passed, result.min_separation_nm);

        Ok((result, export))
    }
}

fn rank(severity: Severity) -> u8 {
    match severity {
        Severity::Unknown => 0,
        Severity::Clear => 1,
        Severity::Warning => 2,
        Severity::Critical => 3,
    }
}

/// Known outcome of each built-in scenario.
fn check(id: ScenarioId, r: &RunResult, basemap_fails: bool) -> Result<(), String> {
    match (basemap_fails, r.ground) {
        (_, GroundSummary::Pending) => return Err("basemap bake never resolved".into()),
        (true, GroundSummary::Textured { .. }) => return Err("failed bake did not fall back to grid".into()),
        (false, GroundSummary::Grid) => return Err("basemap bake fell back to grid".into()),
        _ => {}
    }

    match id {
        ScenarioId::NearMiss => {
            let sep = r.min_separation_nm.ok_or("no aligned separation")?;
            if r.worst_severity != Severity::Critical || !(2.5..=3.5).contains(&sep) {
                return Err(format!("expected ~3 NM critical, got {:.2} NM {:?}", sep, r.worst_severity));
            }
        }
        ScenarioId::Climbout => {
            if r.max_abs_pitch_deg < 10.0 || !r.highlight_seen {
                return Err(format!("expected climb pitch and segment, got {:.1}°", r.max_abs_pitch_deg));
            }
        }
        ScenarioId::Parallel => {
            let sep = r.min_separation_nm.ok_or("no aligned separation")?;
            if sep < 5.5 || r.worst_severity == Severity::Critical {
                return Err(format!("parallel tracks too close: {:.2} NM", sep));
            }
        }
        ScenarioId::StaleSecondary => {
            if r.min_separation_nm.is_some() || r.worst_severity != Severity::Unknown {
                return Err("stale secondary produced a separation".into());
            }
        }
        ScenarioId::SparseData => {
            if !r.reached_end || !r.highlight_seen {
                return Err("sparse track did not replay to the end".into());
            }
        }
    }
    Ok(())
}
