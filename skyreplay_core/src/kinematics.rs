//! The Kinematic Estimator: heading and pitch for a sample.
//!
//! Heading prefers the reported ground track and falls back to geometry.
//! Pitch prefers the reported vertical rate and falls back to an averaged
//! Δalt/Δt over a symmetric window, since sample-to-sample altitude deltas
//! are too noisy to animate directly. The result is always finite and within
//! the configured clamp; degenerate input yields 0°.

use crate::config::KinematicsConfig;
use crate::timeline::Timeline;
use crate::track::GeoSample;
use geo::{HaversineBearing, Point};
use serde::{Deserialize, Serialize};

/// Orientation of the aircraft at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    /// Degrees true, [0, 360)
    pub heading_deg: f64,

    /// Degrees, positive nose-up
    pub pitch_deg: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicEstimator {
    config: KinematicsConfig,
}

impl KinematicEstimator {
    pub fn new(config: KinematicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KinematicsConfig {
        &self.config
    }

    /// Heading and pitch at `index` (clamped into the track).
    pub fn estimate(&self, timeline: &Timeline, index: usize) -> Attitude {
        let samples = timeline.samples();
        if samples.is_empty() {
            return Attitude::default();
        }
        let index = index.min(samples.len() - 1);

        Attitude {
            heading_deg: heading_at(samples, index),
            pitch_deg: self.pitch_at(samples, index),
        }
    }

    /// Maps a vertical rate to a clamped pitch angle.
    pub fn pitch_from_rate(&self, fpm: f64) -> f64 {
        let pitch = fpm * self.config.pitch_deg_per_fpm;
        if !pitch.is_finite() {
            return 0.0;
        }
        let limit = self.config.max_pitch_deg.abs();
        pitch.clamp(-limit, limit)
    }

    fn pitch_at(&self, samples: &[GeoSample], index: usize) -> f64 {
        if let Some(fpm) = samples[index].vertical_rate_fpm {
            return self.pitch_from_rate(fpm);
        }

        let lo = index.saturating_sub(self.config.window);
        let hi = index.saturating_add(self.config.window).min(samples.len() - 1);
        let window = &samples[lo..=hi];

        // Only samples that actually carry an altitude take part.
        let first = window.iter().find(|s| s.alt_ft.is_some());
        let last = window.iter().rev().find(|s| s.alt_ft.is_some());
        let (Some(first), Some(last)) = (first, last) else {
            return 0.0;
        };

        let dt_min = (last.timestamp_sec - first.timestamp_sec) / 60.0;
        if !(dt_min > 0.0) {
            return 0.0;
        }
        let dalt = last.alt_or_ground() - first.alt_or_ground();
        self.pitch_from_rate(dalt / dt_min)
    }
}

/// Heading at `index`, falling back through geometry and earlier reports.
fn heading_at(samples: &[GeoSample], index: usize) -> f64 {
    let current = &samples[index];
    if let Some(track) = current.track_deg {
        return normalize_deg(track);
    }

    // Next sample that moved.
    if let Some(next) = samples[index + 1..].iter().find(|s| !s.same_position(current)) {
        return bearing(current, next);
    }

    // End of track: keep the direction we arrived from.
    if let Some(prev) = samples[..index].iter().rev().find(|s| !s.same_position(current)) {
        return bearing(prev, current);
    }

    // Stationary track: carry forward the last reported heading.
    samples[..index]
        .iter()
        .rev()
        .find_map(|s| s.track_deg)
        .map(normalize_deg)
        .unwrap_or(0.0)
}

/// Initial great-circle bearing from `a` to `b`, degrees in [0, 360).
pub fn bearing(a: &GeoSample, b: &GeoSample) -> f64 {
    let from = Point::new(a.lon, a.lat);
    let to = Point::new(b.lon, b.lat);
    normalize_deg(from.haversine_bearing(to))
}

/// Wraps an angle into [0, 360); non-finite input maps to 0.
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped.is_finite() && wrapped < 360.0 {
        wrapped
    } else {
        0.0
    }
}
