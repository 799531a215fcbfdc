//! The Proximity Engine: separation between the primary aircraft and every
//! secondary track at the current replay instant.
//!
//! Secondaries are aligned by nearest timestamp. A secondary whose nearest
//! sample is further than the time window from the primary instant is
//! reported as `in_range: false` with no distances: stale or non-overlapping
//! tracks must never read as "close".

use crate::config::ProximityConfig;
use crate::timeline::Timeline;
use crate::track::GeoSample;
use serde::{Deserialize, Serialize};

/// Earth radius in nautical miles, used for distance calculations.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// The primary aircraft's state at the current instant, read once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimaryFix {
    pub lat: f64,
    pub lon: f64,
    pub alt_ft: Option<f64>,
    pub timestamp_sec: f64,
}

impl From<&GeoSample> for PrimaryFix {
    fn from(sample: &GeoSample) -> Self {
        Self {
            lat: sample.lat,
            lon: sample.lon,
            alt_ft: sample.alt_ft,
            timestamp_sec: sample.timestamp_sec,
        }
    }
}

/// Raw separation against one secondary track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityResult {
    pub track_id: String,

    /// Index of the aligned secondary sample
    pub aligned_index: usize,

    /// Great-circle distance; `None` unless `in_range`
    pub horizontal_distance_nm: Option<f64>,

    /// |Δalt|; `None` unless `in_range` and both altitudes are known
    pub vertical_distance_ft: Option<f64>,

    /// |secondary.timestamp - primary.timestamp|
    pub time_alignment_error_sec: f64,

    /// The aligned sample is within the time window
    pub in_range: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityEngine {
    config: ProximityConfig,
}

impl ProximityEngine {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    /// Separation against every non-empty secondary, in input order.
    pub fn compute<'a, I>(&self, primary: &PrimaryFix, secondaries: I) -> Vec<ProximityResult>
    where
        I: IntoIterator<Item = &'a Timeline>,
    {
        compute(primary, secondaries, self.config.time_window_sec)
    }
}

/// Aligns each secondary to `primary.timestamp_sec` and measures separation.
///
/// Empty secondaries produce no entry.
pub fn compute<'a, I>(primary: &PrimaryFix, secondaries: I, time_window_sec: f64) -> Vec<ProximityResult>
where
    I: IntoIterator<Item = &'a Timeline>,
{
    secondaries
        .into_iter()
        .filter_map(|secondary| {
            let matched = secondary.nearest_index_by_timestamp(primary.timestamp_sec)?;
            let sample = &secondary.samples()[matched.index];
            let in_range = matched.error_sec <= time_window_sec;

            let (horizontal, vertical) = if in_range {
                let horizontal = haversine_distance_nm(primary.lat, primary.lon, sample.lat, sample.lon);
                let vertical = match (primary.alt_ft, sample.alt_ft) {
                    (Some(a), Some(b)) => Some((a - b).abs()),
                    _ => None,
                };
                (Some(horizontal), vertical)
            } else {
                (None, None)
            };

            Some(ProximityResult {
                track_id: secondary.id().to_string(),
                aligned_index: matched.index,
                horizontal_distance_nm: horizontal,
                vertical_distance_ft: vertical,
                time_alignment_error_sec: matched.error_sec,
                in_range,
            })
        })
        .collect()
}

/// Distance between two lat/lon points in nautical miles (haversine).
pub fn haversine_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_NM * c
}

// ============================================================================
// PRESENTATION
// ============================================================================

/// Separation minima used to bucket a result for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparationThresholds {
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
}

impl Default for SeparationThresholds {
    fn default() -> Self {
        Self {
            horizontal_nm: 5.0,
            vertical_ft: 1000.0,
        }
    }
}

/// Display bucket for a proximity result. Not part of the engine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Inside both minima
    Critical,
    /// Inside twice both minima
    Warning,
    Clear,
    /// Not time-aligned; nothing to say
    Unknown,
}

impl Severity {
    /// Buckets a result; an unknown altitude counts as vertically inside.
    pub fn classify(result: &ProximityResult, thresholds: &SeparationThresholds) -> Self {
        let Some(horizontal) = result.horizontal_distance_nm.filter(|_| result.in_range) else {
            return Severity::Unknown;
        };
        Self::from_separation(horizontal, result.vertical_distance_ft, thresholds)
    }

    /// Buckets a raw separation pair.
    pub fn from_separation(horizontal: f64, vertical_ft: Option<f64>, thresholds: &SeparationThresholds) -> Self {
        let vertical = vertical_ft.unwrap_or(0.0);

        if horizontal < thresholds.horizontal_nm && vertical < thresholds.vertical_ft {
            Severity::Critical
        } else if horizontal < 2.0 * thresholds.horizontal_nm && vertical < 2.0 * thresholds.vertical_ft {
            Severity::Warning
        } else {
            Severity::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;
    use approx::assert_relative_eq;

    /// Degrees of latitude spanning `nm` nautical miles.
    fn nm_to_lat_deg(nm: f64) -> f64 {
        (nm / EARTH_RADIUS_NM).to_degrees()
    }

    fn fix(alt_ft: f64, ts: f64) -> PrimaryFix {
        PrimaryFix { lat: 32.0, lon: 35.0, alt_ft: Some(alt_ft), timestamp_sec: ts }
    }

    #[test]
    fn test_three_nm_five_hundred_ft() {
        let other = Timeline::new(Track::new(
            "other",
            vec![
                GeoSample::new(32.0 + nm_to_lat_deg(3.0), 35.0, 10_500.0, 95.0),
                GeoSample::new(32.5, 35.0, 10_500.0, 200.0),
            ],
        ));

        let results = compute(&fix(10_000.0, 100.0), std::slice::from_ref(&other), 60.0);
        assert_eq!(results.len(), 1);

        let r = &results[0];
        assert!(r.in_range);
        assert_eq!(r.aligned_index, 0);
        assert_relative_eq!(r.horizontal_distance_nm.unwrap(), 3.0, epsilon = 1e-6);
        assert_relative_eq!(r.vertical_distance_ft.unwrap(), 500.0);
        assert_relative_eq!(r.time_alignment_error_sec, 5.0);

        let thresholds = SeparationThresholds { horizontal_nm: 5.0, vertical_ft: 1000.0 };
        assert_eq!(Severity::classify(r, &thresholds), Severity::Critical);
    }

    #[test]
    fn test_stale_secondary_out_of_range() {
        let other = Timeline::new(Track::new("late", vec![GeoSample::new(32.0, 35.0, 10_000.0, 500.0)]));

        let results = ProximityEngine::new(ProximityConfig::default())
            .compute(&fix(10_000.0, 100.0), std::slice::from_ref(&other));

        let r = &results[0];
        assert!(!r.in_range);
        assert_eq!(r.horizontal_distance_nm, None);
        assert_eq!(r.vertical_distance_ft, None);
        assert_eq!(r.time_alignment_error_sec, 400.0);
        assert_eq!(Severity::classify(r, &SeparationThresholds::default()), Severity::Unknown);
    }

    #[test]
    fn test_missing_altitude_has_no_vertical() {
        let other = Timeline::new(Track::new(
            "noalt",
            vec![GeoSample::new(32.1, 35.0, 0.0, 100.0).without_altitude()],
        ));
        let r = &compute(&fix(10_000.0, 100.0), std::slice::from_ref(&other), 60.0)[0];

        assert!(r.in_range);
        assert!(r.horizontal_distance_nm.is_some());
        assert_eq!(r.vertical_distance_ft, None);
    }

    #[test]
    fn test_empty_secondary_skipped_and_order_kept() {
        let secondaries = vec![
            Timeline::new(Track::new("a", vec![GeoSample::new(32.0, 35.1, 0.0, 0.0)])),
            Timeline::new(Track::new("empty", vec![])),
            Timeline::new(Track::new("b", vec![GeoSample::new(32.0, 35.2, 0.0, 0.0)])),
        ];
        let ids: Vec<String> = compute(&fix(0.0, 0.0), &secondaries, 60.0)
            .into_iter()
            .map(|r| r.track_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_window_boundary_inclusive() {
        let other = Timeline::new(Track::new("edge", vec![GeoSample::new(32.0, 35.0, 0.0, 160.0)]));
        assert!(compute(&fix(0.0, 100.0), std::slice::from_ref(&other), 60.0)[0].in_range);
        assert!(!compute(&fix(0.0, 99.0), std::slice::from_ref(&other), 60.0)[0].in_range);
    }

    #[test]
    fn test_severity_buckets() {
        let mut r = ProximityResult {
            track_id: "x".into(),
            aligned_index: 0,
            horizontal_distance_nm: Some(7.0),
            vertical_distance_ft: Some(1500.0),
            time_alignment_error_sec: 0.0,
            in_range: true,
        };
        let t = SeparationThresholds::default();
        assert_eq!(Severity::classify(&r, &t), Severity::Warning);

        r.horizontal_distance_nm = Some(12.0);
        assert_eq!(Severity::classify(&r, &t), Severity::Clear);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance_nm(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, 60.04, epsilon = 0.01);
    }
}
