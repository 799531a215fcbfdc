//! Track data model and ingestion.
//!
//! Upstream payloads are loosely shaped: field names vary between sources,
//! optional fields may be absent or `null`, and samples are not guaranteed to
//! arrive in time order. Everything is normalized exactly once here, into
//! [`GeoSample`] / [`Track`], so downstream components never re-parse.

use crate::error::ReplayError;
use crate::kinematics::normalize_deg;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// VALIDATED MODEL
// ============================================================================

/// One position report of one aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    /// Latitude in degrees [-90, 90]
    pub lat: f64,

    /// Longitude in degrees [-180, 180]
    pub lon: f64,

    /// Barometric altitude in feet
    pub alt_ft: Option<f64>,

    /// Unix timestamp in seconds
    pub timestamp_sec: f64,

    /// Ground speed in knots
    pub ground_speed_kts: Option<f64>,

    /// Vertical rate in ft/min (positive = climbing)
    pub vertical_rate_fpm: Option<f64>,

    /// Ground track in degrees true
    pub track_deg: Option<f64>,
}

impl GeoSample {
    /// Creates a sample with position and time only.
    pub fn new(lat: f64, lon: f64, alt_ft: f64, timestamp_sec: f64) -> Self {
        Self {
            lat,
            lon,
            alt_ft: Some(alt_ft),
            timestamp_sec,
            ground_speed_kts: None,
            vertical_rate_fpm: None,
            track_deg: None,
        }
    }

    pub fn with_vertical_rate(mut self, fpm: f64) -> Self {
        self.vertical_rate_fpm = Some(fpm);
        self
    }

    pub fn with_track(mut self, deg: f64) -> Self {
        self.track_deg = Some(deg);
        self
    }

    pub fn with_ground_speed(mut self, kts: f64) -> Self {
        self.ground_speed_kts = Some(kts);
        self
    }

    pub fn without_altitude(mut self) -> Self {
        self.alt_ft = None;
        self
    }

    /// Altitude with the flat-ground fallback applied.
    #[inline]
    pub fn alt_or_ground(&self) -> f64 {
        self.alt_ft.unwrap_or(0.0)
    }

    /// True when both samples sit on the same lat/lon.
    #[inline]
    pub fn same_position(&self, other: &GeoSample) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

/// One aircraft's time-ordered sequence of samples.
///
/// Samples are sorted on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    /// Stable identifier (hex code, flight id, ...)
    pub id: String,

    pub callsign: Option<String>,

    pub aircraft_type: Option<String>,

    /// Preferred render color, e.g. "#ff8800"
    pub color_hint: Option<String>,

    samples: Vec<GeoSample>,
}

impl Track {
    /// Creates a track, sorting samples by timestamp (stable for ties).
    pub fn new(id: impl Into<String>, mut samples: Vec<GeoSample>) -> Self {
        samples.sort_by(|a, b| a.timestamp_sec.total_cmp(&b.timestamp_sec));
        Self {
            id: id.into(),
            callsign: None,
            aircraft_type: None,
            color_hint: None,
            samples,
        }
    }

    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = Some(callsign.into());
        self
    }

    pub fn with_aircraft_type(mut self, aircraft_type: impl Into<String>) -> Self {
        self.aircraft_type = Some(aircraft_type.into());
        self
    }

    pub fn with_color_hint(mut self, color: impl Into<String>) -> Self {
        self.color_hint = Some(color.into());
        self
    }

    #[inline]
    pub fn samples(&self) -> &[GeoSample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Callsign if known, otherwise the id.
    pub fn label(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.id)
    }

    /// Validates and normalizes an upstream payload.
    ///
    /// Samples with missing or out-of-range coordinates or timestamps are
    /// dropped; non-finite optional fields become `None`. A track with no
    /// surviving sample is an error.
    pub fn from_raw(raw: RawTrack) -> Result<(Self, IngestReport), ReplayError> {
        let mut report = IngestReport::default();
        let mut samples = Vec::with_capacity(raw.samples.len());
        let mut last_ts = f64::NEG_INFINITY;

        for raw_sample in &raw.samples {
            match raw_sample.validate() {
                Some(sample) => {
                    if sample.timestamp_sec < last_ts {
                        report.reordered = true;
                    }
                    last_ts = sample.timestamp_sec;
                    samples.push(sample);
                }
                None => report.dropped += 1,
            }
        }
        report.accepted = samples.len();

        if samples.is_empty() {
            return Err(ReplayError::EmptyTrack(raw.id));
        }
        if report.dropped > 0 {
            warn!("Track {}: dropped {} malformed samples", raw.id, report.dropped);
        }
        debug!(
            "Track {}: ingested {} samples (reordered={})",
            raw.id, report.accepted, report.reordered
        );

        let mut track = Track::new(raw.id, samples);
        track.callsign = raw.callsign.filter(|s| !s.trim().is_empty());
        track.aircraft_type = raw.aircraft_type;
        track.color_hint = raw.color_hint;
        Ok((track, report))
    }

    /// Parses and validates a JSON track payload.
    pub fn from_json(json: &str) -> Result<(Self, IngestReport), ReplayError> {
        let raw: RawTrack = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }
}

/// Outcome counters from [`Track::from_raw`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub dropped: usize,
    /// Input was not in time order
    pub reordered: bool,
}

// ============================================================================
// RAW PAYLOAD
// ============================================================================

/// Track payload as delivered by the data source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    #[serde(alias = "flight_id", alias = "hex")]
    pub id: String,

    #[serde(default, alias = "flight")]
    pub callsign: Option<String>,

    #[serde(default, alias = "type", alias = "aircraft")]
    pub aircraft_type: Option<String>,

    #[serde(default, alias = "color")]
    pub color_hint: Option<String>,

    #[serde(default, alias = "points", alias = "track")]
    pub samples: Vec<RawSample>,
}

/// One loosely typed sample.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawSample {
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,

    #[serde(default, alias = "lng", alias = "longitude")]
    pub lon: Option<f64>,

    #[serde(default, alias = "alt_ft", alias = "altitude")]
    pub alt: Option<f64>,

    #[serde(default, alias = "timestamp_sec", alias = "time", alias = "ts")]
    pub timestamp: Option<f64>,

    #[serde(default, alias = "ground_speed_kts", alias = "gspeed", alias = "speed")]
    pub gs: Option<f64>,

    #[serde(default, alias = "vertical_rate_fpm", alias = "vspeed", alias = "vertical_rate")]
    pub vs: Option<f64>,

    #[serde(default, alias = "track_deg", alias = "heading")]
    pub track: Option<f64>,
}

impl RawSample {
    fn validate(&self) -> Option<GeoSample> {
        let lat = self.lat.filter(|v| v.is_finite() && (-90.0..=90.0).contains(v))?;
        let lon = self.lon.filter(|v| v.is_finite() && (-180.0..=180.0).contains(v))?;
        let timestamp_sec = self.timestamp.filter(|v| v.is_finite())?;

        Some(GeoSample {
            lat,
            lon,
            alt_ft: finite(self.alt),
            timestamp_sec,
            ground_speed_kts: finite(self.gs),
            vertical_rate_fpm: finite(self.vs),
            track_deg: finite(self.track).map(normalize_deg),
        })
    }
}

#[inline]
fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_by_timestamp() {
        let track = Track::new(
            "abc",
            vec![
                GeoSample::new(32.0, 34.8, 3000.0, 20.0),
                GeoSample::new(32.1, 34.8, 3100.0, 10.0),
                GeoSample::new(32.2, 34.8, 3200.0, 30.0),
            ],
        );

        let ts: Vec<f64> = track.samples().iter().map(|s| s.timestamp_sec).collect();
        assert_eq!(ts, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_from_json_aliases_and_optional_fields() {
        let json = r#"{
            "flight_id": "4x-ekd",
            "flight": "ELY001",
            "points": [
                { "latitude": 32.0, "longitude": 34.9, "altitude": 12000, "time": 100, "heading": 370 },
                { "lat": 32.1, "lon": 34.9, "timestamp": 90, "vspeed": -800 }
            ]
        }"#;

        let (track, report) = Track::from_json(json).unwrap();

        assert_eq!(track.id, "4x-ekd");
        assert_eq!(track.label(), "ELY001");
        assert_eq!(report.accepted, 2);
        assert!(report.reordered);
        // sorted: t=90 first
        assert_eq!(track.samples()[0].timestamp_sec, 90.0);
        assert_eq!(track.samples()[0].alt_ft, None);
        assert_eq!(track.samples()[0].vertical_rate_fpm, Some(-800.0));
        assert_eq!(track.samples()[1].track_deg, Some(10.0));
    }

    #[test]
    fn test_from_raw_drops_malformed_samples() {
        let raw = RawTrack {
            id: "t1".into(),
            samples: vec![
                RawSample { lat: Some(32.0), lon: Some(34.0), timestamp: Some(1.0), ..Default::default() },
                RawSample { lat: Some(95.0), lon: Some(34.0), timestamp: Some(2.0), ..Default::default() },
                RawSample { lat: Some(32.0), lon: None, timestamp: Some(3.0), ..Default::default() },
                RawSample { lat: Some(32.0), lon: Some(34.0), timestamp: Some(f64::NAN), ..Default::default() },
                RawSample { lat: Some(32.0), lon: Some(34.0), alt: Some(f64::INFINITY), timestamp: Some(4.0), ..Default::default() },
            ],
            ..Default::default()
        };

        let (track, report) = Track::from_raw(raw).unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.dropped, 3);
        assert_eq!(track.samples()[1].alt_ft, None);
    }

    #[test]
    fn test_from_raw_rejects_empty() {
        let raw = RawTrack { id: "ghost".into(), ..Default::default() };
        let err = Track::from_raw(raw).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_blank_callsign_falls_back_to_id() {
        let raw = RawTrack {
            id: "738065".into(),
            callsign: Some("   ".into()),
            samples: vec![RawSample { lat: Some(1.0), lon: Some(2.0), timestamp: Some(0.0), ..Default::default() }],
            ..Default::default()
        };
        let (track, _) = Track::from_raw(raw).unwrap();
        assert_eq!(track.label(), "738065");
    }
}
