//! Anomaly report metadata.
//!
//! A report names the aircraft involved and, for proximity events, carries
//! loosely typed separation figures from the detection pipeline. They are
//! normalized here into a [`ProximityEvent`] so the session can label the
//! intruder and jump playback to the moment of closest approach.

use crate::error::ReplayError;
use crate::highlight::HighlightRequest;
use crate::proximity::{SeparationThresholds, Severity};
use serde::{Deserialize, Serialize};

/// Report payload as delivered by the data source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnomalyReport {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, alias = "anomaly_type", alias = "type")]
    pub kind: Option<String>,

    #[serde(default, alias = "flight_id", alias = "primary_flight")]
    pub primary_track_id: Option<String>,

    #[serde(default)]
    pub proximity: Option<RawProximity>,
}

/// Proximity metadata, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProximity {
    #[serde(default, alias = "other_flight_id", alias = "intruder_id")]
    pub other_track_id: Option<String>,

    #[serde(default, alias = "other_flight", alias = "intruder_callsign")]
    pub other_callsign: Option<String>,

    #[serde(default, alias = "min_distance_nm", alias = "horizontal_nm")]
    pub min_horizontal_nm: Option<f64>,

    #[serde(default, alias = "min_altitude_diff_ft", alias = "vertical_ft")]
    pub min_vertical_ft: Option<f64>,

    #[serde(default, alias = "time", alias = "ts")]
    pub timestamp: Option<f64>,
}

/// Validated proximity metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProximityEvent {
    pub other_track_id: Option<String>,
    pub other_callsign: Option<String>,
    pub min_horizontal_nm: Option<f64>,
    pub min_vertical_ft: Option<f64>,
    pub timestamp: Option<f64>,
}

impl AnomalyReport {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The report's proximity event, if it carries anything usable.
    pub fn proximity_event(&self) -> Option<ProximityEvent> {
        let raw = self.proximity.as_ref()?;
        let event = ProximityEvent {
            other_track_id: non_blank(raw.other_track_id.as_deref()),
            other_callsign: non_blank(raw.other_callsign.as_deref()),
            min_horizontal_nm: non_negative(raw.min_horizontal_nm),
            min_vertical_ft: non_negative(raw.min_vertical_ft.map(f64::abs)),
            timestamp: raw.timestamp.filter(|t| t.is_finite()),
        };

        if event == ProximityEvent::default() {
            None
        } else {
            Some(event)
        }
    }
}

impl ProximityEvent {
    /// Jump-to request for the moment of closest approach.
    pub fn focus_request(&self) -> Option<HighlightRequest> {
        self.timestamp.map(HighlightRequest::focus_timestamp)
    }

    /// Severity of the reported minimum separation.
    pub fn severity(&self, thresholds: &SeparationThresholds) -> Severity {
        match self.min_horizontal_nm {
            None => Severity::Unknown,
            Some(h) => Severity::from_separation(h, self.min_vertical_ft, thresholds),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

fn non_negative(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x >= 0.0)
}
