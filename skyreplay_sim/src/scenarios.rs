//! Demo replay scenarios built from synthetic, seeded tracks.
//!
//! Tracks are flown with a simple constant-rate model (speed, heading,
//! turn rate, vertical rate) and then perturbed with Gaussian position and
//! altitude noise from a ChaCha8 stream, so a given seed always produces the
//! same samples.

use crate::error::SimError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use skyreplay_core::kinematics::normalize_deg;
use skyreplay_core::{AnomalyReport, GeoSample, HighlightRequest, RawTrack, Track};
use std::path::Path;
use tracing::debug;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Head-on pair passing 3 NM / 500 ft apart
    NearMiss,

    /// Turning departure climbing through 10,000 ft
    Climbout,

    /// Two aircraft on parallel approaches 6 NM apart
    Parallel,

    /// Secondary recorded two minutes after the primary
    StaleSecondary,

    /// Unordered samples with missing altitude and track fields
    SparseData,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::NearMiss,
            ScenarioId::Climbout,
            ScenarioId::Parallel,
            ScenarioId::StaleSecondary,
            ScenarioId::SparseData,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::NearMiss => "near_miss",
            ScenarioId::Climbout => "climbout",
            ScenarioId::Parallel => "parallel",
            ScenarioId::StaleSecondary => "stale_secondary",
            ScenarioId::SparseData => "sparse_data",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::NearMiss => "Head-on pair, closest approach 3 NM / 500 ft at t=60s",
            ScenarioId::Climbout => "Right-turning departure at +2000 ft/min",
            ScenarioId::Parallel => "Parallel approaches 6 NM abeam, same altitude",
            ScenarioId::StaleSecondary => "Secondary offset by 120s, never time-aligned",
            ScenarioId::SparseData => "Shuffled samples, missing altitude/track, one corrupt fix",
        }
    }

    /// Builds the scenario's tracks for `seed`.
    ///
    /// Fails only if a built-in fixture no longer parses or ingests.
    pub fn build(&self, seed: u64) -> Result<Scenario, SimError> {
        let mut gen = TrackGenerator::new(seed);
        match self {
            ScenarioId::NearMiss => near_miss(&mut gen),
            ScenarioId::Climbout => Ok(climbout(&mut gen)),
            ScenarioId::Parallel => Ok(parallel(&mut gen)),
            ScenarioId::StaleSecondary => Ok(stale_secondary(&mut gen)),
            ScenarioId::SparseData => sparse_data(&mut gen),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "near_miss" | "nearmiss" => Ok(ScenarioId::NearMiss),
            "climbout" | "climb" => Ok(ScenarioId::Climbout),
            "parallel" => Ok(ScenarioId::Parallel),
            "stale_secondary" | "stale" => Ok(ScenarioId::StaleSecondary),
            "sparse_data" | "sparse" => Ok(ScenarioId::SparseData),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// A ready-to-replay set of tracks.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub tracks: Vec<Track>,
    pub primary_id: String,
    pub report: Option<AnomalyReport>,
    pub highlight: Option<HighlightRequest>,
}

impl Scenario {
    /// Loads tracks from a JSON file holding one track object or an array.
    ///
    /// The primary defaults to the first track.
    pub fn from_file(path: impl AsRef<Path>, primary_id: Option<&str>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let raws: Vec<RawTrack> = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };

        let mut tracks = Vec::with_capacity(raws.len());
        for raw in raws {
            let (track, _) = Track::from_raw(raw)?;
            tracks.push(track);
        }

        let primary_id = match primary_id {
            Some(id) => id.to_string(),
            None => tracks
                .first()
                .map(|t| t.id.clone())
                .ok_or_else(|| SimError::Scenario(format!("{} holds no tracks", path.display())))?,
        };

        Ok(Self {
            name: path.display().to_string(),
            tracks,
            primary_id,
            report: None,
            highlight: None,
        })
    }
}

// ============================================================================
// TRACK GENERATION
// ============================================================================

/// Straight or turning flight at constant rates.
#[derive(Debug, Clone, Copy)]
pub struct FlightPlan {
    pub lat: f64,
    pub lon: f64,
    pub alt_ft: f64,
    pub heading_deg: f64,
    pub speed_kts: f64,
    pub vertical_rate_fpm: f64,
    pub turn_rate_deg_s: f64,
    pub start_sec: f64,
    pub samples: usize,
    pub interval_sec: f64,
}

impl Default for FlightPlan {
    fn default() -> Self {
        Self {
            lat: 32.0,
            lon: 34.9,
            alt_ft: 10_000.0,
            heading_deg: 0.0,
            speed_kts: 250.0,
            vertical_rate_fpm: 0.0,
            turn_rate_deg_s: 0.0,
            start_sec: 1_700_000_000.0,
            samples: 120,
            interval_sec: 1.0,
        }
    }
}

/// Seeded noisy track generator.
pub struct TrackGenerator {
    rng: ChaCha8Rng,
    position_std_deg: f64,
    altitude_std_ft: f64,
}

impl TrackGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_noise(seed, 0.000_05, 15.0)
    }

    /// Zero standard deviations yield exact tracks.
    pub fn with_noise(seed: u64, position_std_deg: f64, altitude_std_ft: f64) -> Self {
        let std = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            position_std_deg: std(position_std_deg),
            altitude_std_ft: std(altitude_std_ft),
        }
    }

    fn noise(&mut self, std: f64) -> f64 {
        let z: f64 = StandardNormal.sample(&mut self.rng);
        z * std
    }

    /// Flies `plan`, reporting ground speed, vertical rate and track.
    pub fn fly(&mut self, plan: &FlightPlan) -> Vec<GeoSample> {
        let mut lat = plan.lat;
        let mut lon = plan.lon;
        let mut alt = plan.alt_ft;
        let mut heading = plan.heading_deg;
        let mut samples = Vec::with_capacity(plan.samples);

        for i in 0..plan.samples {
            let ts = plan.start_sec + i as f64 * plan.interval_sec;
            let sample = GeoSample::new(
                lat + self.noise(self.position_std_deg),
                lon + self.noise(self.position_std_deg),
                alt + self.noise(self.altitude_std_ft),
                ts,
            )
            .with_ground_speed(plan.speed_kts)
            .with_vertical_rate(plan.vertical_rate_fpm)
            .with_track(normalize_deg(heading));
            samples.push(sample);

            let dist_nm = plan.speed_kts * plan.interval_sec / 3600.0;
            let h = heading.to_radians();
            lat += dist_nm * h.cos() / 60.0;
            lon += dist_nm * h.sin() / (60.0 * lat.to_radians().cos());
            alt += plan.vertical_rate_fpm * plan.interval_sec / 60.0;
            heading += plan.turn_rate_deg_s * plan.interval_sec;
        }
        samples
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// 250 kts each way; the pair meets at t=60s, 3 NM laterally, 500 ft apart.
fn near_miss(gen: &mut TrackGenerator) -> Result<Scenario, SimError> {
    let meet_lat: f64 = 32.0;
    let meet_lon = 34.9;
    let run_in_nm = 250.0 * 60.0 / 3600.0;
    let lon_per_nm = 1.0 / (60.0 * meet_lat.to_radians().cos());

    let primary = FlightPlan {
        lat: meet_lat,
        lon: meet_lon - run_in_nm * lon_per_nm,
        alt_ft: 11_000.0,
        heading_deg: 90.0,
        ..FlightPlan::default()
    };
    let intruder = FlightPlan {
        lat: meet_lat + 3.0 / 60.0,
        lon: meet_lon + run_in_nm * lon_per_nm,
        alt_ft: 11_500.0,
        heading_deg: 270.0,
        ..FlightPlan::default()
    };

    let t_cpa = primary.start_sec + 60.0;
    let report = AnomalyReport::from_json(&format!(
        r#"{{ "id": "near-miss", "type": "proximity", "flight_id": "ELY001",
             "proximity": {{ "other_flight_id": "4XINT", "other_flight": "ISR77",
                             "min_distance_nm": 3.0, "min_altitude_diff_ft": 500, "time": {} }} }}"#,
        t_cpa
    ))?;

    Ok(Scenario {
        name: ScenarioId::NearMiss.name().to_string(),
        tracks: vec![
            Track::new("ELY001", gen.fly(&primary)).with_callsign("ELY001").with_aircraft_type("B738"),
            Track::new("4XINT", gen.fly(&intruder)).with_callsign("ISR77").with_aircraft_type("A320"),
        ],
        primary_id: "ELY001".into(),
        report: Some(report),
        highlight: None,
    })
}

fn climbout(gen: &mut TrackGenerator) -> Scenario {
    let departure = FlightPlan {
        lat: 32.0,
        lon: 34.87,
        alt_ft: 2_000.0,
        heading_deg: 300.0,
        speed_kts: 220.0,
        vertical_rate_fpm: 2_000.0,
        turn_rate_deg_s: 0.5,
        samples: 180,
        ..FlightPlan::default()
    };

    Scenario {
        name: ScenarioId::Climbout.name().to_string(),
        tracks: vec![Track::new("DEP1", gen.fly(&departure)).with_callsign("ELY315")],
        primary_id: "DEP1".into(),
        report: None,
        highlight: Some(HighlightRequest::segment(60, 120)),
    }
}

fn parallel(gen: &mut TrackGenerator) -> Scenario {
    let left = FlightPlan {
        lat: 31.7,
        lon: 34.7,
        alt_ft: 6_000.0,
        heading_deg: 0.0,
        speed_kts: 180.0,
        vertical_rate_fpm: -700.0,
        ..FlightPlan::default()
    };
    let right = FlightPlan {
        lon: left.lon + 6.0 / (60.0 * left.lat.to_radians().cos()),
        ..left
    };

    Scenario {
        name: ScenarioId::Parallel.name().to_string(),
        tracks: vec![
            Track::new("APP-L", gen.fly(&left)).with_color_hint("#38bdf8"),
            Track::new("APP-R", gen.fly(&right)).with_color_hint("#f97316"),
        ],
        primary_id: "APP-L".into(),
        report: None,
        highlight: Some(HighlightRequest::point(31.75, 34.7)),
    }
}

fn stale_secondary(gen: &mut TrackGenerator) -> Scenario {
    let primary = FlightPlan {
        samples: 60,
        ..FlightPlan::default()
    };
    let late = FlightPlan {
        lat: 32.01,
        start_sec: primary.start_sec + 120.0 + primary.samples as f64,
        samples: 60,
        ..primary
    };

    Scenario {
        name: ScenarioId::StaleSecondary.name().to_string(),
        tracks: vec![Track::new("EARLY", gen.fly(&primary)), Track::new("LATE", gen.fly(&late))],
        primary_id: "EARLY".into(),
        report: None,
        highlight: None,
    }
}

/// Goes through ingestion: shuffled order, gaps and one corrupt fix.
fn sparse_data(gen: &mut TrackGenerator) -> Result<Scenario, SimError> {
    let plan = FlightPlan {
        vertical_rate_fpm: 1_200.0,
        samples: 40,
        interval_sec: 4.0,
        ..FlightPlan::default()
    };

    let mut points: Vec<serde_json::Value> = gen
        .fly(&plan)
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut point = serde_json::json!({ "lat": s.lat, "lon": s.lon, "time": s.timestamp_sec });
            if i % 3 != 0 {
                point["altitude"] = serde_json::json!(s.alt_ft);
            }
            point
        })
        .collect();
    points.push(serde_json::json!({ "lat": 123.0, "lon": 34.9, "time": plan.start_sec }));
    points.reverse();

    let raw = serde_json::json!({ "flight_id": "SPARSE", "flight": "ADSB-GAP", "points": points });
    let (track, report) = Track::from_raw(serde_json::from_value::<RawTrack>(raw)?)?;
    debug!("sparse_data: {:?}", report);

    Ok(Scenario {
        name: ScenarioId::SparseData.name().to_string(),
        tracks: vec![track],
        primary_id: "SPARSE".into(),
        report: None,
        highlight: Some(HighlightRequest::focus_timestamp(plan.start_sec + 80.0)),
    })
}
