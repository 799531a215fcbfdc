//! The Highlight Resolver: maps an externally supplied highlight onto the
//! primary timeline.
//!
//! Requests carry a [`Uuid`] minted at construction. Application is idempotent
//! per id, so a re-delivered request (say on an unrelated refresh) never
//! re-seeks playback, while a fresh request with identical contents does.

use crate::bounds::{BoundingBox, LatLon};
use crate::projection::{GeoProjector, ScenePoint};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    Segment { start_index: usize, end_index: usize },
    Point(LatLon),
    FocusTimestamp(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub id: Uuid,
    pub kind: HighlightKind,
}

impl HighlightRequest {
    pub fn new(kind: HighlightKind) -> Self {
        Self { id: Uuid::new_v4(), kind }
    }

    pub fn segment(start_index: usize, end_index: usize) -> Self {
        Self::new(HighlightKind::Segment { start_index, end_index })
    }

    pub fn point(lat: f64, lon: f64) -> Self {
        Self::new(HighlightKind::Point(LatLon::new(lat, lon)))
    }

    pub fn focus_timestamp(ts: f64) -> Self {
        Self::new(HighlightKind::FocusTimestamp(ts))
    }
}

/// Where a request lands on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Index to seek the playback to
    pub index: usize,

    /// Clamped, ordered `(start, end)` for segment highlights
    pub segment: Option<(usize, usize)>,

    /// Marker position; doubles as the camera target override
    pub scene_position: Option<ScenePoint>,
}

/// Resolves a request against a timeline. `None` when the track is empty.
pub fn resolve(
    request: &HighlightRequest,
    timeline: &Timeline,
    projector: &GeoProjector,
    bbox: &BoundingBox,
) -> Option<Resolution> {
    if timeline.is_empty() {
        return None;
    }
    let last = timeline.last_index();

    let resolution = match request.kind {
        HighlightKind::Segment { start_index, end_index } => {
            let a = start_index.min(last);
            let b = end_index.min(last);
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Resolution {
                index: start,
                segment: Some((start, end)),
                scene_position: None,
            }
        }
        HighlightKind::Point(target) => {
            let index = nearest_by_position(timeline, target)?;
            // altitude comes from the nearest sample, position from the request
            let alt_ft = timeline.sample_at(index).map(|s| s.alt_or_ground()).unwrap_or(0.0);
            Resolution {
                index,
                segment: None,
                scene_position: Some(projector.project(target.lat, target.lon, alt_ft, bbox)),
            }
        }
        HighlightKind::FocusTimestamp(ts) => {
            let m = timeline.nearest_index_by_timestamp(ts)?;
            Resolution {
                index: m.index,
                segment: None,
                scene_position: None,
            }
        }
    };
    Some(resolution)
}

/// Euclidean distance in degree space; first sample wins ties.
fn nearest_by_position(timeline: &Timeline, target: LatLon) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in timeline.samples().iter().enumerate() {
        let d = (s.lat - target.lat).powi(2) + (s.lon - target.lon).powi(2);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HighlightOutcome {
    /// New request; the caller should seek and pin the camera
    Applied(Resolution),
    /// Same request as last time, or nothing to do
    Unchanged,
    /// Active highlight dropped; the caller should un-pin the camera
    Cleared,
}

/// Remembers which request was last applied.
#[derive(Debug, Default, Clone)]
pub struct HighlightResolver {
    applied: Option<Uuid>,
    active: Option<(HighlightRequest, Resolution)>,
}

impl HighlightResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&(HighlightRequest, Resolution)> {
        self.active.as_ref()
    }

    pub fn apply(
        &mut self,
        request: Option<&HighlightRequest>,
        timeline: &Timeline,
        projector: &GeoProjector,
        bbox: &BoundingBox,
    ) -> HighlightOutcome {
        let Some(request) = request else {
            let had_request = self.applied.take().is_some();
            let had_active = self.active.take().is_some();
            return if had_request || had_active {
                HighlightOutcome::Cleared
            } else {
                HighlightOutcome::Unchanged
            };
        };

        if self.applied == Some(request.id) {
            return HighlightOutcome::Unchanged;
        }
        self.applied = Some(request.id);

        match resolve(request, timeline, projector, bbox) {
            Some(resolution) => {
                debug!("Highlight {} -> index {}", request.id, resolution.index);
                self.active = Some((*request, resolution));
                HighlightOutcome::Applied(resolution)
            }
            None => {
                self.active = None;
                HighlightOutcome::Unchanged
            }
        }
    }

    /// Forget everything, e.g. when the primary track changes.
    pub fn reset(&mut self) {
        self.applied = None;
        self.active = None;
    }
}
