//! The Track Timeline: index- and time-based access over one sorted track.
//!
//! Read-only after construction. The only interior state is the memoized
//! projected path, keyed by the (bbox, projection config) pair that produced
//! it and rebuilt whenever either changes.

use crate::bounds::BoundingBox;
use crate::config::ProjectionConfig;
use crate::projection::{GeoProjector, ScenePoint};
use crate::track::{GeoSample, Track};
use std::sync::{Arc, RwLock};

/// Result of a nearest-by-time lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeMatch {
    pub index: usize,

    /// |sample.timestamp - ts| in seconds
    pub error_sec: f64,
}

#[derive(Debug)]
struct PathCache {
    bbox: BoundingBox,
    projection: ProjectionConfig,
    points: Arc<[ScenePoint]>,
}

/// Time-ordered view over a single [`Track`].
#[derive(Debug)]
pub struct Timeline {
    track: Arc<Track>,
    path_cache: RwLock<Option<PathCache>>,
}

impl Timeline {
    pub fn new(track: Track) -> Self {
        Self::from_shared(Arc::new(track))
    }

    pub fn from_shared(track: Arc<Track>) -> Self {
        Self {
            track,
            path_cache: RwLock::new(None),
        }
    }

    #[inline]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.track.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.track.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    /// At least two samples, i.e. something to draw as a line.
    #[inline]
    pub fn has_path(&self) -> bool {
        self.len() >= 2
    }

    #[inline]
    pub fn samples(&self) -> &[GeoSample] {
        self.track.samples()
    }

    /// Index of the last sample (0 for an empty track).
    #[inline]
    pub fn last_index(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Sample at `index`.
    ///
    /// Out-of-range indices are a caller bug: they assert in debug builds and
    /// clamp to the last sample in release builds. `None` only for an empty track.
    pub fn sample_at(&self, index: usize) -> Option<&GeoSample> {
        debug_assert!(
            index < self.len() || self.is_empty(),
            "sample index {} out of range for track {} (len {})",
            index,
            self.id(),
            self.len()
        );
        self.samples().get(index.min(self.last_index()))
    }

    /// First and last timestamps.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        let samples = self.samples();
        Some((samples.first()?.timestamp_sec, samples.last()?.timestamp_sec))
    }

    /// Finds the sample closest in time to `ts`.
    ///
    /// Binary search over the sorted samples; ties go to the earlier sample.
    /// A non-finite `ts` matches index 0 with an infinite error, so callers
    /// gating on the error never treat it as aligned.
    pub fn nearest_index_by_timestamp(&self, ts: f64) -> Option<TimeMatch> {
        let samples = self.samples();
        if samples.is_empty() {
            return None;
        }
        if !ts.is_finite() {
            return Some(TimeMatch {
                index: 0,
                error_sec: f64::INFINITY,
            });
        }

        let upper = samples.partition_point(|s| s.timestamp_sec < ts);
        let best = if upper == 0 {
            0
        } else if upper == samples.len() {
            samples.len() - 1
        } else {
            let before = ts - samples[upper - 1].timestamp_sec;
            let after = samples[upper].timestamp_sec - ts;
            if after < before {
                upper
            } else {
                upper - 1
            }
        };

        Some(TimeMatch {
            index: best,
            error_sec: (samples[best].timestamp_sec - ts).abs(),
        })
    }

    /// Linearly interpolated position at `ts`, clamped to the track's span.
    ///
    /// Rate and track fields are carried from the earlier bracketing sample.
    pub fn interpolate_at(&self, ts: f64) -> Option<GeoSample> {
        let samples = self.samples();
        let first = samples.first()?;
        let last = samples.last()?;
        if !(ts > first.timestamp_sec) {
            return Some(*first);
        }
        if ts >= last.timestamp_sec {
            return Some(*last);
        }

        let upper = samples.partition_point(|s| s.timestamp_sec <= ts);
        let a = &samples[upper - 1];
        let b = &samples[upper];
        let dt = b.timestamp_sec - a.timestamp_sec;
        if dt <= 0.0 {
            return Some(*a);
        }
        let t = (ts - a.timestamp_sec) / dt;

        Some(GeoSample {
            lat: lerp(a.lat, b.lat, t),
            lon: lerp(a.lon, b.lon, t),
            alt_ft: match (a.alt_ft, b.alt_ft) {
                (Some(x), Some(y)) => Some(lerp(x, y, t)),
                (x, y) => x.or(y),
            },
            timestamp_sec: ts,
            ..*a
        })
    }

    /// Every sample projected into the scene frame of `bbox`.
    ///
    /// Memoized: repeated calls with the same bbox and projection config return
    /// the same shared buffer.
    pub fn projected_path(&self, projector: &GeoProjector, bbox: &BoundingBox) -> Arc<[ScenePoint]> {
        {
            let cache = self.path_cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = cache.as_ref() {
                if cached.bbox == *bbox && cached.projection == *projector.config() {
                    return Arc::clone(&cached.points);
                }
            }
        }

        let points: Arc<[ScenePoint]> = self
            .samples()
            .iter()
            .map(|s| projector.project_sample(s, bbox))
            .collect();

        let mut cache = self.path_cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(PathCache {
            bbox: *bbox,
            projection: *projector.config(),
            points: Arc::clone(&points),
        });
        points
    }

    /// Drops the memoized path.
    pub fn invalidate(&self) {
        let mut cache = self.path_cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
