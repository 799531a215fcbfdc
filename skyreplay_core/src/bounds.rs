//! Scene extent: the geographic rectangle both the 3D projection and the
//! baked basemap are anchored to.
//!
//! The two consumers must see the *same* value, otherwise the texture slides
//! relative to the projected geometry. The session computes one
//! [`BoundingBox`] and hands copies of that exact value to both.

use crate::track::Track;
use serde::{Deserialize, Serialize};

/// A latitude / longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned lat/lon rectangle.
///
/// Does not handle regions crossing the anti-meridian; the operating area is
/// a few hundred km wide and nowhere near ±180°.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Fits the scene extent to a set of tracks.
    ///
    /// Starts from `min_region`, grows to cover every sample, then pads each
    /// side by `padding_fraction` of the resulting span. The result always
    /// contains `min_region` and every sample, including for an empty set.
    pub fn compute<'a, I>(tracks: I, min_region: BoundingBox, padding_fraction: f64) -> Self
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut bbox = min_region;
        for track in tracks {
            for sample in track.samples() {
                bbox.extend(sample.lat, sample.lon);
            }
        }

        let padding = if padding_fraction.is_finite() {
            padding_fraction.max(0.0)
        } else {
            0.0
        };

        let pad_lat = bbox.height() * padding;
        let pad_lon = bbox.width() * padding;
        Self {
            min_lat: (bbox.min_lat - pad_lat).max(-90.0),
            max_lat: (bbox.max_lat + pad_lat).min(90.0),
            min_lon: bbox.min_lon - pad_lon,
            max_lon: bbox.max_lon + pad_lon,
        }
    }

    /// Grows the box to include a point.
    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    pub fn center(&self) -> LatLon {
        LatLon {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.min_lat
            && self.max_lat >= other.max_lat
            && self.min_lon <= other.min_lon
            && self.max_lon >= other.max_lon
    }
}
