//! The Geo-Projector: geodetic -> local scene frame.
//!
//! Equirectangular approximation centred on the bounding box:
//! - `x`: east, km (longitude scaled by `cos(center.lat)` for meridian convergence)
//! - `y`: up, km, altitude × vertical exaggeration
//! - `z`: south, km (north is `-z`, matching a right-handed Y-up renderer)
//!
//! Adequate for regions a few hundred km across; not a navigation-grade
//! projection. Without exaggeration, vertical separations of a few hundred
//! feet vanish against tens of km of horizontal span.

use crate::bounds::BoundingBox;
use crate::config::ProjectionConfig;
use crate::track::GeoSample;
use nalgebra::Vector3;

/// A point in the local scene frame, in km.
pub type ScenePoint = Vector3<f64>;

/// Kilometres per degree of latitude (mean).
pub const KM_PER_DEG: f64 = 111.32;

/// Feet -> kilometres.
pub const FT_TO_KM: f64 = 0.0003048;

/// Stateless projector; all behaviour is a pure function of its config and inputs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoProjector {
    config: ProjectionConfig,
}

impl GeoProjector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Projects a geodetic position into the scene frame of `bbox`.
    pub fn project(&self, lat: f64, lon: f64, alt_ft: f64, bbox: &BoundingBox) -> ScenePoint {
        let center = bbox.center();
        let lon_scale = center.lat.to_radians().cos();

        let x = (lon - center.lon) * KM_PER_DEG * lon_scale;
        let z = -(lat - center.lat) * KM_PER_DEG;
        let y = self.altitude_to_scene(alt_ft);

        ScenePoint::new(x, y, z)
    }

    /// Projects a sample; missing altitude sits on the ground plane.
    pub fn project_sample(&self, sample: &GeoSample, bbox: &BoundingBox) -> ScenePoint {
        self.project(sample.lat, sample.lon, sample.alt_or_ground(), bbox)
    }

    /// Scene-space height for an altitude in feet.
    #[inline]
    pub fn altitude_to_scene(&self, alt_ft: f64) -> f64 {
        alt_ft * FT_TO_KM * self.config.vertical_exaggeration
    }

    /// Scene-space width and depth (km) covered by `bbox`, for sizing the ground plane.
    pub fn ground_extent(&self, bbox: &BoundingBox) -> (f64, f64) {
        let lon_scale = bbox.center().lat.to_radians().cos();
        (bbox.width() * KM_PER_DEG * lon_scale, bbox.height() * KM_PER_DEG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(31.0, 33.0, 34.0, 36.0)
    }

    #[test]
    fn test_center_projects_to_origin() {
        let projector = GeoProjector::default();
        let p = projector.project(32.0, 35.0, 0.0, &bbox());
        assert_eq!(p, ScenePoint::zeros());
    }

    #[test]
    fn test_axes() {
        let projector = GeoProjector::default();

        let north = projector.project(33.0, 35.0, 0.0, &bbox());
        assert_relative_eq!(north.z, -KM_PER_DEG, epsilon = 1e-9);
        assert_relative_eq!(north.x, 0.0);

        let east = projector.project(32.0, 36.0, 0.0, &bbox());
        assert_relative_eq!(east.x, KM_PER_DEG * 32.0f64.to_radians().cos(), epsilon = 1e-9);
        assert!(east.x < KM_PER_DEG);
    }

    #[test]
    fn test_vertical_exaggeration() {
        let flat = GeoProjector::new(ProjectionConfig { vertical_exaggeration: 1.0 });
        let tall = GeoProjector::new(ProjectionConfig { vertical_exaggeration: 7.0 });

        let a = flat.project(32.0, 35.0, 10_000.0, &bbox());
        let b = tall.project(32.0, 35.0, 10_000.0, &bbox());

        assert_relative_eq!(a.y, 3.048, epsilon = 1e-9);
        assert_relative_eq!(b.y, 7.0 * 3.048, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_altitude_on_ground() {
        let projector = GeoProjector::default();
        let sample = GeoSample::new(32.5, 35.5, 5000.0, 0.0).without_altitude();
        assert_eq!(projector.project_sample(&sample, &bbox()).y, 0.0);
    }

    #[test]
    fn test_ground_extent() {
        let projector = GeoProjector::default();
        let (w, d) = projector.ground_extent(&bbox());
        assert_relative_eq!(d, 2.0 * KM_PER_DEG, epsilon = 1e-9);
        assert!(w < d);
    }

    proptest! {
        #[test]
        fn prop_projection_is_deterministic(
            lat in -80.0f64..80.0,
            lon in -179.0f64..179.0,
            alt in -1000.0f64..60000.0,
            exaggeration in 0.5f64..20.0,
        ) {
            let projector = GeoProjector::new(ProjectionConfig { vertical_exaggeration: exaggeration });
            let bbox = BoundingBox::new(lat - 1.0, lat + 2.0, lon - 1.5, lon + 0.5);

            let first = projector.project(lat, lon, alt, &bbox);
            for _ in 0..3 {
                let again = projector.project(lat, lon, alt, &bbox);
                prop_assert_eq!(first.x.to_bits(), again.x.to_bits());
                prop_assert_eq!(first.y.to_bits(), again.y.to_bits());
                prop_assert_eq!(first.z.to_bits(), again.z.to_bits());
            }
        }
    }
}
