use crate::domain::GeoCoordinate;
use crate::extensions::degrees_ext::NormalizeDegrees;

/// Mean Earth radius in meters, the sphere the haversine formula works on.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance and initial bearing from one coordinate to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoVector {
    distance_m: f64,
    bearing_degrees: f64,
}

impl GeoVector {
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Initial great-circle bearing, 0° is north, clockwise, within `[0, 360)`.
    pub fn bearing_degrees(&self) -> f64 {
        self.bearing_degrees
    }
}

/// Returns the haversine distance and the initial bearing from `from` towards `to`.
///
/// Uses a spherical Earth, so distances carry up to ~0.5% error compared to an ellipsoid.
pub fn distance_and_bearing(from: &GeoCoordinate, to: &GeoCoordinate) -> GeoVector {
    if from.latitude() == to.latitude() && from.longitude() == to.longitude() {
        return GeoVector {
            distance_m: 0.0,
            bearing_degrees: 0.0,
        };
    }

    let phi1 = from.latitude().to_radians();
    let phi2 = to.latitude().to_radians();
    let delta_phi = (to.latitude() - from.latitude()).to_radians();
    let delta_lambda = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let distance_m = 2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt());

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    let bearing_degrees = y.atan2(x).to_degrees().normalize_degrees();

    GeoVector {
        distance_m,
        bearing_degrees,
    }
}
