use thiserror::Error;

/// A WGS84 position as reported by a location sensor or configured as a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>, // In meters
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::InvalidLatitude(latitude));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::InvalidLongitude(longitude));
        }

        Ok(GeoCoordinate {
            latitude,
            longitude,
            accuracy: None,
        })
    }

    pub fn with_accuracy(self, accuracy_m: f64) -> Result<Self, CoordinateError> {
        if !(accuracy_m.is_finite() && accuracy_m >= 0.0) {
            return Err(CoordinateError::InvalidAccuracy(accuracy_m));
        }

        Ok(GeoCoordinate {
            accuracy: Some(accuracy_m),
            ..self
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("invalid latitude: {0}, must be between -90 and 90")]
    InvalidLatitude(f64),
    #[error("invalid longitude: {0}, must be between -180 and 180")]
    InvalidLongitude(f64),
    #[error("invalid accuracy: {0}, must be a non-negative number of meters")]
    InvalidAccuracy(f64),
}
