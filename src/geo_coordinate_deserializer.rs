use crate::domain::GeoCoordinate;
use serde::de::Error;
use serde::{Deserialize, Deserializer};

impl<'de> Deserialize<'de> for GeoCoordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Debug, Deserialize)]
        pub struct Inner {
            latitude: f64,
            longitude: f64,
            accuracy_m: Option<f64>,
        }

        let inner = Inner::deserialize(deserializer)?;
        let coordinate = GeoCoordinate::new(inner.latitude, inner.longitude).map_err(D::Error::custom)?;

        match inner.accuracy_m {
            Some(accuracy_m) => coordinate.with_accuracy(accuracy_m).map_err(D::Error::custom),
            None => Ok(coordinate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_a_coordinate_with_accuracy() -> Result<(), serde_json::Error> {
        let coordinate: GeoCoordinate = serde_json::from_str(r#"{ "latitude": 51.86, "longitude": 4.35, "accuracy_m": 8.0 }"#)?;

        assert_eq!(coordinate.latitude(), 51.86);
        assert_eq!(coordinate.longitude(), 4.35);
        assert_eq!(coordinate.accuracy(), Some(8.0));
        Ok(())
    }

    #[test]
    fn deserializes_a_coordinate_without_accuracy() -> Result<(), serde_json::Error> {
        let coordinate: GeoCoordinate = serde_json::from_str(r#"{ "latitude": -33.9, "longitude": 151.2 }"#)?;

        assert_eq!(coordinate.accuracy(), None);
        Ok(())
    }

    #[test]
    fn rejects_an_out_of_range_longitude() {
        let result = serde_json::from_str::<GeoCoordinate>(r#"{ "latitude": 0.0, "longitude": 200.0 }"#);

        let error = result.expect_err("longitude should be rejected").to_string();
        assert!(error.contains("invalid longitude: 200"), "unexpected error: {}", error);
    }

    #[test]
    fn rejects_a_negative_accuracy() {
        let result = serde_json::from_str::<GeoCoordinate>(r#"{ "latitude": 0.0, "longitude": 0.0, "accuracy_m": -3.0 }"#);

        assert!(result.is_err());
    }
}
