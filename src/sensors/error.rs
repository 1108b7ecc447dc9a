use serde::Deserialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorKind {
    Location,
    Orientation,
}

impl Display for SensorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Location => write!(f, "location"),
            SensorKind::Orientation => write!(f, "orientation"),
        }
    }
}

/// Terminal failures of a sensor, the affected tracker falls back for the rest of the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("{0} sensor is not available on this device")]
    Unavailable(SensorKind),
    #[error("permission to use the {0} sensor was denied")]
    PermissionDenied(SensorKind),
    #[error("{0} permission request failed: {1}")]
    PermissionRequestFailed(SensorKind, String),
}

/// Transient failure of a single location fix, the watch stays active.
#[derive(Error, Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FixError {
    #[error("timed out waiting for a location fix")]
    Timeout,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
}
