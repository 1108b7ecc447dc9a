mod error;
#[cfg(test)]
pub mod fake;
pub mod replay;

use crate::domain::GeoCoordinate;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

pub use error::{FixError, SensorError, SensorKind};

/// A single location fix or the reason a fix could not be produced.
pub type LocationUpdate = Result<GeoCoordinate, FixError>;

/// Options passed to a continuous location watch.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// A raw device orientation reading, any field may be missing on a given platform.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OrientationSample {
    pub compass_heading: Option<f64>,
    pub tilt_front_back: Option<f64>,
    pub tilt_left_right: Option<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
}

/// Continuous, push-based source of location fixes.
///
/// The watch stays open until the returned receiver is dropped.
#[async_trait]
pub trait LocationService: Debug + Send + Sync {
    async fn watch(&self, options: WatchOptions) -> Result<Receiver<LocationUpdate>, SensorError>;
}

/// Source of device orientation samples.
#[async_trait]
pub trait OrientationSensor: Debug + Send + Sync {
    fn is_available(&self) -> bool;

    fn requires_permission(&self) -> bool;

    async fn request_permission(&self) -> Result<PermissionState, SensorError>;

    /// Starts delivering samples until the returned receiver is dropped.
    async fn subscribe(&self) -> Result<Receiver<OrientationSample>, SensorError>;
}
