use crate::sensors::{LocationService, LocationUpdate, OrientationSample, OrientationSensor, PermissionState, SensorError, SensorKind, WatchOptions};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Orientation sensor driven by a test through the returned sender.
#[derive(Debug)]
pub struct FakeOrientationSensor {
    available: bool,
    requires_permission: bool,
    permission_responses: Mutex<VecDeque<Result<PermissionState, SensorError>>>,
    samples: Mutex<Option<Receiver<OrientationSample>>>,
}

impl FakeOrientationSensor {
    pub fn available() -> (Self, Sender<OrientationSample>) {
        Self::build(true, false, vec![])
    }

    pub fn unavailable() -> Self {
        Self::build(false, false, vec![]).0
    }

    /// A sensor that asks for consent and answers each request with the next response.
    pub fn with_permission(responses: Vec<Result<PermissionState, SensorError>>) -> (Self, Sender<OrientationSample>) {
        Self::build(true, true, responses)
    }

    fn build(available: bool, requires_permission: bool, responses: Vec<Result<PermissionState, SensorError>>) -> (Self, Sender<OrientationSample>) {
        let (tx, rx) = mpsc::channel(16);
        let sensor = FakeOrientationSensor {
            available,
            requires_permission,
            permission_responses: Mutex::new(responses.into()),
            samples: Mutex::new(Some(rx)),
        };
        (sensor, tx)
    }
}

#[async_trait]
impl OrientationSensor for FakeOrientationSensor {
    fn is_available(&self) -> bool {
        self.available
    }

    fn requires_permission(&self) -> bool {
        self.requires_permission
    }

    async fn request_permission(&self) -> Result<PermissionState, SensorError> {
        self.permission_responses.lock().unwrap().pop_front().unwrap_or(Ok(PermissionState::Denied))
    }

    async fn subscribe(&self) -> Result<Receiver<OrientationSample>, SensorError> {
        self.samples.lock().unwrap().take().ok_or(SensorError::Unavailable(SensorKind::Orientation))
    }
}

/// Location service driven by a test through the returned sender.
#[derive(Debug)]
pub struct FakeLocationService {
    available: bool,
    watches: Mutex<VecDeque<Receiver<LocationUpdate>>>,
}

impl FakeLocationService {
    pub fn available() -> (Self, Sender<LocationUpdate>) {
        let (service, mut senders) = Self::with_watches(1);
        (service, senders.remove(0))
    }

    /// A service that can be watched `count` times, each watch driven by its own sender.
    pub fn with_watches(count: usize) -> (Self, Vec<Sender<LocationUpdate>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) = (0..count).map(|_| mpsc::channel(16)).unzip();
        let service = FakeLocationService {
            available: true,
            watches: Mutex::new(receivers),
        };
        (service, senders)
    }

    pub fn unavailable() -> Self {
        FakeLocationService {
            available: false,
            watches: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl LocationService for FakeLocationService {
    async fn watch(&self, _options: WatchOptions) -> Result<Receiver<LocationUpdate>, SensorError> {
        if !self.available {
            return Err(SensorError::Unavailable(SensorKind::Location));
        }

        self.watches.lock().unwrap().pop_front().ok_or(SensorError::Unavailable(SensorKind::Location))
    }
}

pub fn compass(degrees: f64) -> OrientationSample {
    OrientationSample {
        compass_heading: Some(degrees),
        ..OrientationSample::default()
    }
}
