use crate::domain::GeoCoordinate;
use crate::sensors::{
    FixError, LocationService, LocationUpdate, OrientationSample, OrientationSensor, PermissionState, SensorError, SensorKind, WatchOptions,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument};

const REPLAY_BUFFER_SIZE: usize = 16;

/// A recorded sensor session: which sensors exist, and what they reported when.
#[derive(Clone, Debug, Deserialize)]
pub struct SensorTrace {
    #[serde(default)]
    model_native_height: Option<f64>,
    #[serde(default)]
    orientation: OrientationProfile,
    #[serde(default)]
    location: LocationProfile,
    events: Vec<TraceEvent>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OrientationProfile {
    available: bool,
    /// Answers to successive consent prompts, empty when the platform does not ask. The last answer repeats.
    permission: Vec<PermissionAnswer>,
    /// When the user asked for the prompt again after a denial.
    retry_at_ms: Option<u64>,
}

impl Default for OrientationProfile {
    fn default() -> Self {
        OrientationProfile {
            available: true,
            permission: vec![],
            retry_at_ms: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAnswer {
    Granted,
    Denied,
    /// The prompt itself failed, e.g. it was not triggered by a user gesture
    Failed,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LocationProfile {
    available: bool,
}

impl Default for LocationProfile {
    fn default() -> Self {
        LocationProfile { available: true }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Fix { at_ms: u64, coordinate: GeoCoordinate },
    FixError { at_ms: u64, error: FixError },
    Orientation { at_ms: u64, sample: OrientationSample },
}

impl TraceEvent {
    fn at_ms(&self) -> u64 {
        match self {
            TraceEvent::Fix { at_ms, .. } | TraceEvent::FixError { at_ms, .. } | TraceEvent::Orientation { at_ms, .. } => *at_ms,
        }
    }
}

impl SensorTrace {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        info!("📼 Loading sensor trace...");

        let content = fs::read_to_string(path).await.map_err(|source| TraceError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        let trace = Self::from_json(&content).map_err(|source| TraceError::Parse {
            source,
            path: path.to_path_buf(),
        })?;

        info!("📼 Loading sensor trace... OK, {} events", trace.events.len());
        Ok(trace)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut trace: SensorTrace = serde_json::from_str(content)?;
        trace.events.sort_by_key(TraceEvent::at_ms);
        Ok(trace)
    }

    pub fn model_native_height(&self) -> Option<f64> {
        self.model_native_height
    }

    /// Delay after start at which the user retried the orientation prompt.
    pub fn permission_retry_at(&self) -> Option<Duration> {
        self.orientation.retry_at_ms.map(Duration::from_millis)
    }

    /// Time between the start of the replay and the last recorded event.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.events.last().map(TraceEvent::at_ms).unwrap_or(0))
    }

    fn location_updates(&self) -> Vec<(u64, LocationUpdate)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Fix { at_ms, coordinate } => Some((*at_ms, Ok(*coordinate))),
                TraceEvent::FixError { at_ms, error } => Some((*at_ms, Err(*error))),
                TraceEvent::Orientation { .. } => None,
            })
            .collect()
    }

    fn orientation_samples(&self) -> Vec<(u64, OrientationSample)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Orientation { at_ms, sample } => Some((*at_ms, sample.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Location service that plays back the fixes of a [`SensorTrace`].
#[derive(Debug)]
pub struct ReplayLocationService {
    available: bool,
    updates: Vec<(u64, LocationUpdate)>,
}

impl ReplayLocationService {
    pub fn new(trace: &SensorTrace) -> Self {
        ReplayLocationService {
            available: trace.location.available,
            updates: trace.location_updates(),
        }
    }
}

#[async_trait]
impl LocationService for ReplayLocationService {
    async fn watch(&self, options: WatchOptions) -> Result<Receiver<LocationUpdate>, SensorError> {
        if !self.available {
            return Err(SensorError::Unavailable(SensorKind::Location));
        }

        debug!(?options, "📼 Replaying {} location updates", self.updates.len());
        let (tx, rx) = mpsc::channel(REPLAY_BUFFER_SIZE);
        tokio::spawn(replay(self.updates.clone(), tx));
        Ok(rx)
    }
}

/// Orientation sensor that plays back the samples of a [`SensorTrace`].
///
/// Sample times count from each subscription.
#[derive(Debug)]
pub struct ReplayOrientationSensor {
    available: bool,
    permission: Vec<PermissionAnswer>,
    prompts: AtomicUsize,
    samples: Vec<(u64, OrientationSample)>,
}

impl ReplayOrientationSensor {
    pub fn new(trace: &SensorTrace) -> Self {
        ReplayOrientationSensor {
            available: trace.orientation.available,
            permission: trace.orientation.permission.clone(),
            prompts: AtomicUsize::new(0),
            samples: trace.orientation_samples(),
        }
    }
}

#[async_trait]
impl OrientationSensor for ReplayOrientationSensor {
    fn is_available(&self) -> bool {
        self.available
    }

    fn requires_permission(&self) -> bool {
        !self.permission.is_empty()
    }

    async fn request_permission(&self) -> Result<PermissionState, SensorError> {
        let prompt = self.prompts.fetch_add(1, Ordering::Relaxed);
        let answer = self.permission.get(prompt).or(self.permission.last()).copied();
        debug!(prompt, ?answer, "📼 Replaying orientation permission answer");

        match answer {
            Some(PermissionAnswer::Granted) | None => Ok(PermissionState::Granted),
            Some(PermissionAnswer::Denied) => Ok(PermissionState::Denied),
            Some(PermissionAnswer::Failed) => Err(SensorError::PermissionRequestFailed(
                SensorKind::Orientation,
                "recorded prompt failed".to_string(),
            )),
        }
    }

    async fn subscribe(&self) -> Result<Receiver<OrientationSample>, SensorError> {
        if !self.available {
            return Err(SensorError::Unavailable(SensorKind::Orientation));
        }

        debug!("📼 Replaying {} orientation samples", self.samples.len());
        let (tx, rx) = mpsc::channel(REPLAY_BUFFER_SIZE);
        tokio::spawn(replay(self.samples.clone(), tx));
        Ok(rx)
    }
}

async fn replay<T: Send + 'static>(events: Vec<(u64, T)>, tx: Sender<T>) {
    let start = Instant::now();
    for (at_ms, item) in events {
        sleep_until(start + Duration::from_millis(at_ms)).await;
        if tx.send(item).await.is_err() {
            debug!("📼 Subscriber gone, replay stopped");
            return;
        }
    }

    // A finished trace behaves like a sensor that went quiet, not one that was revoked
    tx.closed().await;
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("unable to read sensor trace '{}': {}", path.display(), source)]
    Io { source: io::Error, path: PathBuf },
    #[error("invalid sensor trace '{}': {}", path.display(), source)]
    Parse { source: serde_json::Error, path: PathBuf },
}
