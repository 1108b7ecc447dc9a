use crate::domain::HeadingSample;
use crate::sensors::{OrientationSample, OrientationSensor, PermissionState, SensorError, SensorKind};
use crate::tracker::subscription::{Subscription, listen_changes};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationState {
    /// Not started yet
    Idle,
    Unavailable,
    AwaitingPermission,
    Active,
    Denied,
}

/// Owns the current compass heading, falling back to north whenever the sensor cannot be used.
#[derive(Debug)]
pub struct OrientationTracker {
    sensor: Arc<dyn OrientationSensor>,
    heading_tx: watch::Sender<HeadingSample>,
    state_tx: watch::Sender<OrientationState>,
    pump: Option<JoinHandle<()>>,
}

impl OrientationTracker {
    pub fn new(sensor: Arc<dyn OrientationSensor>) -> Self {
        let (heading_tx, _) = watch::channel(HeadingSample::fallback());
        let (state_tx, _) = watch::channel(OrientationState::Idle);

        OrientationTracker {
            sensor,
            heading_tx,
            state_tx,
            pump: None,
        }
    }

    /// Acquires the sensor and starts consuming samples. Never fails, unusable sensors end in a fallback state.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> OrientationState {
        if self.state() == OrientationState::Active {
            debug!("🧭 Orientation tracker already active");
            return OrientationState::Active;
        }

        if !self.sensor.is_available() {
            warn!("🧭 Orientation sensor not available, using fallback heading");
            self.fall_back(OrientationState::Unavailable);
            return self.state();
        }

        if self.sensor.requires_permission() {
            self.state_tx.send_replace(OrientationState::AwaitingPermission);
            info!("🧭 Requesting orientation permission...");

            match self.sensor.request_permission().await {
                Ok(PermissionState::Granted) => info!("🧭 Requesting orientation permission... OK"),
                Ok(PermissionState::Denied) => {
                    let err = SensorError::PermissionDenied(SensorKind::Orientation);
                    warn!("🧭 Requesting orientation permission... {}, using fallback heading", err);
                    self.fall_back(OrientationState::Denied);
                    return self.state();
                }
                Err(err) => {
                    warn!("🧭 Requesting orientation permission... failed, {}", err);
                    self.fall_back(OrientationState::Denied);
                    return self.state();
                }
            }
        }

        match self.sensor.subscribe().await {
            Ok(rx) => {
                self.state_tx.send_replace(OrientationState::Active);
                self.pump = Some(tokio::spawn(pump_samples(rx, self.heading_tx.clone(), self.state_tx.clone())));
                info!("🧭 Tracking compass heading");
            }
            Err(err @ SensorError::Unavailable(_)) => {
                warn!("🧭 {}, using fallback heading", err);
                self.fall_back(OrientationState::Unavailable);
            }
            Err(err) => {
                warn!("🧭 Unable to subscribe to orientation samples: {}, using fallback heading", err);
                self.fall_back(OrientationState::Denied);
            }
        }

        self.state()
    }

    /// Asks for consent again after a denial. Other states are left untouched.
    #[instrument(skip(self))]
    pub async fn retry(&mut self) -> OrientationState {
        match self.state() {
            OrientationState::Denied => self.start().await,
            state => {
                debug!(?state, "🧭 Nothing to retry");
                state
            }
        }
    }

    /// Unsubscribes from the sensor. Nothing keeps the heading current anymore, so it returns to the fallback.
    pub fn stop(&mut self) {
        if self.pump.is_some() {
            info!("🧭 Stopped tracking compass heading");
        }
        self.fall_back(OrientationState::Idle);
    }

    pub fn current_heading(&self) -> f64 {
        self.heading_tx.borrow().degrees()
    }

    pub fn state(&self) -> OrientationState {
        *self.state_tx.borrow()
    }

    #[cfg(test)]
    pub fn watch_state(&self) -> watch::Receiver<OrientationState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn heading_receiver(&self) -> watch::Receiver<HeadingSample> {
        self.heading_tx.subscribe()
    }

    /// Fires only when the observable heading changes, not for every raw sample.
    pub fn on_heading_changed<F>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(f64) + Send + 'static,
    {
        listen_changes(self.heading_tx.subscribe(), move |heading: HeadingSample| listener(heading.degrees()))
    }

    fn fall_back(&mut self, state: OrientationState) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.state_tx.send_replace(state);
        reset_heading(&self.heading_tx);
    }
}

impl Drop for OrientationTracker {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump_samples(mut rx: Receiver<OrientationSample>, heading_tx: watch::Sender<HeadingSample>, state_tx: watch::Sender<OrientationState>) {
    while let Some(sample) = rx.recv().await {
        apply_sample(&heading_tx, &sample);
    }

    warn!("🧭 Orientation sensor stopped delivering samples, using fallback heading");
    state_tx.send_replace(OrientationState::Denied);
    reset_heading(&heading_tx);
}

/// Overwrites the heading with the sample's compass reading. Returns whether the heading changed.
fn apply_sample(heading_tx: &watch::Sender<HeadingSample>, sample: &OrientationSample) -> bool {
    let Some(heading) = sample.compass_heading.and_then(HeadingSample::from_compass) else {
        trace!(?sample, "Ignoring orientation sample without a compass heading");
        return false;
    };

    heading_tx.send_if_modified(|current| {
        if *current == heading {
            false
        } else {
            *current = heading;
            true
        }
    })
}

fn reset_heading(heading_tx: &watch::Sender<HeadingSample>) {
    heading_tx.send_if_modified(|current| {
        let fallback = HeadingSample::fallback();
        if *current == fallback {
            false
        } else {
            *current = fallback;
            true
        }
    });
}
