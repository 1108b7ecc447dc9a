use crate::domain::GeoCoordinate;
use crate::sensors::{FixError, LocationService, LocationUpdate, SensorError, WatchOptions};
use crate::tracker::subscription::{Subscription, listen, listen_changes};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionState {
    Idle,
    Watching,
    Unavailable,
}

/// Owns the user's latest location fix. Each fix replaces the previous one, no filtering.
#[derive(Debug)]
pub struct PositionTracker {
    service: Arc<dyn LocationService>,
    options: WatchOptions,
    position_tx: watch::Sender<Option<GeoCoordinate>>,
    error_tx: watch::Sender<Option<FixError>>,
    state_tx: watch::Sender<PositionState>,
    pump: Option<JoinHandle<()>>,
}

impl PositionTracker {
    pub fn new(service: Arc<dyn LocationService>, options: WatchOptions) -> Self {
        let (position_tx, _) = watch::channel(None);
        let (error_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(PositionState::Idle);

        PositionTracker {
            service,
            options,
            position_tx,
            error_tx,
            state_tx,
            pump: None,
        }
    }

    /// Opens a continuous location watch.
    ///
    /// An absent location service is terminal for this tracker, the position stays unknown.
    /// A watch the platform closed leaves the tracker `Idle`, so it can be opened again.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), SensorError> {
        if self.state() == PositionState::Watching {
            debug!("📍 Location watch already open");
            return Ok(());
        }

        info!(high_accuracy = self.options.high_accuracy, timeout = ?self.options.timeout, "📍 Opening location watch...");
        match self.service.watch(self.options.clone()).await {
            Ok(rx) => {
                self.state_tx.send_replace(PositionState::Watching);
                self.pump = Some(tokio::spawn(pump_fixes(rx, self.position_tx.clone(), self.error_tx.clone(), self.state_tx.clone())));
                info!("📍 Opening location watch... OK");
                Ok(())
            }
            Err(err) => {
                warn!("📍 Opening location watch... failed, {}", err);
                self.state_tx.send_replace(PositionState::Unavailable);
                Err(err)
            }
        }
    }

    /// Closes the location watch. The last known position is kept.
    pub fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            info!("📍 Closed location watch");
        }
        self.state_tx.send_if_modified(|state| {
            if *state == PositionState::Watching {
                *state = PositionState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// The latest fix, `None` until the first one arrives.
    pub fn current_position(&self) -> Option<GeoCoordinate> {
        *self.position_tx.borrow()
    }

    pub fn current_accuracy(&self) -> Option<f64> {
        self.current_position().and_then(|position| position.accuracy())
    }

    pub fn last_error(&self) -> Option<FixError> {
        *self.error_tx.borrow()
    }

    pub fn state(&self) -> PositionState {
        *self.state_tx.borrow()
    }

    #[cfg(test)]
    pub fn watch_state(&self) -> watch::Receiver<PositionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn position_receiver(&self) -> watch::Receiver<Option<GeoCoordinate>> {
        self.position_tx.subscribe()
    }

    pub fn on_position_changed<F>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(GeoCoordinate) + Send + 'static,
    {
        listen_changes(self.position_tx.subscribe(), move |position: Option<GeoCoordinate>| {
            if let Some(position) = position {
                listener(position);
            }
        })
    }

    /// Reports transient fix errors. The watch keeps running after each of them.
    pub fn on_error<F>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(FixError) + Send + 'static,
    {
        listen(self.error_tx.subscribe(), move |error: Option<FixError>| {
            if let Some(error) = error {
                listener(error);
            }
        })
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump_fixes(
    mut rx: Receiver<LocationUpdate>,
    position_tx: watch::Sender<Option<GeoCoordinate>>,
    error_tx: watch::Sender<Option<FixError>>,
    state_tx: watch::Sender<PositionState>,
) {
    while let Some(update) = rx.recv().await {
        apply_update(&position_tx, &error_tx, update);
    }

    warn!("📍 Location service closed the watch, keeping the last known position");
    state_tx.send_replace(PositionState::Idle);
}

fn apply_update(position_tx: &watch::Sender<Option<GeoCoordinate>>, error_tx: &watch::Sender<Option<FixError>>, update: LocationUpdate) {
    match update {
        Ok(fix) => {
            debug!(latitude = fix.latitude(), longitude = fix.longitude(), accuracy = ?fix.accuracy(), "📍 Received location fix");
            position_tx.send_if_modified(|current| {
                if *current == Some(fix) {
                    false
                } else {
                    *current = Some(fix);
                    true
                }
            });
        }
        Err(error) => {
            warn!("⚠️ Location fix unavailable: {}", error);
            error_tx.send_replace(Some(error));
        }
    }
}
