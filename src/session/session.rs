use crate::domain::{GeoCoordinate, HeadingSample, Placement};
use crate::geo_math::distance_and_bearing;
use crate::placement_resolver::{PlacementResolver, PlacementSettings, base_height_scale};
use crate::sensors::{LocationService, OrientationSensor, WatchOptions};
use crate::session::{ConfigurationError, SessionConfig};
use crate::tracker::{OrientationState, OrientationTracker, PositionState, PositionTracker, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument};

/// Read side of a session, resolves placements from the latest tracker values.
///
/// Cheap to clone, so the render loop and listeners can each own one.
#[derive(Clone, Debug)]
pub struct PlacementFeed {
    resolver: PlacementResolver,
    target: GeoCoordinate,
    base_scale: f64,
    heading_rx: watch::Receiver<HeadingSample>,
    position_rx: watch::Receiver<Option<GeoCoordinate>>,
}

impl PlacementFeed {
    /// Resolves a placement from the most recent heading and position.
    pub fn current(&self) -> Placement {
        let heading = self.heading_rx.borrow().degrees();
        let position = *self.position_rx.borrow();
        self.resolver.resolve(position.as_ref(), &self.target, heading, self.base_scale)
    }

    /// Waits until either tracker publishes a change and returns the recomputed placement.
    ///
    /// Returns `None` once the trackers are gone.
    pub async fn changed(&mut self) -> Option<Placement> {
        tokio::select! {
            result = self.heading_rx.changed() => result.ok()?,
            result = self.position_rx.changed() => result.ok()?,
        }

        let heading = self.heading_rx.borrow_and_update().degrees();
        let position = *self.position_rx.borrow_and_update();
        Some(self.resolver.resolve(position.as_ref(), &self.target, heading, self.base_scale))
    }
}

/// One viewing session: a fixed target, both trackers and the resolver that combines them.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    resolver: PlacementResolver,
    orientation: OrientationTracker,
    position: PositionTracker,
    base_scale: f64,
    running_tx: watch::Sender<bool>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        settings: PlacementSettings,
        orientation_sensor: Arc<dyn OrientationSensor>,
        location_service: Arc<dyn LocationService>,
        watch_options: WatchOptions,
    ) -> Result<Self, ConfigurationError> {
        let resolver = PlacementResolver::new(settings, config.placement_height_m())?;
        let base_scale = base_height_scale(config.object_height_m(), None);
        let (running_tx, _) = watch::channel(true);

        Ok(Session {
            config,
            resolver,
            orientation: OrientationTracker::new(orientation_sensor),
            position: PositionTracker::new(location_service, watch_options),
            base_scale,
            running_tx,
        })
    }

    /// Uses the loaded model's own height to scale it to the configured real-world height.
    ///
    /// Feeds handed out earlier keep the scale they were created with.
    pub fn set_model_native_height(&mut self, model_native_height: Option<f64>) {
        self.base_scale = base_height_scale(self.config.object_height_m(), model_native_height);
        info!(base_scale = self.base_scale, "📐 Model scaled to {}m", self.config.object_height_m());
    }

    /// Acquires both sensors concurrently. Sensor failures only put the affected tracker in its fallback.
    #[instrument(skip_all, fields(session = self.config.display_name()))]
    pub async fn start(&mut self) {
        info!("🛰️ Starting sensors...");
        let (orientation_state, _) = tokio::join!(self.orientation.start(), self.position.start());
        info!(orientation = ?orientation_state, position = ?self.position.state(), "🛰️ Starting sensors... OK");
    }

    /// Asks for orientation consent again after a denial.
    pub async fn retry_orientation(&mut self) -> OrientationState {
        self.orientation.retry().await
    }

    pub fn placement(&self) -> Placement {
        self.feed().current()
    }

    pub fn feed(&self) -> PlacementFeed {
        PlacementFeed {
            resolver: self.resolver.clone(),
            target: *self.config.target(),
            base_scale: self.base_scale,
            heading_rx: self.orientation.heading_receiver(),
            position_rx: self.position.position_receiver(),
        }
    }

    /// Recomputes the placement every time the heading or the position changes.
    ///
    /// The listener only fires when the recomputed placement differs from the one it last saw.
    pub fn on_placement_changed<F>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(Placement) + Send + 'static,
    {
        let mut feed = self.feed();
        let mut last = feed.current();
        Subscription::new(tokio::spawn(async move {
            while let Some(placement) = feed.changed().await {
                if placement != last {
                    last = placement;
                    listener(placement);
                }
            }
        }))
    }

    pub fn distance_to_target(&self) -> Option<f64> {
        self.position
            .current_position()
            .map(|position| distance_and_bearing(&position, self.config.target()).distance_m())
    }

    /// Human readable distance, or why there is none.
    pub fn distance_readout(&self) -> String {
        if let Some(distance) = self.distance_to_target() {
            return format!("{:.1} meters", distance);
        }

        match self.position.state() {
            PositionState::Unavailable => "Geolocation not supported".to_string(),
            _ if self.position.last_error().is_some() => "Location unavailable".to_string(),
            _ => "Waiting for location...".to_string(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn orientation(&self) -> &OrientationTracker {
        &self.orientation
    }

    pub fn position(&self) -> &PositionTracker {
        &self.position
    }

    /// Flips to `false` when the session shuts down.
    pub fn running(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    /// Unsubscribes both sensors and stops the render loop.
    pub fn shutdown(&mut self) {
        self.orientation.stop();
        self.position.stop();
        self.running_tx.send_replace(false);
        info!("👋 Session '{}' ended", self.config.display_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FALLBACK_HEADING_DEGREES;
    use crate::sensors::fake::{FakeLocationService, FakeOrientationSensor, compass};
    use crate::sensors::{FixError, PermissionState};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use test_log::test;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);
    const TARGET_LATITUDE: f64 = 51.8615899;
    const TARGET_LONGITUDE: f64 = 4.3580323;

    fn config() -> SessionConfig {
        SessionConfig::new(GeoCoordinate::new(TARGET_LATITUDE, TARGET_LONGITUDE).unwrap()).with_placement_height(1.0)
    }

    fn session(orientation: impl OrientationSensor + 'static, location: impl LocationService + 'static) -> Session {
        Session::new(config(), PlacementSettings::default(), Arc::new(orientation), Arc::new(location), WatchOptions::default()).expect("valid session")
    }

    fn south_of_target(meters: f64) -> GeoCoordinate {
        GeoCoordinate::new(TARGET_LATITUDE - meters / 111_195.0, TARGET_LONGITUDE).unwrap()
    }

    #[test(tokio::test)]
    async fn before_the_first_fix_the_default_placement_is_used() {
        let (orientation, _samples) = FakeOrientationSensor::available();
        let (location, _updates) = FakeLocationService::available();
        let mut session = session(orientation, location);

        session.start().await;

        assert_eq!(session.position().current_position(), None);
        assert_eq!(session.placement().local_position, Vector3::new(0.0, 1.0, -10.0));
        assert_eq!(session.distance_readout(), "Waiting for location...");
    }

    #[test(tokio::test)]
    async fn missing_sensors_never_abort_the_session() {
        let mut session = session(FakeOrientationSensor::unavailable(), FakeLocationService::unavailable());

        session.start().await;

        assert_eq!(session.orientation().state(), OrientationState::Unavailable);
        assert_eq!(session.orientation().current_heading(), FALLBACK_HEADING_DEGREES);
        assert_eq!(session.placement().local_position, Vector3::new(0.0, 1.0, -10.0));
        assert_eq!(session.distance_readout(), "Geolocation not supported");
    }

    #[test(tokio::test)]
    async fn a_denied_compass_still_places_the_target_by_bearing() {
        let (orientation, _samples) = FakeOrientationSensor::with_permission(vec![Ok(PermissionState::Denied)]);
        let (location, updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _subscription = session.on_placement_changed(move |placement| {
            let _ = seen_tx.send(placement);
        });
        session.start().await;

        updates.send(Ok(south_of_target(50.0))).await.unwrap();

        let placement = timeout(WAIT, seen_rx.recv()).await.unwrap().expect("placement listener closed");
        assert_abs_diff_eq!(placement.local_position.z, -5.0, epsilon = 0.01);
        assert_eq!(session.distance_readout(), "50.0 meters");
    }

    #[test(tokio::test)]
    async fn a_heading_change_recomputes_the_placement() {
        let (orientation, samples) = FakeOrientationSensor::available();
        let (location, updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _subscription = session.on_placement_changed(move |placement| {
            let _ = seen_tx.send(placement);
        });
        session.start().await;

        updates.send(Ok(south_of_target(50.0))).await.unwrap();
        timeout(WAIT, seen_rx.recv()).await.unwrap();
        samples.send(compass(90.0)).await.unwrap();

        let placement = timeout(WAIT, seen_rx.recv()).await.unwrap().expect("placement listener closed");
        assert_abs_diff_eq!(placement.local_position.x, -5.0, epsilon = 0.01);
        assert_eq!(placement, session.placement());
    }

    #[test(tokio::test)]
    async fn a_heading_change_without_a_fix_leaves_the_placement_alone() {
        let (orientation, samples) = FakeOrientationSensor::available();
        let (location, updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _subscription = session.on_placement_changed(move |placement| {
            let _ = seen_tx.send(placement);
        });
        session.start().await;

        samples.send(compass(90.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        updates.send(Ok(south_of_target(50.0))).await.unwrap();

        let placement = timeout(WAIT, seen_rx.recv()).await.unwrap().expect("placement listener closed");
        assert_abs_diff_eq!(placement.local_position.x, -5.0, epsilon = 0.01);
    }

    #[test(tokio::test)]
    async fn fix_errors_show_up_in_the_readout() {
        let (orientation, _samples) = FakeOrientationSensor::available();
        let (location, updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _subscription = session.position().on_error(move |error| {
            let _ = seen_tx.send(error);
        });
        session.start().await;

        updates.send(Err(FixError::Timeout)).await.unwrap();
        timeout(WAIT, seen_rx.recv()).await.unwrap();

        assert_eq!(session.distance_readout(), "Location unavailable");
    }

    #[test(tokio::test)]
    async fn model_native_height_sets_the_base_scale() {
        let config = config().with_object_height(3.0);
        let (orientation, _samples) = FakeOrientationSensor::available();
        let (location, _updates) = FakeLocationService::available();
        let mut session = Session::new(config, PlacementSettings::default(), Arc::new(orientation), Arc::new(location), WatchOptions::default()).unwrap();

        session.set_model_native_height(Some(1.5));

        assert_eq!(session.placement().scale, 2.0);
    }

    #[test(tokio::test)]
    async fn invalid_settings_fail_before_start() {
        let (orientation, _samples) = FakeOrientationSensor::available();
        let (location, _updates) = FakeLocationService::available();
        let settings = PlacementSettings {
            min_scale: -1.0,
            ..PlacementSettings::default()
        };

        let result = Session::new(config(), settings, Arc::new(orientation), Arc::new(location), WatchOptions::default());

        assert!(matches!(result, Err(ConfigurationError::InvalidSetting { name: "min_scale", .. })));
    }

    #[test(tokio::test)]
    async fn orientation_can_be_retried_after_denial() {
        let (orientation, _samples) = FakeOrientationSensor::with_permission(vec![Ok(PermissionState::Denied), Ok(PermissionState::Granted)]);
        let (location, _updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        session.start().await;

        assert_eq!(session.orientation().state(), OrientationState::Denied);
        assert_eq!(session.retry_orientation().await, OrientationState::Active);
    }

    #[test(tokio::test)]
    async fn shutdown_unsubscribes_both_sensors() {
        let (orientation, samples) = FakeOrientationSensor::available();
        let (location, updates) = FakeLocationService::available();
        let mut session = session(orientation, location);
        let running = session.running();
        session.start().await;

        session.shutdown();

        timeout(WAIT, samples.closed()).await.expect("orientation samples still subscribed");
        timeout(WAIT, updates.closed()).await.expect("location watch still open");
        assert!(!*running.borrow());
    }
}
