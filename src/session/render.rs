use crate::domain::Placement;
use crate::session::PlacementFeed;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument};

/// The scene side of a session: receives one placement per frame.
pub trait RenderAdapter: Send {
    /// Height of the loaded model in its own units, `None` when unknown.
    fn model_native_height(&self) -> Option<f64>;

    fn apply(&mut self, placement: &Placement, frame: u64);
}

/// Pulls the latest placement on every frame tick until `running` turns `false`.
///
/// Sensor updates never drive frames, a slow sensor only means the same placement is drawn again.
#[instrument(skip_all, fields(frame_interval = ?frame_interval))]
pub async fn render_loop<R: RenderAdapter>(adapter: &mut R, feed: PlacementFeed, frame_interval: Duration, mut running: watch::Receiver<bool>) -> u64 {
    let mut ticker = interval(frame_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame = 0;

    info!("🎞️ Render loop started");
    while *running.borrow_and_update() {
        tokio::select! {
            _ = ticker.tick() => {
                adapter.apply(&feed.current(), frame);
                frame += 1;
            }
            result = running.changed() => {
                if result.is_err() {
                    break;
                }
            }
        }
    }
    info!(frames = frame, "🎞️ Render loop stopped");

    frame
}

/// Render adapter without a scene, logs every placement change instead.
#[derive(Debug, Default)]
pub struct TracingRenderAdapter {
    model_native_height: Option<f64>,
    last: Option<Placement>,
}

impl TracingRenderAdapter {
    pub fn new(model_native_height: Option<f64>) -> Self {
        TracingRenderAdapter {
            model_native_height,
            last: None,
        }
    }
}

impl RenderAdapter for TracingRenderAdapter {
    fn model_native_height(&self) -> Option<f64> {
        self.model_native_height
    }

    fn apply(&mut self, placement: &Placement, frame: u64) {
        if self.last.as_ref() == Some(placement) {
            return;
        }

        let position = placement.local_position;
        info!(
            frame,
            x = position.x,
            y = position.y,
            z = position.z,
            scale = placement.scale,
            "🖼️ Moved model"
        );
        debug!(facing = ?placement.facing_target, "🖼️ Model facing");
        self.last = Some(*placement);
    }
}
