use crate::app_config::AppConfig;
use crate::geo_math::distance_and_bearing;
use crate::sensors::replay::{ReplayLocationService, ReplayOrientationSensor, SensorTrace};
use crate::session::{RenderAdapter, Session, SessionConfig, TracingRenderAdapter, render_loop};
use std::error::Error;
use std::sync::Arc;
use tokio::{signal, task, time};
use tracing::{debug, info, warn};

mod app_config;
mod domain;
mod extensions;
mod geo_coordinate_deserializer;
mod geo_math;
mod placement_resolver;
mod sensors;
mod session;
mod tracker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    // A link passed on the command line wins over the configured one
    let link = std::env::args().nth(1).unwrap_or_else(|| config.session().link().to_string());
    let session_config = SessionConfig::parse(&link)?;
    info!(
        model = session_config.model_url().unwrap_or("<fallback>"),
        "✅  Configured '{}', {}, {}",
        session_config.display_name(),
        session_config.location_label(),
        session_config.size_label()
    );

    let trace = SensorTrace::load(config.replay().trace_file()).await?;
    let target = *session_config.target();
    let mut session = Session::new(
        session_config,
        config.placement().clone(),
        Arc::new(ReplayOrientationSensor::new(&trace)),
        Arc::new(ReplayLocationService::new(&trace)),
        config.location().clone(),
    )?;

    let mut adapter = TracingRenderAdapter::new(trace.model_native_height());
    session.set_model_native_height(adapter.model_native_height());

    let feed = session.feed();
    let running = session.running();
    let frame_interval = config.core().frame_interval();
    let render = task::spawn(async move { render_loop(&mut adapter, feed, frame_interval, running).await });
    info!("✅  Started render loop");

    let _distance = session.position().on_position_changed(move |position| {
        let vector = distance_and_bearing(&position, &target);
        info!(
            accuracy = ?position.accuracy(),
            bearing = vector.bearing_degrees(),
            "📏 {:.1} meters to target",
            vector.distance_m()
        );
    });
    let _heading = session.orientation().on_heading_changed(|heading| debug!("🧭 Heading {:.1}°", heading));
    let _fix_errors = session.position().on_error(|error| info!("📏 Location unavailable, {}", error));
    let placements = session.on_placement_changed(|placement| {
        debug!(
            x = placement.local_position.x,
            y = placement.local_position.y,
            z = placement.local_position.z,
            scale = placement.scale,
            "🎯 Placement recomputed"
        )
    });

    session.start().await;
    info!(orientation = ?session.orientation().state(), "🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    let finished = time::sleep(trace.duration() + config.replay().linger());
    tokio::pin!(finished);
    let mut retry_at = trace.permission_retry_at().map(|after| time::Instant::now() + after);

    loop {
        tokio::select! {
            _ = time::sleep_until(retry_at.unwrap_or_else(time::Instant::now)), if retry_at.is_some() => {
                retry_at = None;
                info!("👆 Retrying orientation permission...");
                let state = session.retry_orientation().await;
                info!(orientation = ?state, "👆 Retrying orientation permission... done");
            }
            _ = &mut finished => {
                info!("📼 Sensor trace finished");
                break;
            }
            result = signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!("⚠️ Unable to listen for Ctrl-C: {}", err);
                }
                info!("🛑 Interrupted");
                break;
            }
        }
    }

    let placement = session.placement();
    info!(
        accuracy = ?session.position().current_accuracy(),
        heading = session.orientation().current_heading(),
        z = placement.local_position.z,
        scale = placement.scale,
        "📏 {}",
        session.distance_readout()
    );
    placements.unsubscribe();
    session.shutdown();
    debug!("Session '{}' torn down", session.config().display_name());

    let frames = render.await?;
    info!("✅  Rendered {} frames", frames);

    Ok(())
}
