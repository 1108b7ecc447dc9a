use crate::placement_resolver::PlacementSettings;
use crate::sensors::WatchOptions;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    location: WatchOptions,
    #[serde(default)]
    placement: PlacementSettings,
    session: SessionSource,
    replay: Replay,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("GEO_OVERLAY").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn location(&self) -> &WatchOptions {
        &self.location
    }

    pub fn placement(&self) -> &PlacementSettings {
        &self.placement
    }

    pub fn session(&self) -> &SessionSource {
        &self.session
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }
}

#[derive(Debug, Deserialize)]
pub struct Core {
    #[serde(with = "humantime_serde")]
    frame_interval: Duration,
}

impl Core {
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSource {
    link: String,
}

impl SessionSource {
    pub fn link(&self) -> &str {
        &self.link
    }
}

#[derive(Debug, Deserialize)]
pub struct Replay {
    trace_file: String,
    #[serde(with = "humantime_serde")]
    linger: Duration,
}

impl Replay {
    pub fn trace_file(&self) -> &str {
        &self.trace_file
    }

    /// How long to keep rendering after the last recorded event.
    pub fn linger(&self) -> Duration {
        self.linger
    }
}
