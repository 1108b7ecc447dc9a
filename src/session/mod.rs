mod render;
mod session;
mod session_config;

pub use render::{RenderAdapter, TracingRenderAdapter, render_loop};
pub use session::{PlacementFeed, Session};
pub use session_config::{ConfigurationError, SessionConfig};
