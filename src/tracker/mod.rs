mod orientation;
mod position;
mod subscription;

pub use orientation::{OrientationState, OrientationTracker};
pub use position::{PositionState, PositionTracker};
pub use subscription::Subscription;
