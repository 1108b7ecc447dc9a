mod geo_coordinate;
mod heading;
mod placement;

pub use geo_coordinate::{CoordinateError, GeoCoordinate};
pub use heading::{FALLBACK_HEADING_DEGREES, HeadingSample};
pub use placement::Placement;
