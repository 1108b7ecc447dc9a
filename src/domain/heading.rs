use crate::extensions::degrees_ext::NormalizeDegrees;

/// Compass heading reported while no usable orientation sensor is available.
pub const FALLBACK_HEADING_DEGREES: f64 = 0.0;

/// The viewer's compass-facing direction, always within `[0, 360)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadingSample {
    compass_heading_degrees: f64,
}

impl HeadingSample {
    /// Wraps a raw compass reading, returns `None` for non-finite input.
    pub fn from_compass(degrees: f64) -> Option<Self> {
        degrees.is_finite().then(|| HeadingSample {
            compass_heading_degrees: degrees.normalize_degrees(),
        })
    }

    pub fn fallback() -> Self {
        HeadingSample {
            compass_heading_degrees: FALLBACK_HEADING_DEGREES,
        }
    }

    pub fn degrees(&self) -> f64 {
        self.compass_heading_degrees
    }
}

impl Default for HeadingSample {
    fn default() -> Self {
        HeadingSample::fallback()
    }
}
