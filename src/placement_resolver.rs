use crate::domain::{FALLBACK_HEADING_DEGREES, GeoCoordinate, Placement};
use crate::extensions::degrees_ext::NormalizeDegrees;
use crate::geo_math::distance_and_bearing;
use crate::session::ConfigurationError;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;

/// Tuning constants for mapping real-world distances into scene space.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementSettings {
    /// Distances beyond this are drawn as if the target were this far away.
    pub max_visible_distance_m: f64,
    /// Meters per scene unit.
    pub distance_compression_factor: f64,
    /// Distance at which the scale reaches its floor.
    pub scale_falloff_m: f64,
    pub min_scale: f64,
    /// Scene distance straight ahead used until the first location fix.
    pub default_distance: f64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        PlacementSettings {
            max_visible_distance_m: 1000.0,
            distance_compression_factor: 10.0,
            scale_falloff_m: 100.0,
            min_scale: 0.3,
            default_distance: 10.0,
        }
    }
}

impl PlacementSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let positive = [
            ("max_visible_distance_m", self.max_visible_distance_m),
            ("distance_compression_factor", self.distance_compression_factor),
            ("scale_falloff_m", self.scale_falloff_m),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::InvalidSetting { name, value });
            }
        }

        if !(self.min_scale > 0.0 && self.min_scale <= 1.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "min_scale",
                value: self.min_scale,
            });
        }

        if !(self.default_distance.is_finite() && self.default_distance >= 0.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "default_distance",
                value: self.default_distance,
            });
        }

        Ok(())
    }
}

/// Angle of the target relative to where the viewer is facing, within `[0, 360)`.
pub fn relative_angle(bearing_degrees: f64, heading_degrees: f64) -> f64 {
    (bearing_degrees - heading_degrees).normalize_degrees()
}

/// Scale that makes a model of `model_native_height` scene units appear `object_height_m` tall.
///
/// Models without a usable native height are treated as one unit tall.
pub fn base_height_scale(object_height_m: f64, model_native_height: Option<f64>) -> f64 {
    match model_native_height {
        Some(native_height) if native_height.is_finite() && native_height > 0.0 => object_height_m / native_height,
        _ => object_height_m,
    }
}

/// Turns a user position, a target and a compass heading into a [`Placement`].
///
/// Resolution is a pure function of its inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementResolver {
    settings: PlacementSettings,
    placement_height: f64,
}

impl PlacementResolver {
    pub fn new(settings: PlacementSettings, placement_height: f64) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        if !placement_height.is_finite() {
            return Err(ConfigurationError::InvalidSetting {
                name: "placement_height",
                value: placement_height,
            });
        }

        Ok(PlacementResolver { settings, placement_height })
    }

    pub fn resolve(&self, user: Option<&GeoCoordinate>, target: &GeoCoordinate, heading: f64, model_base_height_scale: f64) -> Placement {
        let height = self.placement_height;
        let facing_target = Point3::new(0.0, height, 0.0);
        let base_scale = if model_base_height_scale.is_finite() && model_base_height_scale > 0.0 {
            model_base_height_scale
        } else {
            1.0
        };

        let Some(user) = user else {
            return Placement {
                local_position: Vector3::new(0.0, height, -self.settings.default_distance),
                facing_target,
                scale: base_scale,
            };
        };

        let heading = if heading.is_finite() { heading } else { FALLBACK_HEADING_DEGREES };
        let vector = distance_and_bearing(user, target);
        let angle = relative_angle(vector.bearing_degrees(), heading).to_radians();

        let visible_distance = vector.distance_m().min(self.settings.max_visible_distance_m) / self.settings.distance_compression_factor;
        let local_position = Vector3::new(angle.sin() * visible_distance, height, -angle.cos() * visible_distance);

        let falloff = (1.0 - vector.distance_m() / self.settings.scale_falloff_m).clamp(self.settings.min_scale, 1.0);

        Placement {
            local_position,
            facing_target,
            scale: base_scale * falloff,
        }
    }
}
