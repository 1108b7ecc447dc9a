use crate::domain::{CoordinateError, GeoCoordinate};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use url::{Url, form_urlencoded};

pub const DEFAULT_OBJECT_HEIGHT_M: f64 = 1.0;
pub const DEFAULT_PLACEMENT_HEIGHT_M: f64 = 0.0;
const DEFAULT_DISPLAY_NAME: &str = "3D Model";

/// Everything a viewing session needs to know about its single target.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    target: GeoCoordinate,
    object_height_m: f64,
    placement_height_m: f64,
    model_url: Option<String>,
    name: Option<String>,
    location_description: Option<String>,
}

impl SessionConfig {
    #[cfg(test)]
    pub fn new(target: GeoCoordinate) -> Self {
        SessionConfig {
            target,
            object_height_m: DEFAULT_OBJECT_HEIGHT_M,
            placement_height_m: DEFAULT_PLACEMENT_HEIGHT_M,
            model_url: None,
            name: None,
            location_description: None,
        }
    }

    /// Parses a share link (`https://host/ar-viewer.html?lat=..&lng=..`) or a bare query string.
    ///
    /// `lat` and `lng` are required, `height` defaults to 1 m and `placement` to 0 m.
    /// Any malformed number fails instead of reaching the placement math.
    pub fn parse(link: &str) -> Result<Self, ConfigurationError> {
        let link = link.trim();
        let params: HashMap<String, String> = if link.contains("://") {
            let url = Url::parse(link).map_err(|e| ConfigurationError::InvalidLink(e.to_string()))?;
            url.query_pairs().into_owned().collect()
        } else {
            form_urlencoded::parse(link.trim_start_matches('?').as_bytes()).into_owned().collect()
        };
        debug!(?params, "Parsed session parameters");

        let latitude = number(&params, "lat")?.ok_or(ConfigurationError::MissingParameter("lat"))?;
        let longitude = number(&params, "lng")?.ok_or(ConfigurationError::MissingParameter("lng"))?;
        let target = GeoCoordinate::new(latitude, longitude)?;

        let object_height_m = number(&params, "height")?.unwrap_or(DEFAULT_OBJECT_HEIGHT_M);
        if object_height_m <= 0.0 {
            return Err(ConfigurationError::MalformedParameter {
                name: "height",
                value: object_height_m.to_string(),
            });
        }

        let placement_height_m = number(&params, "placement")?.unwrap_or(DEFAULT_PLACEMENT_HEIGHT_M);

        Ok(SessionConfig {
            target,
            object_height_m,
            placement_height_m,
            model_url: text(&params, "model"),
            name: text(&params, "name"),
            location_description: text(&params, "location"),
        })
    }

    #[cfg(test)]
    pub fn with_object_height(mut self, object_height_m: f64) -> Self {
        self.object_height_m = object_height_m;
        self
    }

    #[cfg(test)]
    pub fn with_placement_height(mut self, placement_height_m: f64) -> Self {
        self.placement_height_m = placement_height_m;
        self
    }

    pub fn target(&self) -> &GeoCoordinate {
        &self.target
    }

    pub fn object_height_m(&self) -> f64 {
        self.object_height_m
    }

    pub fn placement_height_m(&self) -> f64 {
        self.placement_height_m
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    pub fn location_label(&self) -> String {
        match &self.location_description {
            Some(description) => description.clone(),
            None => format!("Location: {}, {}", self.target.latitude(), self.target.longitude()),
        }
    }

    pub fn size_label(&self) -> String {
        format!("Size: {}m tall", self.object_height_m)
    }
}

fn number(params: &HashMap<String, String>, name: &'static str) -> Result<Option<f64>, ConfigurationError> {
    match params.get(name).map(|value| value.trim()) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .map(Some)
            .ok_or_else(|| ConfigurationError::MalformedParameter {
                name,
                value: value.to_string(),
            }),
    }
}

fn text(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params.get(name).map(|value| value.trim()).filter(|value| !value.is_empty()).map(str::to_string)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("invalid session link: {0}")]
    InvalidLink(String),
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("malformed value '{value}' for parameter '{name}'")]
    MalformedParameter { name: &'static str, value: String },
    #[error("invalid target location: {0}")]
    InvalidTarget(#[from] CoordinateError),
    #[error("invalid setting '{name}': {value}")]
    InvalidSetting { name: &'static str, value: f64 },
}
