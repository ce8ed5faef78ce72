//! Render request DTOs, resolved render specs and job identifiers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slidecast_config::RenderDefaults;
use url::Url;
use uuid::Uuid;

use crate::error::{RenderError, RenderResult};

/// Render request as submitted by a client. Omitted fields fall back to the
/// configured [`RenderDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Ordered image locators.
    #[serde(default)]
    pub images: Vec<String>,
    /// Output width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Output height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Output frame rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    /// Seconds each image stays on screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_image_seconds: Option<f64>,
    /// How many times the full image sequence plays.
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
}

impl RenderRequest {
    /// Validate the request and fill omitted parameters from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Validation`] when the image list is empty, a
    /// locator is not an absolute `http(s)` URL, a numeric parameter is
    /// out of range, or `images x loop` exceeds `defaults.max_slides`.
    pub fn resolve(self, defaults: &RenderDefaults) -> RenderResult<RenderSpec> {
        if self.images.is_empty() {
            return Err(RenderError::invalid(
                "images",
                "must contain at least one url",
                None,
            ));
        }
        let images = self
            .images
            .iter()
            .map(|raw| parse_locator(raw))
            .collect::<RenderResult<Vec<_>>>()?;

        let geometry = Geometry {
            width: positive("width", self.width.unwrap_or(defaults.width))?,
            height: positive("height", self.height.unwrap_or(defaults.height))?,
            fps: positive("fps", self.fps.unwrap_or(defaults.fps))?,
        };

        let per_image_seconds = self.per_image_seconds.unwrap_or(defaults.per_image_seconds);
        if !per_image_seconds.is_finite() || per_image_seconds <= 0.0 {
            return Err(RenderError::invalid(
                "per_image_seconds",
                "must be a positive number of seconds",
                Some(per_image_seconds.to_string()),
            ));
        }

        let repeat = self.repeat.unwrap_or(defaults.repeat);
        check_slide_count(images.len(), repeat, defaults.max_slides)?;

        Ok(RenderSpec {
            images,
            geometry,
            per_image_seconds,
            repeat,
        })
    }
}

fn check_slide_count(images: usize, repeat: u32, limit: u32) -> RenderResult<()> {
    let passes = u64::from(repeat.max(1));
    let slides = u64::try_from(images)
        .unwrap_or(u64::MAX)
        .saturating_mul(passes);
    if slides <= u64::from(limit) {
        return Ok(());
    }
    if repeat > 1 {
        Err(RenderError::invalid(
            "loop",
            "images times loop exceeds the slide limit",
            Some(repeat.to_string()),
        ))
    } else {
        Err(RenderError::invalid(
            "images",
            "more images than the slide limit allows",
            Some(images.to_string()),
        ))
    }
}

fn parse_locator(raw: &str) -> RenderResult<Url> {
    let invalid = || {
        RenderError::invalid(
            "images",
            "must be absolute http or https urls",
            Some(raw.to_string()),
        )
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn positive(field: &'static str, value: u32) -> RenderResult<u32> {
    if value == 0 {
        return Err(RenderError::invalid(
            field,
            "must be greater than zero",
            Some(value.to_string()),
        ));
    }
    Ok(value)
}

/// Output frame geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

/// Fully resolved, validated render parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    /// Ordered image locators.
    pub images: Vec<Url>,
    /// Output geometry.
    pub geometry: Geometry,
    /// Seconds each image stays on screen.
    pub per_image_seconds: f64,
    /// Sequence repetitions; zero leaves only the held final frame.
    pub repeat: u32,
}

/// Opaque job identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl Display for JobId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// Lifecycle state reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The render is still running.
    Processing,
    /// The output file is ready.
    Done,
    /// The render failed.
    Error,
}

impl JobStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
