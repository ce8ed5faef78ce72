//! Environment loading for [`AppConfig`].
//!
//! # Design
//! - Every setting is optional; unset or blank variables keep the default.
//! - Lookups go through a caller-supplied function so tests never touch the
//!   process environment.

use std::time::Duration;

use crate::error::ConfigResult;
use crate::model::{AppConfig, RenderDefaults};
use crate::validate::{
    non_empty, non_empty_path, parse_ip, parse_port, parse_positive_seconds, parse_positive_u32,
    parse_timeout_secs, parse_u32,
};

/// Listener interface.
pub const ENV_BIND_ADDR: &str = "SLIDECAST_BIND_ADDR";
/// Listener port.
pub const ENV_HTTP_PORT: &str = "SLIDECAST_HTTP_PORT";
/// Directory for finished job videos.
pub const ENV_OUTPUT_DIR: &str = "SLIDECAST_OUTPUT_DIR";
/// Parent directory for per-run scratch space.
pub const ENV_SCRATCH_DIR: &str = "SLIDECAST_SCRATCH_DIR";
/// Encoder executable.
pub const ENV_FFMPEG_PATH: &str = "SLIDECAST_FFMPEG_PATH";
/// Per-download timeout in seconds.
pub const ENV_FETCH_TIMEOUT_SECS: &str = "SLIDECAST_FETCH_TIMEOUT_SECS";
/// Download `User-Agent` header.
pub const ENV_USER_AGENT: &str = "SLIDECAST_USER_AGENT";
/// Default output width.
pub const ENV_DEFAULT_WIDTH: &str = "SLIDECAST_DEFAULT_WIDTH";
/// Default output height.
pub const ENV_DEFAULT_HEIGHT: &str = "SLIDECAST_DEFAULT_HEIGHT";
/// Default output frame rate.
pub const ENV_DEFAULT_FPS: &str = "SLIDECAST_DEFAULT_FPS";
/// Default seconds per image.
pub const ENV_DEFAULT_PER_IMAGE_SECONDS: &str = "SLIDECAST_DEFAULT_PER_IMAGE_SECONDS";
/// Default pass count over the image list.
pub const ENV_DEFAULT_LOOP: &str = "SLIDECAST_DEFAULT_LOOP";
/// Cap on `images x loop` for a single render.
pub const ENV_MAX_SLIDES: &str = "SLIDECAST_MAX_SLIDES";
/// Log level used when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "SLIDECAST_LOG_LEVEL";
/// Log output format.
pub const ENV_LOG_FORMAT: &str = "SLIDECAST_LOG_FORMAT";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns the first invalid variable encountered.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns the first invalid variable encountered.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_BIND_ADDR) {
            config.server.bind_addr = parse_ip(ENV_BIND_ADDR, &raw)?;
        }
        if let Some(raw) = get(ENV_HTTP_PORT) {
            config.server.http_port = parse_port(ENV_HTTP_PORT, &raw)?;
        }
        if let Some(raw) = get(ENV_OUTPUT_DIR) {
            config.storage.output_dir = non_empty_path(ENV_OUTPUT_DIR, &raw)?;
        }
        if let Some(raw) = get(ENV_SCRATCH_DIR) {
            config.storage.scratch_root = Some(non_empty_path(ENV_SCRATCH_DIR, &raw)?);
        }
        if let Some(raw) = get(ENV_FFMPEG_PATH) {
            config.encoder.binary = non_empty_path(ENV_FFMPEG_PATH, &raw)?;
        }
        if let Some(raw) = get(ENV_FETCH_TIMEOUT_SECS) {
            config.fetch.timeout =
                Duration::from_secs(parse_timeout_secs(ENV_FETCH_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_USER_AGENT) {
            config.fetch.user_agent = non_empty(ENV_USER_AGENT, &raw)?;
        }
        config.render_defaults = load_render_defaults(&get)?;
        if let Some(raw) = get(ENV_LOG_LEVEL) {
            config.logging.level = non_empty(ENV_LOG_LEVEL, &raw)?;
        }
        config.logging.format = get(ENV_LOG_FORMAT).map(|raw| raw.trim().to_ascii_lowercase());

        Ok(config)
    }
}

fn load_render_defaults<F>(get: &F) -> ConfigResult<RenderDefaults>
where
    F: Fn(&str) -> Option<String>,
{
    let mut defaults = RenderDefaults::default();
    if let Some(raw) = get(ENV_DEFAULT_WIDTH) {
        defaults.width = parse_positive_u32(ENV_DEFAULT_WIDTH, &raw)?;
    }
    if let Some(raw) = get(ENV_DEFAULT_HEIGHT) {
        defaults.height = parse_positive_u32(ENV_DEFAULT_HEIGHT, &raw)?;
    }
    if let Some(raw) = get(ENV_DEFAULT_FPS) {
        defaults.fps = parse_positive_u32(ENV_DEFAULT_FPS, &raw)?;
    }
    if let Some(raw) = get(ENV_DEFAULT_PER_IMAGE_SECONDS) {
        defaults.per_image_seconds = parse_positive_seconds(ENV_DEFAULT_PER_IMAGE_SECONDS, &raw)?;
    }
    if let Some(raw) = get(ENV_DEFAULT_LOOP) {
        defaults.repeat = parse_u32(ENV_DEFAULT_LOOP, &raw)?;
    }
    if let Some(raw) = get(ENV_MAX_SLIDES) {
        defaults.max_slides = parse_positive_u32(ENV_MAX_SLIDES, &raw)?;
    }
    Ok(defaults)
}
