//! Typed configuration sections.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Image download settings.
    pub fetch: FetchConfig,
    /// External encoder settings.
    pub encoder: EncoderConfig,
    /// Output and scratch locations.
    pub storage: StorageConfig,
    /// Values applied to render requests that omit a parameter.
    pub render_defaults: RenderDefaults,
    /// Logging preferences.
    pub logging: LogSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// TCP port, never zero.
    pub http_port: u16,
}

impl ServerConfig {
    /// Socket address the listener binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: defaults::HTTP_PORT,
        }
    }
}

/// Image download settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Upper bound for a single download, connect through body.
    pub timeout: Duration,
    /// `User-Agent` header sent with every download.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(defaults::FETCH_TIMEOUT_SECS),
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

/// External encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Encoder executable path or name resolved through `PATH`.
    pub binary: PathBuf,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(defaults::FFMPEG_BINARY),
        }
    }
}

/// Output and scratch locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory where finished job videos are kept.
    pub output_dir: PathBuf,
    /// Parent for per-run scratch directories; the system temp dir when unset.
    pub scratch_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir().join(defaults::OUTPUT_DIR_NAME),
            scratch_root: None,
        }
    }
}

/// Render parameters used when a request leaves them out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderDefaults {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: u32,
    /// Display duration per image, in seconds.
    pub per_image_seconds: f64,
    /// Number of passes over the image list.
    pub repeat: u32,
    /// Largest accepted `images x loop` product; requests above it are rejected.
    pub max_slides: u32,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            width: defaults::WIDTH,
            height: defaults::HEIGHT,
            fps: defaults::FPS,
            per_image_seconds: defaults::PER_IMAGE_SECONDS,
            repeat: defaults::REPEAT,
            max_slides: defaults::MAX_SLIDES,
        }
    }
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when unset.
    pub format: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
