//! Default values applied when the environment leaves a setting unset.
//!
//! # Design
//! - Centralize defaults so the loader, the models and the tests agree.
//! - Render defaults apply to both the synchronous and the job-based routes.

/// Default listener port.
pub const HTTP_PORT: u16 = 8000;
/// Default per-download timeout in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 60;
/// Browser-like user agent; some image hosts reject unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
/// Default encoder executable, resolved through `PATH`.
pub const FFMPEG_BINARY: &str = "ffmpeg";
/// Directory name (under the system temp dir) holding finished job outputs.
pub const OUTPUT_DIR_NAME: &str = "slidecast/output";
/// Default output width in pixels.
pub const WIDTH: u32 = 1280;
/// Default output height in pixels.
pub const HEIGHT: u32 = 720;
/// Default output frame rate.
pub const FPS: u32 = 30;
/// Default display duration per image, in seconds.
pub const PER_IMAGE_SECONDS: f64 = 2.0;
/// Default number of passes over the image list.
pub const REPEAT: u32 = 1;
/// Upper bound on images times passes in one render.
pub const MAX_SLIDES: u32 = 2_000;
/// Default log level.
pub const LOG_LEVEL: &str = "info";
