//! External encoder invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use slidecast_config::EncoderConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{EncodeError, ExitKind};
use crate::model::Geometry;

/// Lines of encoder diagnostics retained on failure.
const STDERR_TAIL_LINES: usize = 20;

/// Turns a concat manifest into an H.264 MP4.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Encode the playlist at `manifest` into `output` with the given geometry,
    /// returning the output path on success.
    async fn encode(
        &self,
        manifest: &Path,
        geometry: Geometry,
        output: &Path,
    ) -> Result<PathBuf, EncodeError>;
}

/// [`VideoEncoder`] that shells out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    /// Build an encoder that runs the configured binary.
    #[must_use]
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            binary: config.binary.clone(),
        }
    }

    /// Filter chain: scale to cover the frame, center-crop, normalise pixels.
    #[must_use]
    pub fn video_filter(geometry: Geometry) -> String {
        let Geometry { width, height, .. } = geometry;
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,\
             crop={width}:{height},format=yuv420p"
        )
    }

    /// Full argument list passed to the encoder binary.
    #[must_use]
    pub fn arguments(manifest: &Path, geometry: Geometry, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y",
            "-loglevel",
            "error",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(manifest.as_os_str().to_owned());
        args.extend(
            [
                "-vf".to_string(),
                Self::video_filter(geometry),
                "-r".to_string(),
                geometry.fps.to_string(),
                "-an".to_string(),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-movflags".to_string(),
                "+faststart".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(
        &self,
        manifest: &Path,
        geometry: Geometry,
        output: &Path,
    ) -> Result<PathBuf, EncodeError> {
        debug!(
            binary = %self.binary.display(),
            width = geometry.width,
            height = geometry.height,
            fps = geometry.fps,
            "starting encoder"
        );
        let result = Command::new(&self.binary)
            .args(Self::arguments(manifest, geometry, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !result.status.success() {
            let status = ExitKind::from(result.status);
            let stderr = stderr_tail(&result.stderr);
            warn!(%status, "encoder exited unsuccessfully");
            return Err(EncodeError::Exit { status, stderr });
        }

        match tokio::fs::try_exists(output).await {
            Ok(true) => Ok(output.to_path_buf()),
            _ => Err(EncodeError::MissingOutput {
                path: output.to_path_buf(),
            }),
        }
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
