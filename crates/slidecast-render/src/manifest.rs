//! ffconcat playlist construction.
//!
//! The concat demuxer ignores the duration of the final entry, so the last
//! image is repeated once more without a duration to make its own duration
//! take effect.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{RenderError, RenderResult};

/// Header line required by the concat demuxer.
pub const CONCAT_HEADER: &str = "ffconcat version 1.0";

/// One playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Local image path.
    pub asset: PathBuf,
    /// Seconds on screen; `None` only for the trailing sentinel.
    pub duration: Option<f64>,
}

/// Ordered concat playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    directives: Vec<Directive>,
}

impl Manifest {
    /// Build a playlist that shows `assets` in order, `repeat` times, each for
    /// `per_image_seconds`, followed by the sentinel entry.
    ///
    /// Produces `assets.len() * repeat + 1` directives; with `repeat == 0`
    /// only the sentinel remains.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Validation`] if `assets` is empty,
    /// `per_image_seconds` is not a positive finite number, or the playlist
    /// cannot be allocated.
    pub fn build(assets: &[PathBuf], per_image_seconds: f64, repeat: u32) -> RenderResult<Self> {
        let Some(last) = assets.last() else {
            return Err(RenderError::invalid(
                "assets",
                "must contain at least one image",
                None,
            ));
        };
        if !per_image_seconds.is_finite() || per_image_seconds <= 0.0 {
            return Err(RenderError::invalid(
                "per_image_seconds",
                "must be a positive number of seconds",
                Some(per_image_seconds.to_string()),
            ));
        }

        let too_large = || {
            RenderError::invalid(
                "loop",
                "playlist too large to build",
                Some(repeat.to_string()),
            )
        };
        let entries = usize::try_from(repeat)
            .ok()
            .and_then(|passes| assets.len().checked_mul(passes))
            .and_then(|count| count.checked_add(1))
            .ok_or_else(too_large)?;
        let mut directives = Vec::new();
        directives
            .try_reserve_exact(entries)
            .map_err(|_| too_large())?;
        for _ in 0..repeat {
            directives.extend(assets.iter().map(|asset| Directive {
                asset: asset.clone(),
                duration: Some(per_image_seconds),
            }));
        }
        directives.push(Directive {
            asset: last.clone(),
            duration: None,
        });
        Ok(Self { directives })
    }

    /// Playlist entries in order.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Number of entries, including the sentinel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Whether the playlist has no entries. A built manifest always holds
    /// at least the sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Render the playlist in ffconcat text form.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::from(CONCAT_HEADER);
        text.push('\n');
        for directive in &self.directives {
            let _ = writeln!(text, "file {}", quote(&directive.asset));
            if let Some(duration) = directive.duration {
                let _ = writeln!(text, "duration {duration}");
            }
        }
        text
    }

    /// Write the rendered playlist to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the file cannot be written.
    pub async fn write_to(&self, path: &Path) -> RenderResult<()> {
        tokio::fs::write(path, self.render())
            .await
            .map_err(|source| RenderError::io("manifest.write", path, source))
    }
}

/// Single-quote a path for the concat demuxer; embedded quotes become `'\''`.
fn quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}
