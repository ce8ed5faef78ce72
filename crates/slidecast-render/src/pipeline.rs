//! A single render run: fetch, manifest, encode.
//!
//! # Design
//! - Every run owns a private scratch directory that is removed when the run
//!   (or the [`RenderedVideo`] handed back to the caller) is dropped.
//! - Every stage outcome is counted in metrics.
//! - Failed runs never leave a partial output file behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_telemetry::Metrics;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::encode::VideoEncoder;
use crate::error::{RenderError, RenderResult};
use crate::fetch::AssetFetcher;
use crate::manifest::Manifest;
use crate::model::RenderSpec;

const SCRATCH_PREFIX: &str = "slidecast-";
const MANIFEST_FILE: &str = "manifest.ffconcat";
const SCRATCH_OUTPUT_FILE: &str = "slideshow.mp4";

/// Encoded video living inside its run's scratch directory. The directory
/// is removed when this value is dropped.
#[derive(Debug)]
pub struct RenderedVideo {
    path: PathBuf,
    _scratch: TempDir,
}

impl RenderedVideo {
    /// Location of the encoded file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Executes render runs against pluggable fetch and encode backends.
pub struct RenderPipeline {
    fetcher: Arc<dyn AssetFetcher>,
    encoder: Arc<dyn VideoEncoder>,
    scratch_root: Option<PathBuf>,
    metrics: Metrics,
}

impl RenderPipeline {
    /// Assemble a pipeline; scratch directories go to the system temp dir.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        encoder: Arc<dyn VideoEncoder>,
        metrics: Metrics,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            scratch_root: None,
            metrics,
        }
    }

    /// Place scratch directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Metrics handle the pipeline reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Render `spec` into `output`, creating its parent directory as needed.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Any partial file at `output` is removed.
    pub async fn render(&self, spec: &RenderSpec, output: &Path) -> RenderResult<PathBuf> {
        if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RenderError::io("output.create_dir", parent, source))?;
        }
        let scratch = self.create_scratch()?;
        let result = self.run(scratch.path(), spec, output).await;
        if result.is_err() {
            remove_partial(output).await;
        }
        result
    }

    /// Render `spec` into the run's own scratch directory and hand the
    /// directory to the caller along with the file.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; the scratch directory is removed.
    pub async fn render_in_scratch(&self, spec: &RenderSpec) -> RenderResult<RenderedVideo> {
        let scratch = self.create_scratch()?;
        let output = scratch.path().join(SCRATCH_OUTPUT_FILE);
        let path = self.run(scratch.path(), spec, &output).await?;
        Ok(RenderedVideo {
            path,
            _scratch: scratch,
        })
    }

    fn create_scratch(&self) -> RenderResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .map_err(|source| RenderError::io("scratch.create_root", root, source))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        scratch.map_err(|source| {
            RenderError::io(
                "scratch.create",
                self.scratch_root.clone().unwrap_or_else(std::env::temp_dir),
                source,
            )
        })
    }

    async fn run(&self, scratch: &Path, spec: &RenderSpec, output: &Path) -> RenderResult<PathBuf> {
        let run = self.metrics.render_started();
        let result = self.run_stages(scratch, spec, output).await;
        let outcome = if result.is_ok() { "done" } else { "error" };
        let elapsed = run.finish(outcome);
        info!(
            outcome,
            images = spec.images.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "render run finished"
        );
        result
    }

    async fn run_stages(
        &self,
        scratch: &Path,
        spec: &RenderSpec,
        output: &Path,
    ) -> RenderResult<PathBuf> {
        // The concat demuxer resolves relative entries against the manifest's
        // directory, so every path it sees must be absolute.
        let scratch = std::path::absolute(scratch)
            .map_err(|source| RenderError::io("scratch.resolve", scratch, source))?;
        let output = std::path::absolute(output)
            .map_err(|source| RenderError::io("output.resolve", output, source))?;

        let assets = self.fetcher.fetch(&spec.images, &scratch).await;
        self.record_stage("fetch", &assets);
        let assets = assets?;
        debug!(count = assets.len(), "assets fetched");

        let manifest_path = scratch.join(MANIFEST_FILE);
        let manifest = match Manifest::build(&assets, spec.per_image_seconds, spec.repeat) {
            Ok(manifest) => manifest.write_to(&manifest_path).await.map(|()| manifest),
            Err(err) => Err(err),
        };
        self.record_stage("manifest", &manifest);
        let manifest = manifest?;
        debug!(entries = manifest.len(), "manifest written");

        let encoded = self
            .encoder
            .encode(&manifest_path, spec.geometry, &output)
            .await
            .map_err(RenderError::from);
        self.record_stage("encode", &encoded);
        encoded
    }

    fn record_stage<T>(&self, stage: &str, result: &RenderResult<T>) {
        let status = if result.is_ok() { "ok" } else { "error" };
        self.metrics.inc_render_stage(stage, status);
    }
}

async fn remove_partial(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!(path = %output.display(), "removed partial output"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %output.display(), error = %err, "failed to remove partial output"),
    }
}
