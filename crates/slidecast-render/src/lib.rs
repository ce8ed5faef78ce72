#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Slideshow rendering core: request resolution, asset fetching, concat
//! manifests, encoder invocation and the in-memory job registry.
//!
//! Layout: `model.rs` (request and spec types), `registry.rs` (job state),
//! `fetch.rs` (HTTP downloads), `manifest.rs` (ffconcat playlists),
//! `encode.rs` (ffmpeg), `pipeline.rs` (one render run), `orchestrator.rs`
//! (background jobs).

pub mod encode;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use encode::{FfmpegEncoder, VideoEncoder};
pub use error::{DownloadCause, EncodeError, ExitKind, RenderError, RenderResult, error_chain};
pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use manifest::{Directive, Manifest};
pub use model::{Geometry, JobId, JobStatus, RenderRequest, RenderSpec};
pub use orchestrator::JobOrchestrator;
pub use pipeline::{RenderPipeline, RenderedVideo};
pub use registry::{JobCounts, JobRecord, JobRegistry, JobState, RegistryError};
