//! In-process fetch and encode doubles for pipeline and orchestrator tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use crate::encode::VideoEncoder;
use crate::error::{DownloadCause, EncodeError, ExitKind, RenderError, RenderResult};
use crate::fetch::{AssetFetcher, HttpAssetFetcher};
use crate::model::Geometry;

pub(crate) struct StubFetcher {
    fail_at: Option<usize>,
    gate: Option<Arc<Notify>>,
    last_scratch: Mutex<Option<PathBuf>>,
}

impl StubFetcher {
    pub(crate) fn ok() -> Self {
        Self {
            fail_at: None,
            gate: None,
            last_scratch: Mutex::new(None),
        }
    }

    pub(crate) fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::ok()
        }
    }

    /// Blocks every fetch until `gate` is notified.
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok()
        }
    }

    pub(crate) fn last_scratch(&self) -> Option<PathBuf> {
        self.last_scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn fetch(&self, locators: &[Url], scratch: &Path) -> RenderResult<Vec<PathBuf>> {
        *self
            .last_scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(scratch.to_path_buf());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let mut paths = Vec::new();
        for (index, locator) in locators.iter().enumerate() {
            if self.fail_at == Some(index) {
                return Err(RenderError::Download {
                    locator: locator.to_string(),
                    cause: DownloadCause::Status(404),
                });
            }
            let path = HttpAssetFetcher::asset_path(scratch, index);
            tokio::fs::write(&path, b"jpeg")
                .await
                .map_err(|source| RenderError::io("stub.fetch", &path, source))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

pub(crate) struct StubEncoder {
    fail: bool,
    last_manifest: Mutex<Option<String>>,
}

impl StubEncoder {
    pub(crate) fn ok() -> Self {
        Self {
            fail: false,
            last_manifest: Mutex::new(None),
        }
    }

    /// Writes a partial output and then reports a non-zero exit.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub(crate) fn last_manifest(&self) -> Option<String> {
        self.last_manifest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VideoEncoder for StubEncoder {
    async fn encode(
        &self,
        manifest: &Path,
        _geometry: Geometry,
        output: &Path,
    ) -> Result<PathBuf, EncodeError> {
        let text = tokio::fs::read_to_string(manifest).await.unwrap_or_default();
        *self
            .last_manifest
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(text);
        let body: &[u8] = if self.fail { b"partial" } else { b"mp4" };
        tokio::fs::write(output, body)
            .await
            .map_err(|source| EncodeError::Spawn {
                binary: PathBuf::from("stub"),
                source,
            })?;
        if self.fail {
            return Err(EncodeError::Exit {
                status: ExitKind::Code(1),
                stderr: "stub encoder failure".to_string(),
            });
        }
        Ok(output.to_path_buf())
    }
}
