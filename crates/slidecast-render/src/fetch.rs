//! Image download into a run's scratch directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use slidecast_config::FetchConfig;
use tracing::debug;
use url::Url;

use crate::error::{DownloadCause, RenderError, RenderResult};

/// Downloads an ordered list of images to local files.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `locators` into `scratch`, returning local paths in input
    /// order. Stops at the first failure.
    async fn fetch(&self, locators: &[Url], scratch: &Path) -> RenderResult<Vec<PathBuf>>;
}

/// [`AssetFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    /// Build a fetcher with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::HttpClient`] if the client cannot be built.
    pub fn new(config: &FetchConfig) -> RenderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|source| RenderError::HttpClient { source })?;
        Ok(Self { client })
    }

    /// Local file name for the asset at `index`. Zero-padded so that
    /// lexical order matches input order.
    #[must_use]
    pub fn asset_path(scratch: &Path, index: usize) -> PathBuf {
        scratch.join(format!("{index:03}.jpg"))
    }

    async fn fetch_one(&self, locator: &Url, destination: &Path) -> Result<(), DownloadCause> {
        let response = self
            .client
            .get(locator.clone())
            .send()
            .await
            .map_err(DownloadCause::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadCause::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(DownloadCause::Transport)?;
        tokio::fs::write(destination, &body)
            .await
            .map_err(DownloadCause::Io)
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, locators: &[Url], scratch: &Path) -> RenderResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(locators.len());
        for (index, locator) in locators.iter().enumerate() {
            let destination = Self::asset_path(scratch, index);
            self.fetch_one(locator, &destination)
                .await
                .map_err(|cause| RenderError::Download {
                    locator: locator.to_string(),
                    cause,
                })?;
            debug!(index, locator = %locator, "image downloaded");
            paths.push(destination);
        }
        Ok(paths)
    }
}
