//! Application boot sequence: load configuration, install logging, wire the
//! render pipeline into the API server and serve until shutdown.

use std::sync::Arc;

use slidecast_api::ApiServer;
use slidecast_config::AppConfig;
use slidecast_render::{FfmpegEncoder, HttpAssetFetcher, JobOrchestrator, RenderPipeline};
use slidecast_telemetry::{LogFormat, LoggingConfig, Metrics, ServiceSpan, init_logging};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the Slidecast service.
pub struct BootstrapDependencies {
    config: AppConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when configuration is invalid or metrics cannot be registered.
    pub fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Self::from_config(config)
    }

    /// Construct dependencies around an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the metrics registry cannot be built.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }

    /// Configuration the service will boot with.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Entry point for the Slidecast boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
///
/// # Errors
///
/// Returns an error when logging cannot be installed, the render stack cannot
/// be assembled, or the listener fails.
pub async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { config, telemetry } = dependencies;

    let logging = LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_name(config.logging.format.as_deref()),
        ..LoggingConfig::default()
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _span = ServiceSpan::enter("slidecast");

    info!(
        output_dir = %config.storage.output_dir.display(),
        encoder = %config.encoder.binary.display(),
        "Slidecast bootstrap starting"
    );

    let api = build_api(&config, telemetry).await?;
    let addr = config.server.socket_addr();
    info!(addr = %addr, "Launching API listener");

    api.serve(addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Assemble the render stack and API server described by `config`.
///
/// # Errors
///
/// Returns an error when the output directory cannot be created or the HTTP
/// fetch client cannot be built.
pub async fn build_api(config: &AppConfig, telemetry: Metrics) -> AppResult<ApiServer> {
    let output_dir = &config.storage.output_dir;
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| {
            AppError::io("storage.create_output_dir", Some(output_dir.clone()), source)
        })?;

    let fetcher = HttpAssetFetcher::new(&config.fetch)
        .map_err(|err| AppError::render("render.fetcher", err))?;
    let encoder = FfmpegEncoder::new(&config.encoder);
    let pipeline = RenderPipeline::new(Arc::new(fetcher), Arc::new(encoder), telemetry.clone())
        .with_scratch_root(config.storage.scratch_root.clone());
    let orchestrator =
        JobOrchestrator::new(pipeline, config.render_defaults, output_dir.clone());
    Ok(ApiServer::new(orchestrator, telemetry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn config_in(root: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.output_dir = root.join("videos");
        config.storage.scratch_root = Some(root.to_path_buf());
        config
    }

    #[tokio::test]
    async fn build_api_creates_output_directory() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let config = config_in(root.path());
        let _api = build_api(&config, Metrics::new()?).await?;
        assert!(config.storage.output_dir.is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn build_api_reports_unusable_output_directory() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let blocker = root.path().join("occupied");
        std::fs::write(&blocker, b"not a directory")?;
        let mut config = config_in(root.path());
        config.storage.output_dir = blocker.join("videos");

        let result = build_api(&config, Metrics::new()?).await;
        assert!(matches!(
            result,
            Err(AppError::Io {
                operation: "storage.create_output_dir",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn from_config_keeps_supplied_configuration() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let config = config_in(root.path());
        let deps = BootstrapDependencies::from_config(config.clone())?;
        assert_eq!(deps.config().storage.output_dir, config.storage.output_dir);
        assert_eq!(deps.config().server.http_port, config.server.http_port);
        Ok(())
    }
}
