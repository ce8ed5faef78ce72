//! Background render jobs.
//!
//! # Design
//! - `submit` validates synchronously, registers the job and returns at once;
//!   the pipeline runs on a detached task.
//! - The pipeline runs inside a nested task so a panic is observed through
//!   its `JoinHandle` and recorded as a job failure.

use std::path::PathBuf;
use std::sync::Arc;

use slidecast_config::RenderDefaults;
use slidecast_telemetry::RequestScope;
use tracing::{error, info, warn};

use crate::error::{RenderResult, error_chain};
use crate::model::{JobId, RenderRequest, RenderSpec};
use crate::pipeline::{RenderPipeline, RenderedVideo};
use crate::registry::JobRegistry;

/// Coordinates render requests, the job registry and the pipeline.
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: Arc<JobRegistry>,
    pipeline: Arc<RenderPipeline>,
    defaults: RenderDefaults,
    output_dir: PathBuf,
}

impl JobOrchestrator {
    /// Build an orchestrator writing job outputs under `output_dir`.
    #[must_use]
    pub fn new(pipeline: RenderPipeline, defaults: RenderDefaults, output_dir: PathBuf) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            pipeline: Arc::new(pipeline),
            defaults,
            output_dir,
        }
    }

    /// Registry holding every job submitted through this orchestrator.
    #[must_use]
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Pipeline shared by synchronous and background renders.
    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Defaults applied to omitted request fields.
    #[must_use]
    pub const fn defaults(&self) -> &RenderDefaults {
        &self.defaults
    }

    /// Final location of a job's output.
    #[must_use]
    pub fn output_path(&self, id: JobId) -> PathBuf {
        self.output_dir.join(format!("{id}.mp4"))
    }

    /// Validate `request`, register a job and start rendering it in the
    /// background. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any job is created, or a registry
    /// error on an identifier clash.
    pub fn submit(&self, request: RenderRequest) -> RenderResult<JobId> {
        let spec = request.resolve(&self.defaults)?;
        let id = JobId::new();
        self.registry.create(id)?;
        let scope = RequestScope::current();
        info!(
            job_id = %id,
            images = spec.images.len(),
            request_id = scope.as_ref().map_or("-", RequestScope::request_id),
            route = scope.as_ref().map_or("-", RequestScope::route),
            "render job submitted"
        );

        let output = self.output_path(id);
        tokio::spawn(run_job(
            Arc::clone(&self.registry),
            Arc::clone(&self.pipeline),
            id,
            spec,
            output,
        ));
        Ok(id)
    }

    /// Validate and render `request` in the caller's task, returning the
    /// video still inside its scratch directory.
    ///
    /// # Errors
    ///
    /// Returns validation, download, encode or IO failures.
    pub async fn render_now(&self, request: RenderRequest) -> RenderResult<RenderedVideo> {
        let spec = request.resolve(&self.defaults)?;
        self.pipeline.render_in_scratch(&spec).await
    }
}

async fn run_job(
    registry: Arc<JobRegistry>,
    pipeline: Arc<RenderPipeline>,
    id: JobId,
    spec: RenderSpec,
    output: PathBuf,
) {
    let worker = tokio::spawn(async move { pipeline.render(&spec, &output).await });
    let recorded = match worker.await {
        Ok(Ok(path)) => {
            info!(job_id = %id, path = %path.display(), "render job completed");
            registry.complete(id, path)
        }
        Ok(Err(err)) => {
            let detail = error_chain(&err);
            warn!(job_id = %id, error = %detail, "render job failed");
            registry.fail(id, detail)
        }
        Err(join_err) => {
            error!(job_id = %id, error = %join_err, "render task aborted");
            registry.fail(id, format!("render task aborted: {join_err}"))
        }
    };
    if let Err(err) = recorded {
        error!(job_id = %id, error = %err, "failed to record render job outcome");
    }
}
