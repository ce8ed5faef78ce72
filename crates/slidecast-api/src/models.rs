//! Wire DTOs returned by the HTTP surface.

use serde::{Deserialize, Serialize};
use slidecast_render::{JobCounts, JobId, JobStatus};
use slidecast_telemetry::MetricsSnapshot;

/// RFC9457-compatible problem document returned on errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short, human-readable summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness response for `GET /`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LivenessResponse {
    /// Always `true` while the process serves requests.
    pub ok: bool,
}

/// Response to `POST /render_async`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCreatedResponse {
    /// Identifier to poll with.
    pub job_id: JobId,
}

/// Response to `GET /status/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStatusResponse {
    /// Current job status.
    pub status: JobStatus,
    /// Failure description, present only for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response to `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Job totals per status.
    pub jobs: JobCounts,
    /// Render gauges.
    pub render: MetricsSnapshot,
}
