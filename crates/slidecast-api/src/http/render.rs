//! Render submission, job polling, downloads and synchronous rendering.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path as AxumPath, State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use futures_util::Stream;
use slidecast_render::{JobId, JobState, RenderRequest, RenderedVideo};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::http::constants::{CONTENT_TYPE_MP4, SYNC_DOWNLOAD_NAME};
use crate::http::errors::ApiError;
use crate::models::{JobCreatedResponse, JobStatusResponse};
use crate::state::ApiState;

pub(crate) async fn render_async(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<JobCreatedResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let job_id = state.orchestrator.submit(request)?;
    Ok(Json(JobCreatedResponse { job_id }))
}

pub(crate) async fn status(
    State(state): State<Arc<ApiState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let id = parse_job_id(&raw_id)?;
    let record = state
        .orchestrator
        .registry()
        .get(id)
        .map_err(|_| ApiError::not_found("job not found"))?;
    Ok(Json(JobStatusResponse {
        status: record.status(),
        detail: record.error_detail().map(str::to_string),
    }))
}

pub(crate) async fn download(
    State(state): State<Arc<ApiState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&raw_id)?;
    let record = state
        .orchestrator
        .registry()
        .get(id)
        .map_err(|_| ApiError::not_found("job not found"))?;
    match record.state {
        JobState::Processing => Err(ApiError::too_early("job is still processing")),
        JobState::Error { detail } => Err(ApiError::conflict(detail)),
        JobState::Done { output } => {
            let (file, length) = open_video(&output).await?;
            video_response(
                Body::from_stream(ReaderStream::new(file)),
                length,
                &format!("{id}.mp4"),
            )
        }
    }
}

pub(crate) async fn render_sync(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let video = state.orchestrator.render_now(request).await?;
    let (file, length) = open_video(video.path()).await?;
    info!(bytes = length, "streaming synchronous render");
    video_response(
        Body::from_stream(ScratchStream {
            inner: ReaderStream::new(file),
            _video: video,
        }),
        length,
        SYNC_DOWNLOAD_NAME,
    )
}

fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("job not found"))
}

async fn open_video(path: &Path) -> Result<(File, u64), ApiError> {
    let file = File::open(path).await.map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to open rendered video");
        ApiError::internal("rendered video is unavailable")
    })?;
    let length = file.metadata().await.map(|meta| meta.len()).map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to stat rendered video");
        ApiError::internal("rendered video is unavailable")
    })?;
    Ok((file, length))
}

fn video_response(body: Body, length: u64, file_name: &str) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .map_err(|_| ApiError::internal("invalid download file name"))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, CONTENT_TYPE_MP4)
        .header(CONTENT_LENGTH, length)
        .header(CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|err| {
            error!(error = %err, "failed to build video response");
            ApiError::internal("failed to build video response")
        })
}

/// Streams a synchronously rendered file while holding its scratch directory.
struct ScratchStream {
    inner: ReaderStream<File>,
    _video: RenderedVideo,
}

impl Stream for ScratchStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
