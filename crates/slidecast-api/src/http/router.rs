//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use slidecast_render::JobOrchestrator;
use slidecast_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::errors::ApiError;
use crate::http::health::{health, metrics, root};
use crate::http::render::{download, render_async, render_sync, status};
use crate::http::telemetry::track_request;
use crate::state::ApiState;

/// Axum router wrapper that hosts the Slidecast API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API around a job orchestrator and shared metrics handle.
    #[must_use]
    pub fn new(orchestrator: JobOrchestrator, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(orchestrator, telemetry.clone()));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(slidecast_telemetry::set_request_id_layer())
            .layer(slidecast_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, track_request));

        let router = Self::build_router()
            .fallback(unknown_route)
            .layer(layered)
            .layer(cors_layer)
            .with_state(state);

        Self { router }
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/render", post(render_sync))
            .route("/render_async", post(render_async))
            .route("/status/{job_id}", get(status))
            .route("/download/{job_id}", get(download))
    }

    /// Serve the API on the supplied address until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "starting api");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("route not found")
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use slidecast_config::RenderDefaults;
    use slidecast_render::{
        AssetFetcher, DownloadCause, EncodeError, ExitKind, Geometry, HttpAssetFetcher,
        RenderError, RenderPipeline, RenderResult, VideoEncoder,
    };
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use url::Url;

    use super::*;

    #[derive(Default)]
    struct StubFetcher {
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    #[async_trait]
    impl AssetFetcher for StubFetcher {
        async fn fetch(&self, locators: &[Url], scratch: &Path) -> RenderResult<Vec<PathBuf>> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut paths = Vec::new();
            for (index, locator) in locators.iter().enumerate() {
                if self.fail {
                    return Err(RenderError::Download {
                        locator: locator.to_string(),
                        cause: DownloadCause::Status(404),
                    });
                }
                let path = HttpAssetFetcher::asset_path(scratch, index);
                tokio::fs::write(&path, b"jpeg").await.map_err(|source| {
                    RenderError::Download {
                        locator: locator.to_string(),
                        cause: DownloadCause::Io(source),
                    }
                })?;
                paths.push(path);
            }
            Ok(paths)
        }
    }

    struct StubEncoder {
        fail: bool,
    }

    #[async_trait]
    impl VideoEncoder for StubEncoder {
        async fn encode(
            &self,
            _manifest: &Path,
            _geometry: Geometry,
            output: &Path,
        ) -> Result<PathBuf, EncodeError> {
            if self.fail {
                return Err(EncodeError::Exit {
                    status: ExitKind::Code(1),
                    stderr: "stub failure".to_string(),
                });
            }
            tokio::fs::write(output, b"fake-mp4")
                .await
                .map_err(|source| EncodeError::Spawn {
                    binary: PathBuf::from("stub"),
                    source,
                })?;
            Ok(output.to_path_buf())
        }
    }

    struct Harness {
        router: Router,
        _root: TempDir,
    }

    fn harness(fetcher: StubFetcher, encoder: StubEncoder) -> anyhow::Result<Harness> {
        let root = tempfile::tempdir()?;
        let metrics = Metrics::new()?;
        let pipeline = RenderPipeline::new(Arc::new(fetcher), Arc::new(encoder), metrics.clone())
            .with_scratch_root(Some(root.path().join("scratch")));
        let orchestrator = JobOrchestrator::new(
            pipeline,
            RenderDefaults::default(),
            root.path().join("output"),
        );
        let server = ApiServer::new(orchestrator, metrics);
        Ok(Harness {
            router: server.router().clone(),
            _root: root,
        })
    }

    fn ok_harness() -> anyhow::Result<Harness> {
        harness(StubFetcher::default(), StubEncoder { fail: false })
    }

    async fn send(router: &Router, request: Request<Body>) -> anyhow::Result<Response> {
        Ok(router.clone().oneshot(request).await?)
    }

    async fn get(router: &Router, uri: &str) -> anyhow::Result<Response> {
        send(router, Request::builder().uri(uri).body(Body::empty())?).await
    }

    async fn post_json(router: &Router, uri: &str, body: &Value) -> anyhow::Result<Response> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        send(router, request).await
    }

    async fn json_body(response: Response) -> anyhow::Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn submit(router: &Router) -> anyhow::Result<String> {
        let response = post_json(
            router,
            "/render_async",
            &json!({"images": ["http://example.test/a.jpg"]}),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await?;
        body["job_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing job_id in {body}"))
    }

    async fn wait_for_terminal(router: &Router, job_id: &str) -> anyhow::Result<Value> {
        for _ in 0..200 {
            let body = json_body(get(router, &format!("/status/{job_id}")).await?).await?;
            if body["status"] != "processing" {
                return Ok(body);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("job {job_id} did not reach a terminal status")
    }

    #[tokio::test]
    async fn root_reports_ok_with_request_id() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let response = get(&harness.router, "/").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));
        assert_eq!(json_body(response).await?, json!({"ok": true}));
        Ok(())
    }

    #[tokio::test]
    async fn request_id_is_propagated() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let request = Request::builder()
            .uri("/")
            .header(HEADER_REQUEST_ID, "req-7")
            .body(Body::empty())?;
        let response = send(&harness.router, request).await?;
        assert_eq!(
            response
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok()),
            Some("req-7")
        );
        Ok(())
    }

    #[tokio::test]
    async fn async_job_lifecycle_processing_then_download() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let harness = harness(
            StubFetcher {
                gate: Some(Arc::clone(&gate)),
                fail: false,
            },
            StubEncoder { fail: false },
        )?;

        let job_id = submit(&harness.router).await?;
        let status = json_body(get(&harness.router, &format!("/status/{job_id}")).await?).await?;
        assert_eq!(status, json!({"status": "processing"}));

        let early = get(&harness.router, &format!("/download/{job_id}")).await?;
        assert_eq!(early.status().as_u16(), 425);

        gate.notify_one();
        assert_eq!(
            wait_for_terminal(&harness.router, &job_id).await?,
            json!({"status": "done"})
        );

        let response = get(&harness.router, &format!("/download/{job_id}")).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("video/mp4"))
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(disposition, format!("attachment; filename=\"{job_id}.mp4\""));
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&bytes[..], b"fake-mp4");
        Ok(())
    }

    #[tokio::test]
    async fn failed_job_reports_detail_and_refuses_download() -> anyhow::Result<()> {
        let harness = harness(
            StubFetcher {
                gate: None,
                fail: true,
            },
            StubEncoder { fail: false },
        )?;

        let job_id = submit(&harness.router).await?;
        let status = wait_for_terminal(&harness.router, &job_id).await?;
        assert_eq!(status["status"], "error");
        let detail = status["detail"].as_str().unwrap_or_default();
        assert!(detail.contains("http://example.test/a.jpg"));

        let response = get(&harness.router, &format!("/download/{job_id}")).await?;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_and_malformed_job_ids_are_not_found() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let unknown = "6f1c2a4e-8d6b-4d0a-9a51-2f5c3b7d9e10";
        for uri in [
            format!("/status/{unknown}"),
            format!("/download/{unknown}"),
            "/status/not-a-uuid".to_string(),
        ] {
            let response = get(&harness.router, &uri).await?;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let body = json_body(response).await?;
            assert_eq!(body["status"], 404);
            assert_eq!(body["title"], "resource not found");
        }
        Ok(())
    }

    #[tokio::test]
    async fn invalid_submissions_are_bad_requests() -> anyhow::Result<()> {
        let harness = ok_harness()?;

        let empty = post_json(&harness.router, "/render_async", &json!({"images": []})).await?;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        let body = json_body(empty).await?;
        assert_eq!(body["type"], "https://slidecast.dev/problems/bad-request");

        let zero = post_json(
            &harness.router,
            "/render_async",
            &json!({"images": ["http://example.test/a.jpg"], "width": 0}),
        )
        .await?;
        assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

        let malformed = send(
            &harness.router,
            Request::builder()
                .method("POST")
                .uri("/render_async")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))?,
        )
        .await?;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_loops_are_rejected_before_any_job_exists() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let images: Vec<String> = (0..50)
            .map(|index| format!("http://example.test/{index}.jpg"))
            .collect();
        let body = json!({"images": images, "loop": u32::MAX});

        for uri in ["/render_async", "/render"] {
            let response = post_json(&harness.router, uri, &body).await?;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let problem = json_body(response).await?;
            assert_eq!(
                problem["detail"],
                "invalid loop: images times loop exceeds the slide limit"
            );
        }

        let health = json_body(get(&harness.router, "/health").await?).await?;
        assert_eq!(health["jobs"]["processing"], 0);
        assert_eq!(health["render"]["render_jobs_in_flight"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn sync_render_streams_video() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let response = post_json(
            &harness.router,
            "/render",
            &json!({"images": ["http://example.test/a.jpg", "http://example.test/b.jpg"], "loop": 0}),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("video/mp4"))
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&bytes[..], b"fake-mp4");
        Ok(())
    }

    #[tokio::test]
    async fn sync_render_maps_failures() -> anyhow::Result<()> {
        let body = json!({"images": ["http://example.test/a.jpg"]});

        let download_failure = harness(
            StubFetcher {
                gate: None,
                fail: true,
            },
            StubEncoder { fail: false },
        )?;
        let response = post_json(&download_failure.router, "/render", &body).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let encode_failure = harness(StubFetcher::default(), StubEncoder { fail: true })?;
        let response = post_json(&encode_failure.router, "/render", &body).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let problem = json_body(response).await?;
        assert!(
            problem["detail"]
                .as_str()
                .unwrap_or_default()
                .contains("stub failure")
        );
        Ok(())
    }

    #[tokio::test]
    async fn health_and_metrics_reflect_activity() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let job_id = submit(&harness.router).await?;
        wait_for_terminal(&harness.router, &job_id).await?;

        let health = json_body(get(&harness.router, "/health").await?).await?;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["jobs"]["done"], 1);

        let response = get(&harness.router, "/metrics").await?;
        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await?.to_vec())?;
        assert!(
            text.lines()
                .any(|line| line.starts_with("http_requests_total")
                    && line.contains(r#"route="/render_async""#))
        );
        assert!(text.contains(r#"render_jobs_total{outcome="done"} 1"#));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_return_problem_documents() -> anyhow::Result<()> {
        let harness = ok_harness()?;
        let response = get(&harness.router, "/nope").await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));
        Ok(())
    }
}
