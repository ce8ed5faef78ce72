//! Per-request accounting: every response is counted under its route
//! template, and the handler runs inside a [`RequestScope`] so job
//! submissions can log the request that created them.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use slidecast_telemetry::{Metrics, RequestScope};

use crate::http::constants::HEADER_REQUEST_ID;

/// Route label for requests that hit the fallback; raw paths are never labels.
const UNMATCHED_ROUTE: &str = "unmatched";

pub(crate) async fn track_request(
    State(telemetry): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = route_label(&request);
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let response = RequestScope::new(request_id, route.as_str())
        .run(next.run(request))
        .await;
    telemetry.inc_http_request(&route, response.status().as_u16());
    response
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn echo_scope() -> String {
        RequestScope::current().map_or_else(
            || "none".to_owned(),
            |scope| format!("{} {}", scope.request_id(), scope.route()),
        )
    }

    fn router(telemetry: Metrics) -> Router {
        Router::new()
            .route("/status/{job_id}", get(echo_scope))
            .layer(middleware::from_fn_with_state(telemetry, track_request))
    }

    #[tokio::test]
    async fn handlers_see_route_template_and_request_id() -> anyhow::Result<()> {
        let response = router(Metrics::new()?)
            .oneshot(
                http::Request::builder()
                    .uri("/status/0d9c6f1e-1111-4222-8333-944445555666")
                    .header(HEADER_REQUEST_ID, "poll-1")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"poll-1 /status/{job_id}");
        Ok(())
    }

    #[tokio::test]
    async fn status_polls_share_one_route_label() -> anyhow::Result<()> {
        let telemetry = Metrics::new()?;
        let router = router(telemetry.clone());
        for id in ["a", "b", "c"] {
            let request = http::Request::builder()
                .uri(format!("/status/{id}"))
                .body(Body::empty())?;
            router.clone().oneshot(request).await?;
        }

        let rendered = telemetry.render()?;
        let polls = rendered
            .lines()
            .find(|line| {
                line.starts_with("http_requests_total") && line.contains("route=\"/status/{job_id}\"")
            })
            .ok_or_else(|| anyhow::anyhow!("no status counter in {rendered}"))?;
        assert!(polls.ends_with(" 3"), "{polls}");
        Ok(())
    }
}
