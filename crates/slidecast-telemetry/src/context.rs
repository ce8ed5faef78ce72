//! Per-request scope and the process-wide service span.
//!
//! HTTP middleware runs each request inside a [`RequestScope`]; code that
//! runs in the request's task (job submission, for example) can read the
//! request id back without threading it through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::span::EnteredSpan;

use crate::init::build_sha;

tokio::task_local! {
    static REQUEST_SCOPE: RequestScope;
}

/// Identity of the HTTP request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestScope {
    /// Scope for a request with the given id and matched route template.
    #[must_use]
    pub fn new(request_id: impl Into<Arc<str>>, route: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: request_id.into(),
            route: route.into(),
        }
    }

    /// The `x-request-id` value, empty when the request carried none.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template such as `/status/{job_id}`.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Scope of the request served by the current task, if any. Spawned
    /// tasks do not inherit it.
    #[must_use]
    pub fn current() -> Option<Self> {
        REQUEST_SCOPE.try_with(Clone::clone).ok()
    }

    /// Drive `fut` with this scope installed.
    pub async fn run<Fut>(self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        REQUEST_SCOPE.scope(self, fut).await
    }
}

/// Request id of the current task's request, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    REQUEST_SCOPE
        .try_with(|scope| scope.request_id().to_owned())
        .ok()
}

/// Keeps the `app` span (service name and build SHA) entered while alive.
pub struct ServiceSpan {
    _entered: EnteredSpan,
}

impl ServiceSpan {
    /// Enter the `app` span for `service`.
    #[must_use]
    pub fn enter(service: &str) -> Self {
        let span = tracing::info_span!("app", service = %service, build_sha = %build_sha());
        Self {
            _entered: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_scope_is_visible_inside_run() {
        let scope = RequestScope::new("req-42", "/render_async");
        let seen = scope
            .clone()
            .run(async { (RequestScope::current(), current_request_id()) })
            .await;
        assert_eq!(seen.0, Some(scope));
        assert_eq!(seen.1.as_deref(), Some("req-42"));
        assert!(RequestScope::current().is_none());
    }

    #[tokio::test]
    async fn inner_scope_shadows_outer_until_it_ends() {
        let outer = RequestScope::new("outer", "/render");
        outer
            .run(async {
                let inner = RequestScope::new("inner", "/download/{job_id}")
                    .run(async { RequestScope::current() })
                    .await;
                assert_eq!(inner.as_ref().map(RequestScope::route), Some("/download/{job_id}"));
                assert_eq!(current_request_id().as_deref(), Some("outer"));
            })
            .await;
    }

    #[tokio::test]
    async fn spawned_render_tasks_do_not_inherit_the_scope() -> Result<(), tokio::task::JoinError> {
        let detached = RequestScope::new("req-7", "/render_async")
            .run(async { tokio::spawn(async { current_request_id() }).await })
            .await?;
        assert!(detached.is_none());
        Ok(())
    }

    #[test]
    fn service_span_can_be_entered_and_left() {
        let span = ServiceSpan::enter("slidecast");
        drop(span);
    }
}
