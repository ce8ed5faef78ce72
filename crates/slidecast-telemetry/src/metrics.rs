//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges relevant to HTTP serving and render jobs.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::{Duration, Instant};

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    render_jobs_total: IntCounterVec,
    render_stage_total: IntCounterVec,
    render_jobs_in_flight: IntGauge,
    render_last_duration_ms: IntGauge,
}

/// Snapshot of selected gauges for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Render jobs currently executing.
    pub render_jobs_in_flight: i64,
    /// Wall-clock duration of the most recently finished render (ms).
    pub render_last_duration_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let render_jobs_total = counter_vec(
            "render_jobs_total",
            "Render pipeline runs by outcome",
            &["outcome"],
        )?;
        let render_stage_total = counter_vec(
            "render_stage_total",
            "Render pipeline stages executed by status",
            &["stage", "status"],
        )?;
        let render_jobs_in_flight = gauge("render_jobs_in_flight", "Render jobs currently running")?;
        let render_last_duration_ms = gauge(
            "render_last_duration_ms",
            "Duration of the most recent render pipeline run (ms)",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "render_jobs_total", &render_jobs_total)?;
        register(&registry, "render_stage_total", &render_stage_total)?;
        register(&registry, "render_jobs_in_flight", &render_jobs_in_flight)?;
        register(&registry, "render_last_duration_ms", &render_last_duration_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                render_jobs_total,
                render_stage_total,
                render_jobs_in_flight,
                render_last_duration_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record a render pipeline stage outcome (`fetch`, `manifest`, `encode`).
    pub fn inc_render_stage(&self, stage: &str, status: &str) {
        self.inner
            .render_stage_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Mark a render run as started. The run stays in flight until the
    /// returned guard is finished or dropped.
    pub fn render_started(&self) -> RenderRun {
        self.inner.render_jobs_in_flight.inc();
        RenderRun {
            metrics: self.clone(),
            started: Instant::now(),
            finished: false,
        }
    }

    fn render_finished(&self, outcome: &str, elapsed: Duration) {
        self.inner.render_jobs_in_flight.dec();
        self.inner
            .render_jobs_total
            .with_label_values(&[outcome])
            .inc();
        self.inner
            .render_last_duration_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the render gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            render_jobs_in_flight: self.inner.render_jobs_in_flight.get(),
            render_last_duration_ms: self.inner.render_last_duration_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// In-flight render run. Dropping it unfinished records the run as
/// `cancelled`.
#[must_use = "dropping the guard immediately records the run as cancelled"]
pub struct RenderRun {
    metrics: Metrics,
    started: Instant,
    finished: bool,
}

impl RenderRun {
    /// Record the run's outcome and return its elapsed time.
    pub fn finish(mut self, outcome: &str) -> Duration {
        let elapsed = self.started.elapsed();
        self.metrics.render_finished(outcome, elapsed);
        self.finished = true;
        elapsed
    }
}

impl Drop for RenderRun {
    fn drop(&mut self) {
        if !self.finished {
            self.metrics
                .render_finished("cancelled", self.started.elapsed());
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/", 200);
        metrics.inc_render_stage("fetch", "ok");
        let _running = metrics.render_started();
        let finished = metrics.render_started();
        std::thread::sleep(Duration::from_millis(5));
        let elapsed = finished.finish("done");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.render_jobs_in_flight, 1);
        assert_eq!(
            snapshot.render_last_duration_ms,
            Metrics::duration_to_ms(elapsed)
        );

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("render_stage_total"));
        assert!(rendered.contains("render_jobs_total"));
        Ok(())
    }

    #[test]
    fn dropped_runs_leave_flight_as_cancelled() -> Result<()> {
        let metrics = Metrics::new()?;
        let run = metrics.render_started();
        assert_eq!(metrics.snapshot().render_jobs_in_flight, 1);
        drop(run);

        assert_eq!(metrics.snapshot().render_jobs_in_flight, 0);
        let rendered = metrics.render()?;
        assert!(rendered.lines().any(|line| {
            line.starts_with("render_jobs_total") && line.contains("outcome=\"cancelled\"")
        }));
        Ok(())
    }

    #[test]
    fn registries_are_independent_per_handle() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        let _run = first.render_started();
        assert_eq!(second.snapshot().render_jobs_in_flight, 0);
        Ok(())
    }
}
