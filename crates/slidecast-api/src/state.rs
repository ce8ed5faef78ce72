//! Shared handler state.

use slidecast_render::JobOrchestrator;
use slidecast_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) orchestrator: JobOrchestrator,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) const fn new(orchestrator: JobOrchestrator, telemetry: Metrics) -> Self {
        Self {
            orchestrator,
            telemetry,
        }
    }
}
