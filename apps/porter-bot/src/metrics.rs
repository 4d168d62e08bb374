//! Prometheus metrics for porter-bot.
//!
//! Exposes attribution metrics in Prometheus format at the `/metrics` endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use porter_attribution::AttributionResult;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder and return a handle for rendering.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "porter_joins_total",
        "Member joins handled, by attribution confidence"
    );
    describe_histogram!(
        "porter_resolution_duration_seconds",
        "Time spent attributing a join to an invite"
    );
    describe_counter!(
        "porter_events_dropped_total",
        "Gateway events lost because the dispatcher fell behind the event bus"
    );
    describe_counter!(
        "porter_collaborator_errors_total",
        "Failed calls to the account store or the community platform"
    );

    Ok(handle)
}

/// Record a failed collaborator call that was downgraded.
pub fn record_collaborator_error(call: &'static str) {
    counter!("porter_collaborator_errors_total", "call" => call).increment(1);
}

/// Times one resolution and records its outcome.
pub struct ResolutionTimer {
    start: Instant,
}

impl ResolutionTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn finish(self, result: &AttributionResult) {
        histogram!("porter_resolution_duration_seconds")
            .record(self.start.elapsed().as_secs_f64());
        counter!(
            "porter_joins_total",
            "confidence" => result.confidence.as_str(),
            "strategy" => result.strategy.as_str()
        )
        .increment(1);
    }
}
