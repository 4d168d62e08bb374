//! HTTP relay: the gateway connector posts events here; probes and metrics are served alongside.
//!
//! - `POST /events` - one gateway event as JSON, published onto the event bus
//! - `GET /healthz` - liveness, always OK
//! - `GET /readyz` - OK once the invite cache has a baseline (a `ready` event or a first join)
//! - `GET /metrics` - Prometheus text format

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use porter_attribution::InviteTracker;
use porter_events::{EventBus, GatewayEvent};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct RelayState {
    bus: Arc<dyn EventBus>,
    tracker: InviteTracker,
    metrics: Option<PrometheusHandle>,
}

impl RelayState {
    pub fn new(
        bus: Arc<dyn EventBus>,
        tracker: InviteTracker,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            bus,
            tracker,
            metrics,
        }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/events", post(events_handler))
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn events_handler(
    State(state): State<RelayState>,
    Json(event): Json<GatewayEvent>,
) -> StatusCode {
    debug!(kind = event.kind(), "Relaying gateway event");
    match state.bus.publish(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            error!("Failed to publish gateway event: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(State(state): State<RelayState>) -> Result<&'static str, StatusCode> {
    if state.tracker.snapshot().await.synced {
        Ok("ok")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn metrics_handler(State(state): State<RelayState>) -> Result<String, StatusCode> {
    match &state.metrics {
        Some(handle) => Ok(handle.render()),
        None => Err(StatusCode::NOT_FOUND),
    }
}
