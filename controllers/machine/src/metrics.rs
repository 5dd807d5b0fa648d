//! Prometheus metrics and the probe/metrics HTTP servers.

use crate::error::ControllerError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Outcome labels of `bmm_remote_calls_total`
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const NOT_FOUND: &str = "not_found";
    pub const EMPTY: &str = "empty";
    pub const ERROR: &str = "error";
}

/// Controller metrics registered on a private registry.
pub struct Metrics {
    registry: Registry,
    reconcile_total: IntCounterVec,
    reconcile_errors_total: IntCounterVec,
    remote_calls_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconcile_total = IntCounterVec::new(
            Opts::new("bmm_machine_reconcile_total", "Machine reconciliations by lifecycle phase"),
            &["phase"],
        )?;
        let reconcile_errors_total = IntCounterVec::new(
            Opts::new(
                "bmm_machine_reconcile_errors_total",
                "Failed Machine reconciliations by lifecycle phase",
            ),
            &["phase"],
        )?;
        let remote_calls_total = IntCounterVec::new(
            Opts::new("bmm_remote_calls_total", "BMM API calls by operation and outcome"),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(reconcile_errors_total.clone()))?;
        registry.register(Box::new(remote_calls_total.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
            reconcile_errors_total,
            remote_calls_total,
        })
    }

    pub fn record_reconcile(&self, phase: &str) {
        self.reconcile_total.with_label_values(&[phase]).inc();
    }

    pub fn record_reconcile_error(&self, phase: &str) {
        self.reconcile_errors_total.with_label_values(&[phase]).inc();
    }

    pub fn record_remote_call(&self, operation: &str, outcome: &str) {
        self.remote_calls_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Result<String, (StatusCode, String)> {
    metrics.render().map_err(|e| {
        error!(error = %e, "Failed to render metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// Router serving `/metrics`
pub fn metrics_routes(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .layer(TraceLayer::new_for_http())
}

/// Router serving `/healthz` and `/readyz`
pub fn health_routes() -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
}

/// Serve a router on `addr` until the server fails.
pub async fn serve(addr: SocketAddr, app: Router, name: &str) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "{} server listening", name);
    axum::serve(listener, app).await?;
    Ok(())
}
