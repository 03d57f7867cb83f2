//! Probe and Prometheus endpoints.
//!
//! Provides:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (always returns 200 `ok`; the service has no
//!   warm-up and no per-request state)
//! - `/metrics` - Prometheus metrics endpoint

use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Labels for completed admission reviews
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ReviewLabels {
    pub route: String,
    pub version: String,
    pub outcome: String,
}

impl EncodeLabelSet for ReviewLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("route", self.route.as_str()).encode(encoder.encode_label())?;
        ("version", self.version.as_str()).encode(encoder.encode_label())?;
        ("outcome", self.outcome.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for failed admission reviews
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ErrorLabels {
    pub route: String,
    pub kind: String,
}

impl EncodeLabelSet for ErrorLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("route", self.route.as_str()).encode(encoder.encode_label())?;
        ("kind", self.kind.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for per-route latency
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RouteLabels {
    pub route: String,
}

impl EncodeLabelSet for RouteLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("route", self.route.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Outcome of one admission request, as recorded in metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    Rejected,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
            Outcome::Rejected => "rejected",
        }
    }
}

/// Shared metrics for the webhook
pub struct Metrics {
    /// Completed reviews by route, wire version and outcome
    pub requests_total: Family<ReviewLabels, Counter>,
    /// Failures by route and error kind
    pub errors_total: Family<ErrorLabels, Counter>,
    /// End-to-end handling time
    pub duration_seconds: Family<RouteLabels, Histogram>,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<ReviewLabels, Counter>::default();
        registry.register(
            "admission_requests",
            "Total number of admission reviews handled",
            requests_total.clone(),
        );

        let errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "admission_errors",
            "Total number of admission review failures",
            errors_total.clone(),
        );

        let duration_seconds = Family::<RouteLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.0005, 2.0, 14))
        });
        registry.register(
            "admission_duration_seconds",
            "Duration of admission review handling in seconds",
            duration_seconds.clone(),
        );

        Self {
            requests_total,
            errors_total,
            duration_seconds,
            registry,
        }
    }

    /// Record a finished review
    pub fn record_review(&self, route: &str, version: &str, outcome: Outcome, duration_secs: f64) {
        let labels = ReviewLabels {
            route: route.to_string(),
            version: version.to_string(),
            outcome: outcome.as_str().to_string(),
        };
        self.requests_total.get_or_create(&labels).inc();
        self.duration_seconds
            .get_or_create(&RouteLabels {
                route: route.to_string(),
            })
            .observe(duration_secs);
    }

    /// Record a failure of the given kind
    pub fn record_error(&self, route: &str, kind: &str) {
        let labels = ErrorLabels {
            route: route.to_string(),
            kind: kind.to_string(),
        };
        self.errors_total.get_or_create(&labels).inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Touches no shared state, so it answers regardless of admission load.
async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Metrics handler
async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    let body = metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the probe and metrics router
pub fn create_health_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}
