//! Admission request dispatcher.
//!
//! One [`Dispatcher`] serves one route. Per request it:
//! 1. checks the content type
//! 2. decodes the body and identifies its wire generation
//! 3. normalizes the request and runs the decision function
//! 4. converts the decision back into the caller's generation
//! 5. writes exactly one response
//!
//! Every failure is answered here; nothing propagates to the transport.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, trace, warn};

use crate::decision::{Admit, invoke};
use crate::error::AdmissionError;
use crate::health::{Metrics, Outcome};
use crate::schema::{WireEnvelope, WireVersion};

/// The only media type accepted and produced
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Whether a `Content-Type` value names [`JSON_MEDIA_TYPE`], ignoring parameters.
pub fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

/// Successfully encoded reply
#[derive(Debug)]
pub struct Reply {
    pub version: WireVersion,
    pub allowed: bool,
    pub body: Vec<u8>,
}

/// Routes admission reviews for one endpoint to a decision function.
pub struct Dispatcher {
    route: String,
    decision: Arc<dyn Admit>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(route: impl Into<String>, decision: Arc<dyn Admit>, metrics: Arc<Metrics>) -> Self {
        Self {
            route: route.into(),
            decision,
            metrics,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Handle one request end to end and produce the HTTP response.
    pub async fn dispatch(&self, headers: &HeaderMap, body: &[u8]) -> Response {
        let started = Instant::now();
        let result = self.review(headers, body).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(reply) => {
                let outcome = if reply.allowed {
                    Outcome::Allowed
                } else {
                    Outcome::Denied
                };
                self.metrics
                    .record_review(&self.route, reply.version.as_str(), outcome, elapsed);
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, JSON_MEDIA_TYPE)],
                    reply.body,
                )
                    .into_response()
            }
            Err(e) => {
                match &e {
                    AdmissionError::Encode(_) => {
                        error!(route = %self.route, error = %e, "Failed to encode admission response");
                    }
                    _ => {
                        warn!(route = %self.route, error = %e, "Rejected admission request");
                    }
                }
                self.metrics.record_error(&self.route, e.kind());
                self.metrics
                    .record_review(&self.route, "unknown", Outcome::Rejected, elapsed);
                e.into_response()
            }
        }
    }

    /// Decode, decide and re-encode one review.
    pub async fn review(&self, headers: &HeaderMap, body: &[u8]) -> Result<Reply, AdmissionError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !is_json_media_type(content_type) {
            return Err(AdmissionError::UnsupportedMediaType(content_type.to_string()));
        }

        debug!(route = %self.route, body = %String::from_utf8_lossy(body), "Handling request");

        let envelope = WireEnvelope::decode(body)?;
        let version = envelope.version();
        let (types, request) = envelope.into_canonical()?;

        debug!(
            route = %self.route,
            version = %version,
            uid = %request.uid,
            operation = ?request.operation,
            namespace = ?request.namespace,
            name = %request.name,
            "Processing admission request"
        );

        let invocation = invoke(self.decision.clone(), request).await;
        if invocation.failure.is_some() {
            self.metrics.record_error(&self.route, "decision");
        }
        let response = invocation.response;
        let allowed = response.allowed;

        if allowed {
            info!(
                route = %self.route,
                uid = %response.uid,
                patched = response.patch.is_some(),
                "Admission request allowed"
            );
        } else {
            info!(
                route = %self.route,
                uid = %response.uid,
                reason = response.message().unwrap_or_default(),
                "Admission request denied"
            );
        }

        let reply = WireEnvelope::from_canonical(version, types, response)?;
        let body = reply.to_vec()?;
        trace!(route = %self.route, body = %String::from_utf8_lossy(&body), "Sending response");

        Ok(Reply {
            version,
            allowed,
            body,
        })
    }
}

/// axum handler for admission routes.
pub async fn admission_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatcher.dispatch(&headers, &body).await
}
