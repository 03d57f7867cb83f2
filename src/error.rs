//! Error types for the admission service.
//!
//! Request-scoped failures never unwind past the dispatcher: each maps to an
//! HTTP status. Startup failures are fatal.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that end a single admission request before a decision is returned
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Content type was missing or not `application/json`
    #[error("contentType={0}, expect application/json")]
    UnsupportedMediaType(String),

    /// Body was not a decodable AdmissionReview
    #[error("Request could not be decoded: {0}")]
    Decode(String),

    /// Body decoded but its group/version/kind is not served
    #[error("Unsupported group version kind: {0}")]
    UnsupportedGvk(String),

    /// Reply could not be serialized
    #[error("Response could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AdmissionError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::UnsupportedMediaType(_)
            | AdmissionError::Decode(_)
            | AdmissionError::UnsupportedGvk(_) => StatusCode::BAD_REQUEST,
            AdmissionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::UnsupportedMediaType(_) => "media_type",
            AdmissionError::Decode(_) => "decode",
            AdmissionError::UnsupportedGvk(_) => "unsupported_gvk",
            AdmissionError::Encode(_) => "encode",
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Errors that prevent the service from starting. Not recoverable.
#[derive(Error, Debug)]
pub enum StartupError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Certificate or key material could not be obtained
    #[error("TLS material unavailable: {0}")]
    TlsMaterial(#[source] std::io::Error),

    /// Certificate or key material was rejected
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Listener failed to bind or serve
    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),
}
