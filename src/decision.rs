//! Decision function boundary.
//!
//! A decision function maps a canonical [`AdmissionRequest`] to a canonical
//! [`AdmissionResponse`]. [`invoke`] runs one on the blocking pool and always
//! yields a response carrying the request's UID: errors and panics become an
//! internal denial instead of reaching the transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use thiserror::Error;
use tracing::{error, warn};

use crate::review::{AdmissionRequest, AdmissionResponse};

/// Message returned to the API server when a decision function fails
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error while evaluating admission request";

/// Errors a decision function may return
#[derive(Error, Debug)]
pub enum DecisionError {
    /// The request targets a resource this function does not handle
    #[error("expected resource to be {expected}, got {actual}")]
    UnexpectedResource { expected: String, actual: String },

    /// A patch could not be built
    #[error("failed to build patch: {0}")]
    Patch(#[source] serde_json::Error),

    /// The function panicked
    #[error("decision function panicked")]
    Panicked,

    /// The blocking task was cancelled before it finished
    #[error("decision function was aborted")]
    Aborted,

    /// Any other failure reported by the function
    #[error("{0}")]
    Failed(String),
}

/// A validating or mutating decision function.
///
/// Implementations must be safe to call concurrently for independent requests.
pub trait Admit: Send + Sync + 'static {
    fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, DecisionError>;
}

impl<F> Admit for F
where
    F: Fn(&AdmissionRequest) -> Result<AdmissionResponse, DecisionError> + Send + Sync + 'static,
{
    fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, DecisionError> {
        self(request)
    }
}

/// Result of running a decision function.
#[derive(Debug)]
pub struct Invocation {
    /// Response to send; its UID always matches the request.
    pub response: AdmissionResponse,
    /// Set when the response is an internal denial.
    pub failure: Option<DecisionError>,
}

/// Denial used when a decision function fails.
pub fn internal_denial(uid: impl Into<String>) -> AdmissionResponse {
    AdmissionResponse {
        uid: uid.into(),
        allowed: false,
        result: Some(Status {
            status: Some("Failure".to_string()),
            message: Some(INTERNAL_ERROR_MESSAGE.to_string()),
            reason: Some("InternalError".to_string()),
            code: Some(500),
            ..Default::default()
        }),
        patch: None,
        audit_annotations: BTreeMap::new(),
        warnings: Vec::new(),
    }
}

/// Run `decision` against `request` on the blocking pool.
pub async fn invoke(decision: Arc<dyn Admit>, request: AdmissionRequest) -> Invocation {
    let uid = request.uid.clone();
    let joined = tokio::task::spawn_blocking(move || decision.admit(&request)).await;

    let result = match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(DecisionError::Panicked),
        Err(_) => Err(DecisionError::Aborted),
    };
    seal(uid, result)
}

/// Force the request UID onto a decision result, converting failures into
/// an internal denial.
pub fn seal(uid: String, result: Result<AdmissionResponse, DecisionError>) -> Invocation {
    match result {
        Ok(mut response) => {
            if response.uid != uid {
                if !response.uid.is_empty() {
                    warn!(
                        uid = %uid,
                        returned = %response.uid,
                        "Decision returned a mismatched UID, overwriting"
                    );
                }
                response.uid = uid;
            }
            Invocation {
                response,
                failure: None,
            }
        }
        Err(e) => {
            error!(uid = %uid, error = %e, "Decision function failed, denying request");
            Invocation {
                response: internal_denial(uid),
                failure: Some(e),
            }
        }
    }
}
