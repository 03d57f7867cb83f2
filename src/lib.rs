//! admission-dispatch library crate
//!
//! Multi-version admission review dispatch: decodes `admission.k8s.io/v1` and
//! `admission.k8s.io/v1beta1` AdmissionReviews, normalizes them to one
//! canonical request, runs a decision function and replies in the caller's
//! version.

pub mod config;
pub mod decision;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod mutators;
pub mod review;
pub mod schema;
pub mod server;
pub mod tls;

pub use config::Config;
pub use decision::{Admit, DecisionError, invoke};
pub use dispatcher::Dispatcher;
pub use error::{AdmissionError, StartupError};
pub use review::{AdmissionRequest, AdmissionResponse, PatchType, ResponsePatch};
pub use schema::{WireEnvelope, WireVersion};
pub use server::{
    MUTATE_PODS_PATH, MUTATE_PODS_SIDECAR_PATH, WebhookRoutes, create_webhook_router, run_server,
};
pub use tls::{PemFiles, TlsMaterial, TlsMaterialSource};
