// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests for the admission webhook router.
//!
//! These tests drive the full axum router in-process (no TLS, no cluster):
//! request bodies go in through `tower::ServiceExt::oneshot` and the encoded
//! AdmissionReview comes back out.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_v1beta1_sidecar_injection
//! ```
//!
//! ## Test Categories
//!
//! - **Admission tests**: version round trips, UID identity, mutation routes
//! - **Error tests**: content type, decode and version failures, failing decisions
//! - **Probe tests**: readiness under load, metrics

#[path = "../common/mod.rs"]
mod common;

mod probe_tests;

use std::sync::Arc;

use admission_dispatch::health::Metrics;
use admission_dispatch::{Config, create_webhook_router};
use axum::Router;
use clap::Parser;

/// Router configured the way the binary configures it.
pub fn webhook_router(sidecar_image: &str) -> Router {
    let config = Config::try_parse_from([
        "admission-dispatch",
        "--sidecar-image",
        sidecar_image,
        "--max-body-bytes",
        "65536",
    ])
    .unwrap();
    create_webhook_router(&config, Arc::new(Metrics::new()))
}
