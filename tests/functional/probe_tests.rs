//! Probe and metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use admission_dispatch::health::Metrics;
use admission_dispatch::{AdmissionRequest, AdmissionResponse, DecisionError, WebhookRoutes};
use axum::http::StatusCode;

use crate::common::fixtures::{ReviewBuilder, V1, get, post, send};
use crate::webhook_router;

#[tokio::test]
async fn test_readyz_returns_ok() {
    let (status, _, body) = send(webhook_router("busybox"), get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readyz_is_independent_of_slow_decisions() {
    let router = WebhookRoutes::new(Arc::new(Metrics::new()))
        .route(
            "/slow",
            |req: &AdmissionRequest| -> Result<AdmissionResponse, DecisionError> {
                std::thread::sleep(Duration::from_secs(2));
                Ok(AdmissionResponse::allow(req))
            },
        )
        .into_router(1024 * 1024);

    let slow = {
        let router = router.clone();
        tokio::spawn(async move {
            let body = ReviewBuilder::new(V1, "slow-uid").body();
            send(router, post("/slow", "application/json", body)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, _, body) = tokio::time::timeout(Duration::from_millis(500), send(router, get("/readyz")))
        .await
        .expect("readyz blocked behind a decision function");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");

    let (status, _, _) = slow.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let metrics = Arc::new(Metrics::new());
    let router = WebhookRoutes::new(metrics.clone())
        .route(
            "/deny",
            |req: &AdmissionRequest| -> Result<AdmissionResponse, DecisionError> {
                Ok(AdmissionResponse::deny(req, "no"))
            },
        )
        .into_router(1024 * 1024);

    let body = ReviewBuilder::new(V1, "m-1").body();
    send(router.clone(), post("/deny", "application/json", body)).await;
    send(router.clone(), post("/deny", "text/plain", "x")).await;

    let (status, _, body) = send(router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("admission_requests_total{route=\"/deny\",version=\"v1\",outcome=\"denied\"} 1"));
    assert!(text.contains("admission_errors_total{route=\"/deny\",kind=\"media_type\"} 1"));
}
