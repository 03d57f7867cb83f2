// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for admission-dispatch.
//!
//! Uses proptest to generate random reviews and verify that the UID and the
//! wire version survive every path through the dispatcher.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use admission_dispatch::dispatcher::Dispatcher;
use admission_dispatch::health::Metrics;
use admission_dispatch::schema::{v1, v1beta1};
use admission_dispatch::{AdmissionRequest, AdmissionResponse, DecisionError};
use axum::http::{HeaderMap, HeaderValue, header};
use proptest::prelude::*;

use common::fixtures::{ReviewBuilder, V1, V1BETA1, pod};

/// Strategy for generating request UIDs.
fn any_uid() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,4}"
}

/// Strategy for generating operations.
fn any_operation() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("CREATE"),
        Just("UPDATE"),
        Just("DELETE"),
        Just("CONNECT"),
    ]
}

/// Strategy for generating supported wire versions.
fn any_version() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(V1), Just(V1BETA1)]
}

/// Decision outcomes a route may produce.
#[derive(Clone, Copy, Debug)]
enum Behaviour {
    Allow,
    Deny,
    ForgetUid,
    WrongUid,
    Fail,
}

fn any_behaviour() -> impl Strategy<Value = Behaviour> {
    prop_oneof![
        Just(Behaviour::Allow),
        Just(Behaviour::Deny),
        Just(Behaviour::ForgetUid),
        Just(Behaviour::WrongUid),
        Just(Behaviour::Fail),
    ]
}

fn dispatcher(behaviour: Behaviour) -> Dispatcher {
    let decision = move |req: &AdmissionRequest| -> Result<AdmissionResponse, DecisionError> {
        match behaviour {
            Behaviour::Allow => Ok(AdmissionResponse::allow(req)),
            Behaviour::Deny => Ok(AdmissionResponse::deny(req, "denied")),
            Behaviour::ForgetUid => {
                let mut response = AdmissionResponse::allow(req);
                response.uid.clear();
                Ok(response)
            }
            Behaviour::WrongUid => {
                let mut response = AdmissionResponse::allow(req);
                response.uid = format!("{}-other", req.uid);
                Ok(response)
            }
            Behaviour::Fail => Err(DecisionError::Failed("failed".to_string())),
        }
    };
    Dispatcher::new("/prop", Arc::new(decision), Arc::new(Metrics::new()))
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the response UID always equals the request UID.
    #[test]
    fn prop_uid_identity(
        uid in any_uid(),
        operation in any_operation(),
        api_version in any_version(),
        behaviour in any_behaviour(),
    ) {
        let body = ReviewBuilder::new(api_version, uid.clone())
            .operation(operation)
            .object(pod("web", &["app"]))
            .body();
        let reply = runtime()
            .block_on(dispatcher(behaviour).review(&json_headers(), &body))
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        prop_assert_eq!(value["response"]["uid"].as_str(), Some(uid.as_str()));
        let failed = matches!(behaviour, Behaviour::Deny | Behaviour::Fail);
        prop_assert_eq!(reply.allowed, !failed);
    }

    /// Property: a reply decodes as an envelope of the version that was sent.
    #[test]
    fn prop_version_round_trip(
        uid in any_uid(),
        operation in any_operation(),
        api_version in any_version(),
    ) {
        let body = ReviewBuilder::new(api_version, uid.clone())
            .operation(operation)
            .body();
        let reply = runtime()
            .block_on(dispatcher(Behaviour::Allow).review(&json_headers(), &body))
            .unwrap();

        prop_assert_eq!(reply.version.api_version(), api_version);
        if api_version == V1 {
            let review: v1::AdmissionReview = serde_json::from_slice(&reply.body).unwrap();
            prop_assert_eq!(review.types.api_version, V1);
            prop_assert_eq!(review.response.unwrap().uid, uid);
        } else {
            let review: v1beta1::AdmissionReview = serde_json::from_slice(&reply.body).unwrap();
            prop_assert_eq!(review.types.api_version, V1BETA1);
            prop_assert_eq!(review.response.unwrap().uid, uid);
        }
    }

    /// Property: arbitrary bytes never panic the dispatcher.
    #[test]
    fn prop_garbage_is_rejected(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let result = runtime().block_on(dispatcher(Behaviour::Allow).review(&json_headers(), &body));
        prop_assert!(result.is_err());
    }

    /// Property: unsupported admission versions are always rejected.
    #[test]
    fn prop_unknown_versions_rejected(version in "v[0-9]{1,2}(alpha|beta)?[0-9]?") {
        prop_assume!(version != "v1" && version != "v1beta1");
        let body = ReviewBuilder::new(format!("admission.k8s.io/{}", version), "x").body();
        let result = runtime().block_on(dispatcher(Behaviour::Allow).review(&json_headers(), &body));
        let is_unsupported = matches!(result, Err(admission_dispatch::AdmissionError::UnsupportedGvk(_)));
        prop_assert!(is_unsupported);
    }
}
