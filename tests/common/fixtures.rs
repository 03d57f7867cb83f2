//! Test fixtures and builder patterns for AdmissionReview bodies.

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const V1: &str = "admission.k8s.io/v1";
pub const V1BETA1: &str = "admission.k8s.io/v1beta1";

/// Build a pod object with the named containers.
pub fn pod(name: &str, containers: &[&str]) -> Value {
    let containers: Vec<Value> = containers
        .iter()
        .map(|c| json!({"name": c, "image": "nginx:1.27"}))
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": name, "namespace": "default"},
        "spec": {"containers": containers}
    })
}

/// Builder for creating AdmissionReview request bodies.
///
/// # Example
/// ```
/// let body = ReviewBuilder::new(V1BETA1, "abc-123")
///     .operation("CREATE")
///     .object(pod("web", &["app"]))
///     .body();
/// ```
#[derive(Clone, Debug)]
pub struct ReviewBuilder {
    api_version: String,
    uid: String,
    operation: String,
    resource: (String, String, String),
    name: String,
    namespace: String,
    object: Option<Value>,
    old_object: Option<Value>,
}

impl ReviewBuilder {
    /// Create a pod CREATE review of the given apiVersion.
    pub fn new(api_version: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            uid: uid.into(),
            operation: "CREATE".to_string(),
            resource: ("".to_string(), "v1".to_string(), "pods".to_string()),
            name: "web".to_string(),
            namespace: "default".to_string(),
            object: Some(pod("web", &["app"])),
            old_object: None,
        }
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    pub fn resource(mut self, group: &str, version: &str, resource: &str) -> Self {
        self.resource = (group.to_string(), version.to_string(), resource.to_string());
        self
    }

    pub fn object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    pub fn no_object(mut self) -> Self {
        self.object = None;
        self
    }

    pub fn old_object(mut self, object: Value) -> Self {
        self.old_object = Some(object);
        self
    }

    /// Build the review as JSON.
    pub fn build(self) -> Value {
        let (group, version, resource) = self.resource;
        json!({
            "apiVersion": self.api_version,
            "kind": "AdmissionReview",
            "request": {
                "uid": self.uid,
                "kind": {"group": group, "version": version, "kind": "Pod"},
                "resource": {"group": group, "version": version, "resource": resource},
                "name": self.name,
                "namespace": self.namespace,
                "operation": self.operation,
                "userInfo": {"username": "system:serviceaccount:kube-system:replicaset-controller"},
                "object": self.object,
                "oldObject": self.old_object,
                "dryRun": false
            }
        })
    }

    /// Build the review as a request body.
    pub fn body(self) -> Vec<u8> {
        serde_json::to_vec(&self.build()).unwrap_or_default()
    }
}

/// POST request with the given content type.
pub fn post(path: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap_or_default()
}

/// GET request.
pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap_or_default()
}

/// Send a request through the router and collect the full response.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Option<String>, Bytes) {
    let response = match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap_or_default();
    (status, content_type, body)
}

/// Decode the base64 JSON patch of a response envelope.
pub fn decoded_patch(envelope: &Value) -> Option<Value> {
    let encoded = envelope.get("response")?.get("patch")?.as_str()?;
    let raw = STANDARD.decode(encoded).ok()?;
    serde_json::from_slice(&raw).ok()
}
