//! Pod mutations.
//!
//! Both mutators only handle the core `pods` resource. Pods that already
//! carry the injected container are admitted unchanged, so re-invocation
//! is harmless.

use k8s_openapi::api::core::v1::{Container, Pod};
use serde_json::json;
use tracing::{debug, info};

use super::json_patch;
use crate::decision::{Admit, DecisionError};
use crate::review::{AdmissionRequest, AdmissionResponse, ResponsePatch};

/// Name of the pod that [`MutatePods`] mutates
pub const MUTATION_TARGET_POD: &str = "webhook-to-be-mutated";
/// Init container added by [`MutatePods`]
pub const INIT_CONTAINER_NAME: &str = "webhook-added-init-container";
/// Container added by [`MutatePodsSidecar`]
pub const SIDECAR_NAME: &str = "webhook-added-sidecar";

fn has_container(containers: &[Container], name: &str) -> bool {
    containers.iter().any(|c| c.name == name)
}

/// Decode the pod under review and decide whether and how to patch it.
///
/// A request without an object is allowed as is. An object that is not a
/// pod is denied with the decode error.
fn apply_pod_patch<F>(
    request: &AdmissionRequest,
    build_patch: F,
) -> Result<AdmissionResponse, DecisionError>
where
    F: FnOnce(&Pod) -> Result<Option<ResponsePatch>, DecisionError>,
{
    if !request.targets("", "v1", "pods") {
        return Err(DecisionError::UnexpectedResource {
            expected: "/v1, Resource=pods".to_string(),
            actual: format!(
                "{}/{}, Resource={}",
                request.resource.group, request.resource.version, request.resource.resource
            ),
        });
    }

    let Some(object) = &request.object else {
        debug!(uid = %request.uid, operation = ?request.operation, "No object in request, allowing");
        return Ok(AdmissionResponse::allow(request));
    };

    let pod: Pod = match serde_json::from_value(object.clone()) {
        Ok(pod) => pod,
        Err(e) => {
            return Ok(AdmissionResponse::deny(
                request,
                format!("Pod could not be decoded: {}", e),
            ));
        }
    };

    let response = AdmissionResponse::allow(request);
    match build_patch(&pod)? {
        Some(patch) => Ok(response.with_patch(patch)),
        None => Ok(response),
    }
}

/// Adds an init container to the pod named [`MUTATION_TARGET_POD`].
#[derive(Clone, Debug)]
pub struct MutatePods {
    image: String,
}

impl MutatePods {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

impl Admit for MutatePods {
    fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, DecisionError> {
        apply_pod_patch(request, |pod| {
            if pod.metadata.name.as_deref() != Some(MUTATION_TARGET_POD) {
                return Ok(None);
            }
            let spec = pod.spec.as_ref();
            let init_containers = spec
                .and_then(|s| s.init_containers.as_deref())
                .unwrap_or_default();
            if has_container(init_containers, INIT_CONTAINER_NAME) {
                return Ok(None);
            }

            let container = json!({"image": self.image, "name": INIT_CONTAINER_NAME, "resources": {}});
            // Adding the whole array would replace existing init containers
            let operation = if init_containers.is_empty() {
                json!({"op": "add", "path": "/spec/initContainers", "value": [container]})
            } else {
                json!({"op": "add", "path": "/spec/initContainers/-", "value": container})
            };
            info!(uid = %request.uid, image = %self.image, "Injecting init container");
            json_patch(json!([operation])).map(Some)
        })
    }
}

/// Appends a sidecar container to every pod that lacks one.
#[derive(Clone, Debug)]
pub struct MutatePodsSidecar {
    image: String,
}

impl MutatePodsSidecar {
    /// An empty `image` makes every request a denial.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

impl Admit for MutatePodsSidecar {
    fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, DecisionError> {
        if self.image.is_empty() {
            return Ok(AdmissionResponse::deny(
                request,
                "No image specified by the sidecar-image parameter",
            )
            .with_code(500));
        }

        apply_pod_patch(request, |pod| {
            let containers = pod
                .spec
                .as_ref()
                .map(|s| s.containers.as_slice())
                .unwrap_or_default();
            if has_container(containers, SIDECAR_NAME) {
                return Ok(None);
            }

            info!(uid = %request.uid, image = %self.image, "Injecting sidecar container");
            json_patch(json!([{
                "op": "add",
                "path": "/spec/containers/-",
                "value": {"image": self.image, "name": SIDECAR_NAME, "resources": {}}
            }]))
            .map(Some)
        })
    }
}
