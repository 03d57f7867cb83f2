//! Canonical admission review model.
//!
//! Every wire generation is normalized into these types before a decision
//! function sees it, and every decision is expressed in them before being
//! converted back. Business logic never touches a versioned envelope.

use std::collections::BTreeMap;

use json_patch::Patch;
use k8s_openapi::api::authentication::v1::UserInfo;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::core::admission::Operation;
use kube::core::{GroupVersionKind, GroupVersionResource};
use serde_json::Value;

/// A single admission request, independent of the wire version it arrived in.
///
/// Built once per inbound call by the schema normalizer and never mutated.
#[derive(Clone, Debug)]
pub struct AdmissionRequest {
    /// Opaque request identifier; must be echoed back verbatim.
    pub uid: String,
    /// Fully-qualified kind of the object being admitted.
    pub kind: GroupVersionKind,
    /// Resource being requested.
    pub resource: GroupVersionResource,
    pub sub_resource: Option<String>,
    /// Original kind when the request was converted by the API server.
    /// Always `None` for generations that predate the field.
    pub request_kind: Option<GroupVersionKind>,
    pub request_resource: Option<GroupVersionResource>,
    pub request_sub_resource: Option<String>,
    /// Object name; may be empty on CREATE when the name is generated.
    pub name: String,
    pub namespace: Option<String>,
    pub operation: Operation,
    pub user_info: UserInfo,
    /// Serialized object being admitted. `None` on DELETE.
    pub object: Option<Value>,
    /// Existing object for UPDATE and DELETE.
    pub old_object: Option<Value>,
    pub dry_run: bool,
    pub options: Option<Value>,
}

impl AdmissionRequest {
    /// Whether the request targets the given group/version/resource.
    pub fn targets(&self, group: &str, version: &str, resource: &str) -> bool {
        self.resource.group == group
            && self.resource.version == version
            && self.resource.resource == resource
    }
}

/// Encoding of a [`ResponsePatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatchType {
    /// RFC 6902 JSON patch.
    #[default]
    JsonPatch,
}

/// Edit operations to apply to the admitted object.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponsePatch {
    pub patch_type: PatchType,
    pub operations: Patch,
}

impl ResponsePatch {
    /// Create a JSON patch from its operations.
    pub fn json(operations: Patch) -> Self {
        Self {
            patch_type: PatchType::JsonPatch,
            operations,
        }
    }
}

/// The decision for one [`AdmissionRequest`].
#[derive(Clone, Debug, PartialEq)]
pub struct AdmissionResponse {
    /// Identifier of the request this answers.
    pub uid: String,
    pub allowed: bool,
    /// Human readable outcome, mostly populated on denial.
    pub result: Option<Status>,
    pub patch: Option<ResponsePatch>,
    pub audit_annotations: BTreeMap<String, String>,
    /// Warnings shown to the API client.
    pub warnings: Vec<String>,
}

impl AdmissionResponse {
    /// An allowed response with no mutation.
    pub fn allow(request: &AdmissionRequest) -> Self {
        Self {
            uid: request.uid.clone(),
            allowed: true,
            result: None,
            patch: None,
            audit_annotations: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// A denied response carrying `message`.
    pub fn deny(request: &AdmissionRequest, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            result: Some(Status {
                status: Some("Failure".to_string()),
                message: Some(message.into()),
                ..Default::default()
            }),
            ..Self::allow(request)
        }
    }

    /// Attach an HTTP-style status code to the result.
    pub fn with_code(mut self, code: i32) -> Self {
        self.result.get_or_insert_with(Status::default).code = Some(code);
        self
    }

    /// Attach a patch.
    pub fn with_patch(mut self, patch: ResponsePatch) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Message of the result, if any.
    pub fn message(&self) -> Option<&str> {
        self.result.as_ref().and_then(|s| s.message.as_deref())
    }
}
