//! `admission.k8s.io/v1beta1` envelope.
//!
//! Older API servers omit `requestKind`, `requestResource`,
//! `requestSubResource` and `options`; they normalize to `None` in that case.

use std::collections::BTreeMap;

use k8s_openapi::api::authentication::v1::UserInfo;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::core::admission::Operation;
use kube::core::{GroupVersionKind, GroupVersionResource, TypeMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{encode_patch, non_empty};
use crate::error::AdmissionError;
use crate::review::{self, PatchType as CanonicalPatchType};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionReview {
    #[serde(flatten)]
    pub types: TypeMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    pub resource: GroupVersionResource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_resource: Option<GroupVersionResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_sub_resource: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub operation: Operation,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub object: Option<Value>,
    #[serde(default)]
    pub old_object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub options: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub audit_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Normalize a v1beta1 review into the canonical request.
pub fn into_canonical(
    review: AdmissionReview,
) -> Result<(TypeMeta, review::AdmissionRequest), AdmissionError> {
    let request = review
        .request
        .ok_or_else(|| AdmissionError::Decode("AdmissionReview has no request".to_string()))?;

    let canonical = review::AdmissionRequest {
        uid: request.uid,
        kind: request.kind,
        resource: request.resource,
        sub_resource: non_empty(request.sub_resource),
        request_kind: request.request_kind,
        request_resource: request.request_resource,
        request_sub_resource: non_empty(request.request_sub_resource),
        name: request.name,
        namespace: non_empty(request.namespace),
        operation: request.operation,
        user_info: request.user_info,
        object: request.object,
        old_object: request.old_object,
        dry_run: request.dry_run.unwrap_or(false),
        options: request.options,
    };
    Ok((review.types, canonical))
}

/// Wrap a canonical response in a v1beta1 review.
pub fn from_canonical(
    types: TypeMeta,
    response: review::AdmissionResponse,
) -> Result<AdmissionReview, serde_json::Error> {
    let (patch, patch_type) = match &response.patch {
        Some(p) => {
            let patch_type = match p.patch_type {
                CanonicalPatchType::JsonPatch => PatchType::JsonPatch,
            };
            (Some(encode_patch(&p.operations)?), Some(patch_type))
        }
        None => (None, None),
    };

    debug!(uid = %response.uid, patched = patch.is_some(), "Encoding v1beta1 response");

    Ok(AdmissionReview {
        types,
        request: None,
        response: Some(AdmissionResponse {
            uid: response.uid,
            allowed: response.allowed,
            result: response.result,
            patch,
            patch_type,
            audit_annotations: response.audit_annotations,
            warnings: response.warnings,
        }),
    })
}
