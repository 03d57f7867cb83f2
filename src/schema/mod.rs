//! Wire schema handling for `admission.k8s.io` AdmissionReview envelopes.
//!
//! Two generations are served side by side:
//! - `admission.k8s.io/v1beta1`
//! - `admission.k8s.io/v1`
//!
//! Each generation has its own envelope types and exactly one conversion pair
//! to and from the canonical model in [`crate::review`]. Adding a generation
//! means adding a module, a [`WireVersion`] variant and a [`WireEnvelope`]
//! variant; nothing above this module changes.

pub mod v1;
pub mod v1beta1;

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use json_patch::Patch;
use kube::core::{GroupVersionKind, TypeMeta};
use serde_json::Value;

use crate::error::AdmissionError;
use crate::review::{AdmissionRequest, AdmissionResponse};

/// API group of every AdmissionReview generation
pub const ADMISSION_GROUP: &str = "admission.k8s.io";
/// Kind of the review envelope
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// Supported wire generation of an AdmissionReview.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireVersion {
    V1beta1,
    V1,
}

impl WireVersion {
    /// Supported generations in match order.
    pub const SUPPORTED: [WireVersion; 2] = [WireVersion::V1beta1, WireVersion::V1];

    /// Version component of the API group version.
    pub fn as_str(self) -> &'static str {
        match self {
            WireVersion::V1beta1 => "v1beta1",
            WireVersion::V1 => "v1",
        }
    }

    /// Full `apiVersion` string.
    pub fn api_version(self) -> String {
        format!("{}/{}", ADMISSION_GROUP, self.as_str())
    }

    /// Group/version/kind this generation is identified by.
    pub fn gvk(self) -> GroupVersionKind {
        GroupVersionKind::gvk(ADMISSION_GROUP, self.as_str(), ADMISSION_REVIEW_KIND)
    }

    /// Find the generation matching `gvk`, checking [`Self::SUPPORTED`] in order.
    pub fn identify(gvk: &GroupVersionKind) -> Option<Self> {
        Self::SUPPORTED
            .into_iter()
            .find(|version| version.gvk() == *gvk)
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a GVK the way the API server prints it.
pub fn display_gvk(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("/{}, Kind={}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind)
    }
}

/// Read the declared group/version/kind of a decoded body.
pub fn declared_gvk(body: &Value) -> Result<GroupVersionKind, AdmissionError> {
    let object = body
        .as_object()
        .ok_or_else(|| AdmissionError::Decode("body is not a JSON object".to_string()))?;

    let api_version = object
        .get("apiVersion")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdmissionError::Decode("Object 'apiVersion' is missing".to_string()))?;
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdmissionError::Decode("Object 'Kind' is missing".to_string()))?;

    let (group, version) = api_version.rsplit_once('/').unwrap_or(("", api_version));
    Ok(GroupVersionKind::gvk(group, version, kind))
}

/// A version-tagged AdmissionReview as exchanged on the wire.
#[derive(Clone, Debug)]
pub enum WireEnvelope {
    V1beta1(v1beta1::AdmissionReview),
    V1(v1::AdmissionReview),
}

impl WireEnvelope {
    /// Decode a request body and identify its generation.
    pub fn decode(body: &[u8]) -> Result<Self, AdmissionError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| AdmissionError::Decode(e.to_string()))?;
        let gvk = declared_gvk(&value)?;
        let version = WireVersion::identify(&gvk)
            .ok_or_else(|| AdmissionError::UnsupportedGvk(display_gvk(&gvk)))?;

        let envelope = match version {
            WireVersion::V1beta1 => WireEnvelope::V1beta1(decode_typed(value)?),
            WireVersion::V1 => WireEnvelope::V1(decode_typed(value)?),
        };
        Ok(envelope)
    }

    pub fn version(&self) -> WireVersion {
        match self {
            WireEnvelope::V1beta1(_) => WireVersion::V1beta1,
            WireEnvelope::V1(_) => WireVersion::V1,
        }
    }

    /// Extract the request and normalize it.
    pub fn into_canonical(self) -> Result<(TypeMeta, AdmissionRequest), AdmissionError> {
        match self {
            WireEnvelope::V1beta1(review) => v1beta1::into_canonical(review),
            WireEnvelope::V1(review) => v1::into_canonical(review),
        }
    }

    /// Build a reply envelope of `version` around a canonical response.
    pub fn from_canonical(
        version: WireVersion,
        types: TypeMeta,
        response: AdmissionResponse,
    ) -> Result<Self, AdmissionError> {
        let envelope = match version {
            WireVersion::V1beta1 => {
                WireEnvelope::V1beta1(v1beta1::from_canonical(types, response)?)
            }
            WireVersion::V1 => WireEnvelope::V1(v1::from_canonical(types, response)?),
        };
        Ok(envelope)
    }

    /// Serialize to JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, AdmissionError> {
        let bytes = match self {
            WireEnvelope::V1beta1(review) => serde_json::to_vec(review)?,
            WireEnvelope::V1(review) => serde_json::to_vec(review)?,
        };
        Ok(bytes)
    }
}

fn decode_typed<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, AdmissionError> {
    serde_json::from_value(value).map_err(|e| AdmissionError::Decode(e.to_string()))
}

/// Serialize patch operations and base64 them for the `patch` field.
pub(crate) fn encode_patch(operations: &Patch) -> Result<String, serde_json::Error> {
    let raw = serde_json::to_vec(operations)?;
    Ok(STANDARD.encode(raw))
}

/// Inverse of [`encode_patch`].
pub fn decode_patch(encoded: &str) -> Result<Patch, AdmissionError> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|e| AdmissionError::Decode(format!("patch is not base64: {}", e)))?;
    serde_json::from_slice(&raw).map_err(|e| AdmissionError::Decode(e.to_string()))
}

/// Namespaces are serialized as empty strings for cluster-scoped objects.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
