//! Mutating decision functions served by the webhook.
//!
//! - `pods`: init container injection for a marked pod
//! - `pods` (sidecar): sidecar container injection for every pod

pub mod pods;

pub use pods::{
    INIT_CONTAINER_NAME, MUTATION_TARGET_POD, MutatePods, MutatePodsSidecar, SIDECAR_NAME,
};

use json_patch::Patch;
use serde_json::Value;

use crate::decision::DecisionError;
use crate::review::ResponsePatch;

/// Build a JSON patch from its JSON representation.
pub(crate) fn json_patch(operations: Value) -> Result<ResponsePatch, DecisionError> {
    let patch: Patch = serde_json::from_value(operations).map_err(DecisionError::Patch)?;
    Ok(ResponsePatch::json(patch))
}
