//! Machine document codec
//!
//! OpenShift Machines are handled as untyped documents (the `data` of a
//! `kube::api::DynamicObject`). These helpers decode the provider subtrees into
//! typed structs and build the patches that write them back.

use serde_json::{Map, Value, json};

use crate::error::DocumentError;
use crate::provider_id::ProviderId;
use crate::provider_spec::BmmMachineProviderSpec;
use crate::provider_status::BmmMachineProviderStatus;

const PROVIDER_SPEC_PATH: &str = "spec.providerSpec.value";
const PROVIDER_STATUS_PATH: &str = "status.providerStatus";

/// Keys of `BmmMachineProviderStatus`. Absent keys are nulled in merge patches
/// so the stored status is replaced wholesale.
const PROVIDER_STATUS_KEYS: [&str; 5] = [
    "instanceId",
    "machineId",
    "instanceState",
    "addresses",
    "conditions",
];

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |node, key| node.get(key))
        .filter(|v| !v.is_null())
}

/// Decode `spec.providerSpec.value`. Missing subtree or missing required
/// fields are errors.
pub fn decode_provider_spec(doc: &Value) -> Result<BmmMachineProviderSpec, DocumentError> {
    let value = lookup(doc, PROVIDER_SPEC_PATH)
        .ok_or_else(|| DocumentError::MissingField(PROVIDER_SPEC_PATH.to_string()))?;

    serde_json::from_value(value.clone()).map_err(|source| DocumentError::Invalid {
        path: PROVIDER_SPEC_PATH.to_string(),
        source,
    })
}

/// Decode `status.providerStatus`. A machine that was never provisioned has no
/// provider status yet, which decodes to the empty status.
pub fn decode_provider_status(doc: &Value) -> Result<BmmMachineProviderStatus, DocumentError> {
    match lookup(doc, PROVIDER_STATUS_PATH) {
        None => Ok(BmmMachineProviderStatus::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|source| DocumentError::Invalid {
                path: PROVIDER_STATUS_PATH.to_string(),
                source,
            })
        }
    }
}

/// Encode a provider status as its JSON object form.
pub fn encode_provider_status(status: &BmmMachineProviderStatus) -> Result<Value, DocumentError> {
    serde_json::to_value(status).map_err(|source| DocumentError::Invalid {
        path: PROVIDER_STATUS_PATH.to_string(),
        source,
    })
}

/// Merge patch body replacing `status.providerStatus` wholesale.
pub fn provider_status_patch(status: &BmmMachineProviderStatus) -> Result<Value, DocumentError> {
    let mut encoded = encode_provider_status(status)?;
    let object = encoded.as_object_mut().ok_or(DocumentError::NotAnObject)?;
    for key in PROVIDER_STATUS_KEYS {
        object.entry(key).or_insert(Value::Null);
    }
    Ok(json!({ "status": { "providerStatus": encoded } }))
}

/// Merge patch body setting `spec.providerID`.
pub fn provider_id_patch(provider_id: &ProviderId) -> Value {
    json!({ "spec": { "providerID": provider_id.to_string() } })
}

/// Current `spec.providerID`, if any
pub fn provider_id(doc: &Value) -> Option<&str> {
    lookup(doc, "spec.providerID").and_then(Value::as_str)
}

/// Write a provider status into a document in place, replacing any previous
/// provider status.
pub fn set_provider_status(
    doc: &mut Value,
    status: &BmmMachineProviderStatus,
) -> Result<(), DocumentError> {
    let encoded = encode_provider_status(status)?;
    child_object(doc, "status")?.insert("providerStatus".to_string(), encoded);
    Ok(())
}

/// Write `spec.providerID` into a document in place.
pub fn set_provider_id(doc: &mut Value, provider_id: &ProviderId) -> Result<(), DocumentError> {
    child_object(doc, "spec")?.insert(
        "providerID".to_string(),
        Value::String(provider_id.to_string()),
    );
    Ok(())
}

fn child_object<'a>(doc: &'a mut Value, key: &str) -> Result<&'a mut Map<String, Value>, DocumentError> {
    let root = doc.as_object_mut().ok_or(DocumentError::NotAnObject)?;
    let child = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    child.as_object_mut().ok_or(DocumentError::NotAnObject)
}
