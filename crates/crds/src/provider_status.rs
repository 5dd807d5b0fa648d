//! NVIDIA BMM Machine provider status
//!
//! Observed state written to `status.providerStatus` of an OpenShift Machine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What the provider last observed about the instance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BmmMachineProviderStatus {
    /// BMM instance ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    /// Physical machine backing the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,

    /// Remote instance state, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_state: Option<String>,

    /// Instance addresses, rebuilt on every refresh
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<MachineAddress>,

    /// Conditions are opaque to the provider and carried through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<serde_json::Value>,
}

/// One entry of the Machine's address list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MachineAddress {
    /// Address kind
    #[serde(rename = "type")]
    pub address_type: MachineAddressType,
    /// IP or DNS name
    pub address: String,
}

impl MachineAddress {
    /// `InternalIP` address
    pub fn internal_ip(address: impl Into<String>) -> Self {
        Self {
            address_type: MachineAddressType::InternalIP,
            address: address.into(),
        }
    }
}

/// Address kinds understood by the Machine API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum MachineAddressType {
    /// Host name
    Hostname,
    /// Externally routable IP
    ExternalIP,
    /// Cluster-internal IP
    InternalIP,
    /// Externally resolvable DNS name
    ExternalDNS,
    /// Cluster-internal DNS name
    InternalDNS,
}

impl BmmMachineProviderStatus {
    /// Recorded instance ID, ignoring empty strings
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_serializes_empty() {
        let value = serde_json::to_value(BmmMachineProviderStatus::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_address_type_key() {
        let status = BmmMachineProviderStatus {
            instance_id: Some("abc".to_string()),
            addresses: vec![MachineAddress::internal_ip("10.0.0.5")],
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "instanceId": "abc",
                "addresses": [{"type": "InternalIP", "address": "10.0.0.5"}]
            })
        );
    }

    #[test]
    fn test_conditions_carried_through() {
        let condition = serde_json::json!({
            "type": "Ready",
            "status": "True",
            "lastTransitionTime": "2024-01-01T00:00:00Z",
            "reason": "Provisioned",
            "message": ""
        });
        let status: BmmMachineProviderStatus = serde_json::from_value(serde_json::json!({
            "conditions": [condition.clone()]
        }))
        .unwrap();
        assert_eq!(status.conditions, vec![condition]);
        assert_eq!(status.instance_id(), None);
    }
}
