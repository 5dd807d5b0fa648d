//! NVIDIA BMM Machine provider spec
//!
//! Desired state embedded in `spec.providerSpec.value` of an OpenShift Machine.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How to provision the BMM instance behind a Machine
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BmmMachineProviderSpec {
    /// Optional TypeMeta carried by some manifests (ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// TypeMeta kind (ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// BMM site UUID
    pub site_id: String,

    /// BMM tenant UUID
    pub tenant_id: String,

    /// Instance type UUID (mutually exclusive with `machine_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type_id: Option<String>,

    /// Specific machine for targeted provisioning (mutually exclusive with `instance_type_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,

    /// Allow provisioning on a machine the platform reports as unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unhealthy_machine: Option<bool>,

    /// VPC UUID
    pub vpc_id: String,

    /// Primary subnet UUID
    pub subnet_id: String,

    /// Additional interfaces for multi-NIC configurations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_subnet_ids: Vec<AdditionalSubnet>,

    /// cloud-init user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,

    /// SSH key group UUIDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_key_group_ids: Vec<String>,

    /// Labels applied to the BMM instance
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Secret holding `endpoint`, `orgName` and `token`
    pub credentials_secret: CredentialsSecretReference,
}

/// Extra interface attached after the primary subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalSubnet {
    /// Subnet UUID for this interface
    pub subnet_id: String,

    /// Physical rather than virtual interface
    #[serde(default)]
    pub is_physical: bool,
}

/// Location of the BMM credentials Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSecretReference {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
}

impl BmmMachineProviderSpec {
    /// Returns the user data only when it is non-empty
    pub fn user_data(&self) -> Option<&str> {
        self.user_data.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns the instance type only when it is non-empty
    pub fn instance_type_id(&self) -> Option<&str> {
        self.instance_type_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns the targeted machine only when it is non-empty
    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_spec() {
        let spec: BmmMachineProviderSpec = serde_json::from_value(serde_json::json!({
            "siteId": "site",
            "tenantId": "tenant",
            "vpcId": "vpc",
            "subnetId": "subnet",
            "credentialsSecret": {"name": "creds", "namespace": "default"}
        }))
        .unwrap();

        assert_eq!(spec.site_id, "site");
        assert!(spec.additional_subnet_ids.is_empty());
        assert!(spec.labels.is_empty());
        assert_eq!(spec.instance_type_id(), None);
        assert_eq!(spec.credentials_secret.name, "creds");
    }

    #[test]
    fn test_deserialize_full_spec() {
        let spec: BmmMachineProviderSpec = serde_json::from_value(serde_json::json!({
            "apiVersion": "nvidiabmmprovider.openshift.io/v1beta1",
            "kind": "NvidiaBMMMachineProviderSpec",
            "siteId": "site",
            "tenantId": "tenant",
            "vpcId": "vpc",
            "subnetId": "subnet",
            "instanceTypeId": "itype",
            "allowUnhealthyMachine": true,
            "additionalSubnetIds": [{"subnetId": "extra", "isPhysical": true}, {"subnetId": "virt"}],
            "userData": "#cloud-config",
            "sshKeyGroupIds": ["skg"],
            "labels": {"env": "test"},
            "credentialsSecret": {"name": "creds", "namespace": "default"}
        }))
        .unwrap();

        assert_eq!(spec.instance_type_id(), Some("itype"));
        assert_eq!(spec.allow_unhealthy_machine, Some(true));
        assert_eq!(spec.additional_subnet_ids.len(), 2);
        assert!(spec.additional_subnet_ids[0].is_physical);
        assert!(!spec.additional_subnet_ids[1].is_physical);
        assert_eq!(spec.user_data(), Some("#cloud-config"));
        assert_eq!(spec.labels.get("env").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let result: Result<BmmMachineProviderSpec, _> = serde_json::from_value(serde_json::json!({
            "siteId": "site",
            "tenantId": "tenant",
            "subnetId": "subnet",
            "credentialsSecret": {"name": "creds", "namespace": "default"}
        }));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("vpcId"));
    }

    #[test]
    fn test_empty_strings_treated_as_absent() {
        let spec: BmmMachineProviderSpec = serde_json::from_value(serde_json::json!({
            "siteId": "site",
            "tenantId": "tenant",
            "vpcId": "vpc",
            "subnetId": "subnet",
            "machineId": "",
            "userData": "",
            "credentialsSecret": {"name": "creds", "namespace": "default"}
        }))
        .unwrap();
        assert_eq!(spec.machine_id(), None);
        assert_eq!(spec.user_data(), None);
    }
}
