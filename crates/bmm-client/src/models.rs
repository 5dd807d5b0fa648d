//! BMM API models
//!
//! Request and response bodies for the instance endpoints under
//! `/v2/org/{org}/carbide/instance`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /v2/org/{org}/carbide/instance`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub name: String,
    pub tenant_id: Uuid,
    pub vpc_id: Uuid,
    pub interfaces: Vec<InterfaceCreateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unhealthy_machine: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_group_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_home_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceCreateRequest {
    pub subnet_id: Uuid,
    pub is_physical: bool,
}

/// Instance as returned by create and get
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InstanceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<InstanceInterface>>,
}

impl Instance {
    /// Every IP address of every interface, in interface order
    pub fn ip_addresses(&self) -> impl Iterator<Item = &str> {
        self.interfaces
            .iter()
            .flatten()
            .flat_map(|iface| iface.ip_addresses.iter().flatten())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_physical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<Vec<String>>,
}

/// Instance lifecycle state reported by BMM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstanceStatus {
    Pending,
    Provisioning,
    Configuring,
    Ready,
    Updating,
    Terminating,
    Terminated,
    Error,
    /// State names this client does not know yet, kept verbatim
    #[serde(untagged)]
    Other(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::Pending => "Pending",
            InstanceStatus::Provisioning => "Provisioning",
            InstanceStatus::Configuring => "Configuring",
            InstanceStatus::Ready => "Ready",
            InstanceStatus::Updating => "Updating",
            InstanceStatus::Terminating => "Terminating",
            InstanceStatus::Terminated => "Terminated",
            InstanceStatus::Error => "Error",
            InstanceStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of `GET /v2/org/{org}/carbide/instance/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetInstanceParams {
    /// Related objects to expand in the response (e.g. "Machine", "Vpc")
    pub include_relation: Vec<String>,
}

impl GetInstanceParams {
    pub(crate) fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.include_relation
            .iter()
            .map(|r| ("includeRelation", r.as_str()))
            .collect()
    }
}

/// Body of `DELETE /v2/org/{org}/carbide/instance/{id}`. Sent empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDeleteRequest {}

/// Outcome of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteInstanceStatus {
    /// 204: instance deleted
    Deleted,
    /// 404: instance already gone
    NotFound,
    /// Any other status code
    Unexpected(u16),
}

impl DeleteInstanceStatus {
    pub fn from_status_code(code: u16) -> Self {
        match code {
            204 => DeleteInstanceStatus::Deleted,
            404 => DeleteInstanceStatus::NotFound,
            other => DeleteInstanceStatus::Unexpected(other),
        }
    }

    /// Deleted and already-gone both count as success
    pub fn is_success(self) -> bool {
        matches!(self, DeleteInstanceStatus::Deleted | DeleteInstanceStatus::NotFound)
    }
}
