//! Provider ID
//!
//! Stable identifier linking a Machine to exactly one BMM instance.
//!
//! Format: `nvidia-bmm://org/tenant/site/instance-id`. The legacy three segment
//! form `nvidia-bmm://org/site/instance-id` is still accepted on decode and
//! yields an empty tenant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ProviderIdError;

/// Scheme prefix of every provider ID
pub const PROVIDER_PREFIX: &str = "nvidia-bmm://";

/// Decoded `spec.providerID` of a Machine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId {
    /// Organization the instance was created in
    pub org_name: String,
    /// Tenant from the provider spec, empty for legacy IDs
    pub tenant_name: String,
    /// Site from the provider spec
    pub site_name: String,
    /// BMM instance backing the Machine
    pub instance_id: Uuid,
}

impl ProviderId {
    /// Provider ID for `instance_id`
    pub fn new(
        org_name: impl Into<String>,
        tenant_name: impl Into<String>,
        site_name: impl Into<String>,
        instance_id: Uuid,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            tenant_name: tenant_name.into(),
            site_name: site_name.into(),
            instance_id,
        }
    }

    /// Parse a provider ID string (alias for `str::parse`)
    pub fn parse(value: &str) -> Result<Self, ProviderIdError> {
        value.parse()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}/{}/{}",
            PROVIDER_PREFIX, self.org_name, self.tenant_name, self.site_name, self.instance_id
        )
    }
}

impl FromStr for ProviderId {
    type Err = ProviderIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value
            .strip_prefix(PROVIDER_PREFIX)
            .ok_or_else(|| ProviderIdError::MalformedIdentifier {
                expected: PROVIDER_PREFIX,
                value: value.to_string(),
            })?;

        let parts: Vec<&str> = trimmed.split('/').collect();
        let (org, tenant, site, id) = match parts.as_slice() {
            [org, site, id] => (*org, "", *site, *id),
            [org, tenant, site, id] => (*org, *tenant, *site, *id),
            _ => return Err(ProviderIdError::InvalidSegmentCount(value.to_string())),
        };

        let instance_id = Uuid::parse_str(id).map_err(|e| ProviderIdError::InvalidInstanceId {
            value: id.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(org, tenant, site, instance_id))
    }
}

impl Serialize for ProviderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
