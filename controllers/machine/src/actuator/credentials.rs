//! BMM credentials resolved from the Secret named in the provider spec.

use crate::error::ActuatorError;
use crate::store::MachineStore;
use crds::CredentialsSecretReference;
use std::collections::BTreeMap;
use std::fmt;

pub const ENDPOINT_KEY: &str = "endpoint";
pub const ORG_NAME_KEY: &str = "orgName";
pub const TOKEN_KEY: &str = "token";

/// Endpoint, organization and token for one actuator operation. Never cached.
#[derive(Clone)]
pub struct Credentials {
    pub endpoint: String,
    pub org_name: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("org_name", &self.org_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Fetch and validate the credentials Secret.
pub async fn resolve(
    store: &dyn MachineStore,
    secret_ref: &CredentialsSecretReference,
) -> Result<Credentials, ActuatorError> {
    let data = store
        .get_secret_data(&secret_ref.namespace, &secret_ref.name)
        .await?
        .ok_or_else(|| {
            ActuatorError::CredentialsUnavailable(format!(
                "secret {}/{} not found",
                secret_ref.namespace, secret_ref.name
            ))
        })?;

    Ok(Credentials {
        endpoint: field(&data, &secret_ref.name, ENDPOINT_KEY)?,
        org_name: field(&data, &secret_ref.name, ORG_NAME_KEY)?,
        token: field(&data, &secret_ref.name, TOKEN_KEY)?,
    })
}

fn field(data: &BTreeMap<String, Vec<u8>>, secret: &str, key: &str) -> Result<String, ActuatorError> {
    let raw = data.get(key).ok_or_else(|| {
        ActuatorError::CredentialsUnavailable(format!("secret {} is missing '{}' field", secret, key))
    })?;
    let value = String::from_utf8(raw.clone()).map_err(|_| {
        ActuatorError::CredentialsUnavailable(format!("secret {} field '{}' is not valid UTF-8", secret, key))
    })?;
    Ok(value.trim().to_string())
}
