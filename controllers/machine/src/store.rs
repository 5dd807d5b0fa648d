//! Machine store
//!
//! Reads and writes of Machines and credential Secrets go through
//! `MachineStore` so the actuator and reconciler can run against an in-memory
//! store in unit tests.

use crate::error::StoreError;
use async_trait::async_trait;
use crds::document::{provider_id_patch, provider_status_patch};
use crds::{BmmMachineProviderStatus, LIFECYCLE_ANNOTATION, LifecycleTag, MACHINE_FINALIZER, ProviderId};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Access to Machines and credential Secrets.
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// Fetch a Machine, `None` if it does not exist.
    async fn get_machine(&self, namespace: &str, name: &str) -> Result<Option<DynamicObject>, StoreError>;

    /// Replace `status.providerStatus`.
    async fn patch_provider_status(
        &self,
        machine: &DynamicObject,
        status: &BmmMachineProviderStatus,
    ) -> Result<(), StoreError>;

    /// Set `spec.providerID`.
    async fn patch_provider_id(&self, machine: &DynamicObject, provider_id: &ProviderId) -> Result<(), StoreError>;

    async fn add_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError>;

    async fn remove_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError>;

    /// Set the lifecycle annotation.
    async fn set_lifecycle_tag(&self, machine: &DynamicObject, tag: LifecycleTag) -> Result<(), StoreError>;

    /// Data of a Secret, `None` if it does not exist.
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, StoreError>;
}

/// Namespace and name of a Machine object.
pub fn machine_key(machine: &DynamicObject) -> Result<(String, String), StoreError> {
    let name = machine
        .metadata
        .name
        .clone()
        .ok_or_else(|| StoreError::InvalidObject("Machine has no name".to_string()))?;
    let namespace = machine
        .namespace()
        .ok_or_else(|| StoreError::InvalidObject(format!("Machine {} has no namespace", name)))?;
    Ok((namespace, name))
}

/// Finalizer list with the provider finalizer added.
pub fn finalizers_with(machine: &DynamicObject) -> Vec<String> {
    let mut finalizers = machine.finalizers().to_vec();
    if !finalizers.iter().any(|f| f == MACHINE_FINALIZER) {
        finalizers.push(MACHINE_FINALIZER.to_string());
    }
    finalizers
}

/// Finalizer list with the provider finalizer removed.
pub fn finalizers_without(machine: &DynamicObject) -> Vec<String> {
    machine
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != MACHINE_FINALIZER)
        .cloned()
        .collect()
}

/// `MachineStore` backed by the Kubernetes API.
pub struct KubeMachineStore {
    client: Client,
    ar: ApiResource,
}

impl KubeMachineStore {
    pub fn new(client: Client, ar: ApiResource) -> Self {
        Self { client, ar }
    }

    fn machines(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.ar)
    }

    async fn merge_patch(&self, machine: &DynamicObject, patch: serde_json::Value) -> Result<(), StoreError> {
        let (namespace, name) = machine_key(machine)?;
        match self
            .machines(&namespace)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Err(StoreError::MachineNotFound(format!("{}/{}", namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MachineStore for KubeMachineStore {
    async fn get_machine(&self, namespace: &str, name: &str) -> Result<Option<DynamicObject>, StoreError> {
        Ok(self.machines(namespace).get_opt(name).await?)
    }

    async fn patch_provider_status(
        &self,
        machine: &DynamicObject,
        status: &BmmMachineProviderStatus,
    ) -> Result<(), StoreError> {
        let (namespace, name) = machine_key(machine)?;
        let patch = provider_status_patch(status)?;
        debug!("Patching providerStatus of Machine {}/{}", namespace, name);
        self.machines(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn patch_provider_id(&self, machine: &DynamicObject, provider_id: &ProviderId) -> Result<(), StoreError> {
        self.merge_patch(machine, provider_id_patch(provider_id)).await
    }

    async fn add_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError> {
        let patch = serde_json::json!({
            "metadata": { "finalizers": finalizers_with(machine) }
        });
        self.merge_patch(machine, patch).await
    }

    async fn remove_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError> {
        let patch = serde_json::json!({
            "metadata": { "finalizers": finalizers_without(machine) }
        });
        match self.merge_patch(machine, patch).await {
            // Already gone
            Err(StoreError::MachineNotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn set_lifecycle_tag(&self, machine: &DynamicObject, tag: LifecycleTag) -> Result<(), StoreError> {
        let patch = serde_json::json!({
            "metadata": { "annotations": { LIFECYCLE_ANNOTATION: tag.as_str() } }
        });
        self.merge_patch(machine, patch).await
    }

    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, StoreError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets.get_opt(name).await?;
        Ok(secret.map(|s| {
            s.data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.0))
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::machine_fixture;

    #[test]
    fn test_machine_key() {
        let machine = machine_fixture("worker-0", "openshift-machine-api");
        assert_eq!(
            machine_key(&machine).unwrap(),
            ("openshift-machine-api".to_string(), "worker-0".to_string())
        );

        let mut orphan = machine.clone();
        orphan.metadata.namespace = None;
        assert!(matches!(machine_key(&orphan), Err(StoreError::InvalidObject(_))));
    }

    #[test]
    fn test_finalizer_lists() {
        let mut machine = machine_fixture("worker-0", "default");
        machine.metadata.finalizers = Some(vec!["machine.openshift.io".to_string()]);

        let added = finalizers_with(&machine);
        assert_eq!(added, vec!["machine.openshift.io".to_string(), MACHINE_FINALIZER.to_string()]);

        machine.metadata.finalizers = Some(added);
        assert_eq!(finalizers_with(&machine).len(), 2);
        assert_eq!(finalizers_without(&machine), vec!["machine.openshift.io".to_string()]);
    }
}
