//! Machine actuator
//!
//! Create, Exists, Update and Delete of the BMM instance behind a Machine.
//! Each operation issues at most one BMM call; retries are left to the
//! reconcile loop's requeue.

mod credentials;
mod request;


use crate::error::ActuatorError;
use crate::events::{EventPublisher, actions, reasons};
use crate::metrics::{Metrics, outcome};
use crate::store::MachineStore;
use bmm_client::{
    BmmClient, BmmClientTrait, DeleteInstanceStatus, GetInstanceParams, Instance, InstanceDeleteRequest,
};
use crds::document::{decode_provider_spec, decode_provider_status, provider_id};
use crds::{BmmMachineProviderSpec, BmmMachineProviderStatus, MachineAddress, ProviderId};
use kube::api::{ApiResource, DynamicObject};
use kube::{Resource, ResourceExt};
use kube_runtime::events::EventType;
use request::{build_instance_request, parse_uuid, validate_spec};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Drives BMM instances for Machines.
pub struct Actuator {
    store: Arc<dyn MachineStore>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    ar: ApiResource,
    /// Replaces the per-call `BmmClient` (tests)
    client: Option<Arc<dyn BmmClientTrait>>,
    /// Replaces the organization from the credentials Secret (tests)
    org_name: Option<String>,
}

impl Actuator {
    pub fn new(
        store: Arc<dyn MachineStore>,
        events: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
        ar: ApiResource,
    ) -> Self {
        Self {
            store,
            events,
            metrics,
            ar,
            client: None,
            org_name: None,
        }
    }

    /// Use `client` for every BMM call instead of building one from credentials.
    #[cfg(test)]
    pub fn with_bmm_client(mut self, client: Arc<dyn BmmClientTrait>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use `org_name` instead of the organization from the credentials Secret.
    #[cfg(test)]
    pub fn with_org_name(mut self, org_name: impl Into<String>) -> Self {
        self.org_name = Some(org_name.into());
        self
    }

    /// Provision a new instance for the Machine and record it.
    pub async fn create(&self, machine: &DynamicObject) -> Result<ProviderId, ActuatorError> {
        let name = machine.name_any();
        let spec = decode_provider_spec(&machine.data)?;
        validate_spec(&spec)?;
        let request = build_instance_request(&name, &spec)?;
        let existing = decode_provider_status(&machine.data)?;

        let (client, org) = self.bmm_client(&spec).await?;

        info!("Creating BMM instance for Machine {}", name);
        let instance = match client.create_instance(&org, &request).await {
            Ok(Some(instance)) => {
                self.metrics.record_remote_call("create", outcome::SUCCESS);
                instance
            }
            Ok(None) => {
                self.metrics.record_remote_call("create", outcome::EMPTY);
                self.publish(
                    machine,
                    EventType::Warning,
                    reasons::FAILED_CREATE,
                    actions::CREATE,
                    "Create instance returned no data".to_string(),
                )
                .await;
                return Err(ActuatorError::EmptyCreateResponse);
            }
            Err(e) => {
                self.metrics.record_remote_call("create", outcome::ERROR);
                self.publish(
                    machine,
                    EventType::Warning,
                    reasons::FAILED_CREATE,
                    actions::CREATE,
                    format!("Failed to create instance: {}", e),
                )
                .await;
                return Err(e.into());
            }
        };

        let status = BmmMachineProviderStatus {
            instance_id: Some(instance.id.to_string()),
            machine_id: instance.machine_id.clone(),
            instance_state: instance.status.as_ref().map(|s| s.to_string()),
            addresses: addresses_of(&instance),
            conditions: existing.conditions,
        };
        self.store.patch_provider_status(machine, &status).await?;

        let pid = ProviderId::new(org, spec.tenant_id.as_str(), spec.site_id.as_str(), instance.id);
        self.store.patch_provider_id(machine, &pid).await?;

        self.publish(
            machine,
            EventType::Normal,
            reasons::CREATED,
            actions::CREATE,
            format!("Created instance {}", instance.id),
        )
        .await;
        info!("Created BMM instance {} for Machine {} ({})", instance.id, name, pid);
        Ok(pid)
    }

    /// Whether the recorded instance still exists. A Machine without a
    /// recorded instance ID does not exist and costs no BMM call.
    pub async fn exists(&self, machine: &DynamicObject) -> Result<bool, ActuatorError> {
        let status = decode_provider_status(&machine.data)?;
        let Some(instance_id) = status.instance_id() else {
            debug!("Machine {} has no instance ID recorded", machine.name_any());
            return Ok(false);
        };
        let instance_uuid = parse_uuid("instance ID", instance_id)?;

        let spec = decode_provider_spec(&machine.data)?;
        let (client, org) = self.bmm_client(&spec).await?;

        match client.get_instance(&org, instance_uuid, &GetInstanceParams::default()).await {
            Ok(Some(_)) => {
                self.metrics.record_remote_call("get", outcome::SUCCESS);
                Ok(true)
            }
            Ok(None) => {
                self.metrics.record_remote_call("get", outcome::EMPTY);
                Ok(false)
            }
            Err(e) if e.is_not_found() => {
                self.metrics.record_remote_call("get", outcome::NOT_FOUND);
                info!("BMM instance {} of Machine {} no longer exists", instance_uuid, machine.name_any());
                Ok(false)
            }
            Err(e) => {
                // Only NotFound means absent
                self.metrics.record_remote_call("get", outcome::ERROR);
                Err(e.into())
            }
        }
    }

    /// Refresh the provider status from the current instance. Issues no
    /// mutation against BMM. A provider ID lost between the two writes of
    /// `create` is recorded again here.
    pub async fn update(&self, machine: &DynamicObject) -> Result<(), ActuatorError> {
        let name = machine.name_any();
        let mut status = decode_provider_status(&machine.data)?;
        let instance_id = status
            .instance_id()
            .ok_or_else(|| ActuatorError::InstanceNotProvisioned(name.clone()))?
            .to_string();
        let instance_uuid = parse_uuid("instance ID", &instance_id)?;
        self.check_provider_id(machine, instance_uuid)?;

        let spec = decode_provider_spec(&machine.data)?;
        let (client, org) = self.bmm_client(&spec).await?;

        let instance = match client.get_instance(&org, instance_uuid, &GetInstanceParams::default()).await {
            Ok(Some(instance)) => {
                self.metrics.record_remote_call("get", outcome::SUCCESS);
                instance
            }
            Ok(None) => {
                self.metrics.record_remote_call("get", outcome::EMPTY);
                return Err(ActuatorError::EmptyGetResponse(instance_id));
            }
            Err(e) => {
                let label = if e.is_not_found() { outcome::NOT_FOUND } else { outcome::ERROR };
                self.metrics.record_remote_call("get", label);
                return Err(e.into());
            }
        };

        if let Some(state) = &instance.status {
            status.instance_state = Some(state.to_string());
        }
        if instance.machine_id.is_some() {
            status.machine_id = instance.machine_id.clone();
        }
        status.addresses = addresses_of(&instance);

        self.store.patch_provider_status(machine, &status).await?;

        if provider_id(&machine.data).is_none() {
            let pid = ProviderId::new(org, spec.tenant_id.as_str(), spec.site_id.as_str(), instance_uuid);
            self.store.patch_provider_id(machine, &pid).await?;
            info!("Recorded missing providerID {} on Machine {}", pid, name);
        }

        debug!(
            "Updated Machine {} from instance {} (state {:?}, {} addresses)",
            name,
            instance_id,
            status.instance_state,
            status.addresses.len()
        );
        Ok(())
    }

    /// Release the recorded instance. Succeeds without a BMM call when no
    /// instance was ever recorded; an instance already gone counts as deleted.
    pub async fn delete(&self, machine: &DynamicObject) -> Result<(), ActuatorError> {
        let status = decode_provider_status(&machine.data)?;
        let Some(instance_id) = status.instance_id() else {
            debug!("Machine {} has no instance to delete", machine.name_any());
            return Ok(());
        };
        let instance_uuid = parse_uuid("instance ID", instance_id)?;

        let spec = decode_provider_spec(&machine.data)?;
        let (client, org) = self.bmm_client(&spec).await?;

        info!("Deleting BMM instance {} of Machine {}", instance_uuid, machine.name_any());
        let result = client
            .delete_instance(&org, instance_uuid, &InstanceDeleteRequest::default())
            .await;

        match result {
            Ok(deleted @ (DeleteInstanceStatus::Deleted | DeleteInstanceStatus::NotFound)) => {
                let label = if deleted == DeleteInstanceStatus::NotFound {
                    outcome::NOT_FOUND
                } else {
                    outcome::SUCCESS
                };
                self.metrics.record_remote_call("delete", label);
                self.publish(
                    machine,
                    EventType::Normal,
                    reasons::DELETED,
                    actions::DELETE,
                    format!("Deleted instance {}", instance_id),
                )
                .await;
                Ok(())
            }
            Ok(DeleteInstanceStatus::Unexpected(code)) => {
                self.metrics.record_remote_call("delete", outcome::ERROR);
                self.publish(
                    machine,
                    EventType::Warning,
                    reasons::FAILED_DELETE,
                    actions::DELETE,
                    format!("Delete instance returned unexpected status: {}", code),
                )
                .await;
                Err(ActuatorError::UnexpectedDeleteStatus(code))
            }
            Err(e) => {
                self.metrics.record_remote_call("delete", outcome::ERROR);
                self.publish(
                    machine,
                    EventType::Warning,
                    reasons::FAILED_DELETE,
                    actions::DELETE,
                    format!("Failed to delete instance: {}", e),
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Resolve credentials and pick the client and organization for one call.
    async fn bmm_client(
        &self,
        spec: &BmmMachineProviderSpec,
    ) -> Result<(Arc<dyn BmmClientTrait>, String), ActuatorError> {
        let creds = credentials::resolve(self.store.as_ref(), &spec.credentials_secret).await?;

        let client: Arc<dyn BmmClientTrait> = match &self.client {
            Some(client) => Arc::clone(client),
            None => Arc::new(BmmClient::new(creds.endpoint, creds.token)?),
        };
        let org = self.org_name.clone().unwrap_or(creds.org_name);
        Ok((client, org))
    }

    /// A recorded provider ID must parse and should point at the recorded instance.
    fn check_provider_id(&self, machine: &DynamicObject, instance_id: Uuid) -> Result<(), ActuatorError> {
        if let Some(raw) = provider_id(&machine.data) {
            let pid = ProviderId::parse(raw)?;
            if pid.instance_id != instance_id {
                warn!(
                    "Machine {} providerID {} does not match recorded instance {}",
                    machine.name_any(),
                    raw,
                    instance_id
                );
            }
        }
        Ok(())
    }

    async fn publish(&self, machine: &DynamicObject, type_: EventType, reason: &str, action: &str, note: String) {
        let reference = machine.object_ref(&self.ar);
        self.events.publish(&reference, type_, reason, action, Some(note)).await;
    }
}

/// Every address of every interface, tagged InternalIP.
fn addresses_of(instance: &Instance) -> Vec<MachineAddress> {
    instance.ip_addresses().map(MachineAddress::internal_ip).collect()
}
