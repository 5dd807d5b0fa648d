//! Test utilities for unit testing the actuator and reconciler
//!
//! This module provides Machine fixtures, an in-memory `MachineStore` and an
//! Event publisher that records what it was asked to publish.

use crate::actuator::Actuator;
use crate::error::StoreError;
use crate::events::EventPublisher;
use crate::metrics::Metrics;
use crate::store::{MachineStore, finalizers_with, finalizers_without, machine_key};
use async_trait::async_trait;
use bmm_client::{BmmClientTrait, MockBmmClient};
use crds::document::{set_provider_id, set_provider_status};
use crds::{BmmMachineProviderStatus, LIFECYCLE_ANNOTATION, LifecycleTag, ProviderId, machine_api_resource};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::DynamicObject;
use kube_runtime::events::EventType;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SITE_ID: &str = "8a880c71-fe4b-4e43-9e24-ebfcb8a84c5f";
pub const TENANT_ID: &str = "b013708a-99f0-47b2-a630-cabb4ae1d3df";
pub const VPC_ID: &str = "9bb2d7d0-a017-4018-a212-a3d6b38e4ec9";
pub const SUBNET_ID: &str = "63e3909a-dfae-4b8e-8090-3269c5d2a2da";

pub const TEST_ORG: &str = "test-org";
pub const CREDENTIALS_SECRET: &str = "nvidia-bmm-creds";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Minimal valid provider spec
pub fn provider_spec_value() -> serde_json::Value {
    serde_json::json!({
        "siteId": SITE_ID,
        "tenantId": TENANT_ID,
        "vpcId": VPC_ID,
        "subnetId": SUBNET_ID,
        "credentialsSecret": {"name": CREDENTIALS_SECRET, "namespace": "default"}
    })
}

/// Machine carrying `provider_spec_value()` and nothing else
pub fn machine_fixture(name: &str, namespace: &str) -> DynamicObject {
    machine_with_spec(name, namespace, provider_spec_value())
}

pub fn machine_with_spec(name: &str, namespace: &str, spec: serde_json::Value) -> DynamicObject {
    DynamicObject::new(name, &machine_api_resource())
        .within(namespace)
        .data(serde_json::json!({
            "spec": { "providerSpec": { "value": spec } }
        }))
}

/// Mark a Machine as being deleted
pub fn mark_deleting(machine: &mut DynamicObject) {
    let time: Time = serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z"))
        .expect("valid timestamp");
    machine.metadata.deletion_timestamp = Some(time);
}

/// Data of a complete credentials Secret
pub fn credentials_secret() -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        ("endpoint".to_string(), b"https://api.nvidia-bmm.test".to_vec()),
        ("orgName".to_string(), TEST_ORG.as_bytes().to_vec()),
        ("token".to_string(), b"test-token".to_vec()),
    ])
}

/// `MachineStore` holding Machines and Secrets in memory.
///
/// Writes land on the stored copy, so tests read results back with
/// `machine()`. Every write is appended to an operation log.
#[derive(Default)]
pub struct InMemoryMachineStore {
    machines: Mutex<HashMap<(String, String), DynamicObject>>,
    secrets: Mutex<HashMap<(String, String), BTreeMap<String, Vec<u8>>>>,
    ops: Mutex<Vec<String>>,
    fail_writes: Mutex<bool>,
    fail_once: Mutex<Option<String>>,
}

impl InMemoryMachineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_machine(&self, machine: DynamicObject) {
        let key = machine_key(&machine).expect("machine fixture has namespace and name");
        lock(&self.machines).insert(key, machine);
    }

    pub fn add_secret(&self, namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) {
        lock(&self.secrets).insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn machine(&self, namespace: &str, name: &str) -> Option<DynamicObject> {
        lock(&self.machines)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Writes performed so far, e.g. `add_finalizer`, `lifecycle:removed`
    pub fn ops(&self) -> Vec<String> {
        lock(&self.ops).clone()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        *lock(&self.fail_writes) = true;
    }

    /// Make the next write named `op` fail, e.g. `patch_provider_id`
    pub fn fail_next(&self, op: &str) {
        *lock(&self.fail_once) = Some(op.to_string());
    }

    fn write<F>(&self, machine: &DynamicObject, op: String, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut DynamicObject) -> Result<(), StoreError>,
    {
        if *lock(&self.fail_writes) {
            return Err(StoreError::InvalidObject(format!("write rejected: {}", op)));
        }
        if lock(&self.fail_once).take_if(|failing| *failing == op).is_some() {
            return Err(StoreError::InvalidObject("conflict".to_string()));
        }
        let key = machine_key(machine)?;
        let mut machines = lock(&self.machines);
        let stored = machines
            .get_mut(&key)
            .ok_or_else(|| StoreError::MachineNotFound(format!("{}/{}", key.0, key.1)))?;
        apply(stored)?;
        lock(&self.ops).push(op);
        Ok(())
    }
}

#[async_trait]
impl MachineStore for InMemoryMachineStore {
    async fn get_machine(&self, namespace: &str, name: &str) -> Result<Option<DynamicObject>, StoreError> {
        Ok(self.machine(namespace, name))
    }

    async fn patch_provider_status(
        &self,
        machine: &DynamicObject,
        status: &BmmMachineProviderStatus,
    ) -> Result<(), StoreError> {
        self.write(machine, "patch_provider_status".to_string(), |stored| {
            Ok(set_provider_status(&mut stored.data, status)?)
        })
    }

    async fn patch_provider_id(&self, machine: &DynamicObject, provider_id: &ProviderId) -> Result<(), StoreError> {
        self.write(machine, "patch_provider_id".to_string(), |stored| {
            Ok(set_provider_id(&mut stored.data, provider_id)?)
        })
    }

    async fn add_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError> {
        self.write(machine, "add_finalizer".to_string(), |stored| {
            stored.metadata.finalizers = Some(finalizers_with(stored));
            Ok(())
        })
    }

    async fn remove_finalizer(&self, machine: &DynamicObject) -> Result<(), StoreError> {
        let key = machine_key(machine)?;
        self.write(machine, "remove_finalizer".to_string(), |stored| {
            stored.metadata.finalizers = Some(finalizers_without(stored));
            Ok(())
        })?;

        // The API server drops a deleting object once its last finalizer is gone
        let mut machines = lock(&self.machines);
        let released = machines.get(&key).is_some_and(|m| {
            m.metadata.deletion_timestamp.is_some()
                && m.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty())
        });
        if released {
            machines.remove(&key);
        }
        Ok(())
    }

    async fn set_lifecycle_tag(&self, machine: &DynamicObject, tag: LifecycleTag) -> Result<(), StoreError> {
        self.write(machine, format!("lifecycle:{}", tag), |stored| {
            stored
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(LIFECYCLE_ANNOTATION.to_string(), tag.as_str().to_string());
            Ok(())
        })
    }

    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, StoreError> {
        Ok(lock(&self.secrets)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub reason: String,
    pub warning: bool,
    pub note: Option<String>,
}

/// Event publisher that keeps every published Event.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        lock(&self.events).push(RecordedEvent {
            reason: reason.to_string(),
            warning: matches!(type_, EventType::Warning),
            note,
        });
    }
}

/// Actuator wired to in-memory collaborators and a mock BMM client.
pub struct TestHarness {
    pub store: Arc<InMemoryMachineStore>,
    pub events: Arc<RecordingEventPublisher>,
    pub metrics: Arc<Metrics>,
    pub bmm: MockBmmClient,
    pub actuator: Arc<Actuator>,
}

impl TestHarness {
    /// Harness with the default credentials Secret in place
    pub fn new() -> Self {
        let harness = Self::without_credentials();
        harness
            .store
            .add_secret("default", CREDENTIALS_SECRET, credentials_secret());
        harness
    }

    pub fn without_credentials() -> Self {
        let store = Arc::new(InMemoryMachineStore::new());
        let events = Arc::new(RecordingEventPublisher::default());
        let metrics = Arc::new(Metrics::new().expect("metrics registry"));
        let bmm = MockBmmClient::new("https://api.nvidia-bmm.test");

        let client: Arc<dyn BmmClientTrait> = Arc::new(bmm.clone());
        let actuator = Actuator::new(
            store.clone(),
            events.clone(),
            metrics.clone(),
            machine_api_resource(),
        )
        .with_bmm_client(client);

        Self {
            store,
            events,
            metrics,
            bmm,
            actuator: Arc::new(actuator),
        }
    }

    /// Store `machine` and return the stored copy
    pub fn add_machine(&self, machine: DynamicObject) -> DynamicObject {
        self.store.add_machine(machine.clone());
        machine
    }

    /// Current stored copy of a Machine
    pub fn reload(&self, machine: &DynamicObject) -> DynamicObject {
        let (namespace, name) = machine_key(machine).expect("machine key");
        self.store
            .machine(&namespace, &name)
            .expect("machine still stored")
    }
}
