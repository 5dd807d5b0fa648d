//! Mock BmmClient for unit testing
//!
//! This module provides a mock implementation of BmmClientTrait that can be
//! used in unit tests without a reachable BMM endpoint. Instances are kept in
//! memory; failures can be injected per operation.

use crate::bmm_trait::BmmClientTrait;
use crate::error::BmmError;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Failures {
    create: Option<String>,
    get: Option<String>,
    delete: Option<String>,
    empty_create: bool,
    empty_get: bool,
    delete_status: Option<DeleteInstanceStatus>,
}

#[derive(Debug, Default)]
struct Calls {
    create: Vec<(String, CreateInstanceRequest)>,
    get: Vec<(String, Uuid)>,
    delete: Vec<(String, Uuid)>,
}

/// Mock BmmClient for testing
///
/// Clones share state, so a test can keep a handle while the code under test
/// owns another.
#[derive(Debug, Clone)]
pub struct MockBmmClient {
    base_url: String,
    instances: Arc<Mutex<HashMap<Uuid, Instance>>>,
    failures: Arc<Mutex<Failures>>,
    calls: Arc<Mutex<Calls>>,
    // Counter for generating addresses
    next_host: Arc<Mutex<u8>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBmmClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            instances: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(Failures::default())),
            calls: Arc::new(Mutex::new(Calls::default())),
            next_host: Arc::new(Mutex::new(10)),
        }
    }

    /// Add an instance to the mock store (for test setup)
    pub fn add_instance(&self, instance: Instance) {
        lock(&self.instances).insert(instance.id, instance);
    }

    /// Remove an instance behind the controller's back
    pub fn remove_instance(&self, id: Uuid) -> Option<Instance> {
        lock(&self.instances).remove(&id)
    }

    pub fn instance(&self, id: Uuid) -> Option<Instance> {
        lock(&self.instances).get(&id).cloned()
    }

    pub fn instance_count(&self) -> usize {
        lock(&self.instances).len()
    }

    /// Change the reported state of an instance
    pub fn set_instance_status(&self, id: Uuid, status: InstanceStatus) {
        if let Some(instance) = lock(&self.instances).get_mut(&id) {
            instance.status = Some(status);
        }
    }

    /// Replace the interfaces of an instance with one interface per address
    pub fn set_instance_addresses(&self, id: Uuid, addresses: Vec<String>) {
        if let Some(instance) = lock(&self.instances).get_mut(&id) {
            instance.interfaces = Some(
                addresses
                    .into_iter()
                    .map(|ip| InstanceInterface {
                        ip_addresses: Some(vec![ip]),
                        ..Default::default()
                    })
                    .collect(),
            );
        }
    }

    /// Make the next create calls fail with an API error
    pub fn fail_create(&self, message: impl Into<String>) {
        lock(&self.failures).create = Some(message.into());
    }

    /// Make get calls fail with an API error
    pub fn fail_get(&self, message: impl Into<String>) {
        lock(&self.failures).get = Some(message.into());
    }

    /// Make delete calls fail with a transport-level error
    pub fn fail_delete(&self, message: impl Into<String>) {
        lock(&self.failures).delete = Some(message.into());
    }

    /// Make create answer without an instance payload
    pub fn return_empty_create(&self) {
        lock(&self.failures).empty_create = true;
    }

    /// Make get answer without an instance payload
    pub fn return_empty_get(&self) {
        lock(&self.failures).empty_get = true;
    }

    /// Force the status returned by delete
    pub fn set_delete_status(&self, status: DeleteInstanceStatus) {
        lock(&self.failures).delete_status = Some(status);
    }

    /// Clear all injected failures
    pub fn clear_failures(&self) {
        *lock(&self.failures) = Failures::default();
    }

    /// Create requests received so far, with their org
    pub fn create_requests(&self) -> Vec<(String, CreateInstanceRequest)> {
        lock(&self.calls).create.clone()
    }

    pub fn create_calls(&self) -> usize {
        lock(&self.calls).create.len()
    }

    pub fn get_calls(&self) -> usize {
        lock(&self.calls).get.len()
    }

    pub fn delete_calls(&self) -> usize {
        lock(&self.calls).delete.len()
    }

    /// Total number of remote calls of any kind
    pub fn total_calls(&self) -> usize {
        let calls = lock(&self.calls);
        calls.create.len() + calls.get.len() + calls.delete.len()
    }

    fn next_address(&self) -> String {
        let mut host = lock(&self.next_host);
        let address = format!("10.0.0.{}", *host);
        *host = host.wrapping_add(1);
        address
    }
}

#[async_trait::async_trait]
impl BmmClientTrait for MockBmmClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_instance(
        &self,
        org: &str,
        request: &CreateInstanceRequest,
    ) -> Result<Option<Instance>, BmmError> {
        lock(&self.calls)
            .create
            .push((org.to_string(), request.clone()));

        {
            let failures = lock(&self.failures);
            if let Some(message) = &failures.create {
                return Err(BmmError::Api(message.clone()));
            }
            if failures.empty_create {
                return Ok(None);
            }
        }

        let interfaces = request
            .interfaces
            .iter()
            .map(|iface| InstanceInterface {
                subnet_id: Some(iface.subnet_id),
                is_physical: Some(iface.is_physical),
                ip_addresses: Some(vec![self.next_address()]),
            })
            .collect();

        let instance = Instance {
            id: Uuid::new_v4(),
            name: Some(request.name.clone()),
            machine_id: request.machine_id.clone(),
            status: Some(InstanceStatus::Pending),
            interfaces: Some(interfaces),
        };
        lock(&self.instances).insert(instance.id, instance.clone());
        Ok(Some(instance))
    }

    async fn get_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        _params: &GetInstanceParams,
    ) -> Result<Option<Instance>, BmmError> {
        lock(&self.calls).get.push((org.to_string(), instance_id));

        {
            let failures = lock(&self.failures);
            if let Some(message) = &failures.get {
                return Err(BmmError::Api(message.clone()));
            }
            if failures.empty_get {
                return Ok(None);
            }
        }

        lock(&self.instances)
            .get(&instance_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| BmmError::NotFound(format!("Instance {} not found", instance_id)))
    }

    async fn delete_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        _request: &InstanceDeleteRequest,
    ) -> Result<DeleteInstanceStatus, BmmError> {
        lock(&self.calls).delete.push((org.to_string(), instance_id));

        let forced = {
            let failures = lock(&self.failures);
            if let Some(message) = &failures.delete {
                return Err(BmmError::Api(message.clone()));
            }
            failures.delete_status
        };
        if let Some(status) = forced {
            return Ok(status);
        }

        Ok(match lock(&self.instances).remove(&instance_id) {
            Some(_) => DeleteInstanceStatus::Deleted,
            None => DeleteInstanceStatus::NotFound,
        })
    }
}
