//! Main controller implementation.
//!
//! Wires the Kubernetes client, Machine store, Event recorder, actuator and
//! reconciler together, then runs the Machine watcher alongside the health
//! and metrics servers.

use crate::actuator::Actuator;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{EVENT_REPORTER, KubeEventPublisher};
use crate::metrics::{self, Metrics};
use crate::reconciler::Reconciler;
use crate::store::KubeMachineStore;
use crate::watcher::watch_machines;
use crds::machine_api_resource;
use kube::api::{Api, DynamicObject};
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for OpenShift Machines backed by NVIDIA BMM.
pub struct Controller {
    machine_watcher: JoinHandle<Result<(), ControllerError>>,
    health_server: JoinHandle<Result<(), ControllerError>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing NVIDIA BMM Machine Controller");

        let kube_client = Client::try_default().await?;
        let ar = machine_api_resource();

        let machine_api: Api<DynamicObject> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced_with(kube_client.clone(), ns, &ar),
            None => Api::all_with(kube_client.clone(), &ar),
        };

        let metrics = Arc::new(Metrics::new()?);
        let store = Arc::new(KubeMachineStore::new(kube_client.clone(), ar.clone()));
        let events = Arc::new(KubeEventPublisher::new(kube_client, EVENT_REPORTER));

        let actuator = Arc::new(Actuator::new(
            store.clone(),
            events,
            metrics.clone(),
            ar.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            actuator,
            store,
            metrics.clone(),
            config.requeue_after,
            config.create_requeue_after,
        ));

        let machine_watcher = tokio::spawn(watch_machines(machine_api, ar, reconciler));

        let health_server = tokio::spawn(metrics::serve(
            config.health_probe_bind_address,
            metrics::health_routes(),
            "Health probe",
        ));
        let metrics_server = tokio::spawn(metrics::serve(
            config.metrics_bind_address,
            metrics::metrics_routes(metrics),
            "Metrics",
        ));

        Ok(Self {
            machine_watcher,
            health_server,
            metrics_server,
        })
    }

    /// Runs until the watcher stops or a server fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("NVIDIA BMM Machine Controller running");

        tokio::select! {
            result = &mut self.machine_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Machine watcher panicked: {}", e)))??;
            }
            result = &mut self.health_server => {
                result.map_err(|e| ControllerError::Watch(format!("Health server panicked: {}", e)))??;
            }
            result = &mut self.metrics_server => {
                result.map_err(|e| ControllerError::Watch(format!("Metrics server panicked: {}", e)))??;
            }
        }

        self.health_server.abort();
        self.metrics_server.abort();
        info!("NVIDIA BMM Machine Controller stopped");
        Ok(())
    }
}
