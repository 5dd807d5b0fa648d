//! Kubernetes Event recording for Machines.
//!
//! Events are fire-and-forget: failures are logged and never fail an actuator
//! operation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

/// Reporting component shown on published Events
pub const EVENT_REPORTER: &str = "nvidia-bmm-machine-controller";

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event on the given object. Never fails.
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publisher backed by `kube_runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// Publisher that drops every event.
#[cfg(test)]
pub struct NoopEventPublisher;

#[cfg(test)]
#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Event reasons (REASON column of `kubectl get events`).
pub mod reasons {
    pub const CREATED: &str = "Created";
    pub const FAILED_CREATE: &str = "FailedCreate";
    pub const DELETED: &str = "Deleted";
    pub const FAILED_DELETE: &str = "FailedDelete";
}

/// Event actions.
pub mod actions {
    pub const CREATE: &str = "Create";
    pub const DELETE: &str = "Delete";
}
