//! Reconciliation state machine.
//!
//! Each pass re-reads the Machine, derives its lifecycle phase and runs the
//! actuator operation that phase calls for. Nothing is carried between
//! passes; the finalizer and the lifecycle annotation are the only state.

use crate::actuator::Actuator;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::store::MachineStore;
use crds::document::decode_provider_status;
use crds::{BmmMachineProviderStatus, DocumentError, LifecycleTag, has_finalizer, is_deleting, lifecycle_tag};
use kube::api::DynamicObject;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// No instance ID recorded
    NotProvisioned,
    Provisioned,
}

/// Lifecycle phase of a Machine, derived from its persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Absent,
    PresentNoFinalizer,
    PresentWithFinalizer(Provisioning),
    /// Deletion requested, finalizer still held
    Deleting,
    /// Deletion requested without the finalizer
    Released,
}

impl Phase {
    pub fn of(machine: Option<&DynamicObject>) -> Result<Self, DocumentError> {
        let Some(machine) = machine else {
            return Ok(Phase::Absent);
        };
        let finalized = has_finalizer(&machine.metadata);

        Ok(match (is_deleting(&machine.metadata), finalized) {
            (true, true) => Phase::Deleting,
            (true, false) => Phase::Released,
            (false, false) => Phase::PresentNoFinalizer,
            (false, true) => {
                let status = decode_provider_status(&machine.data)?;
                if status.instance_id().is_some() {
                    Phase::PresentWithFinalizer(Provisioning::Provisioned)
                } else {
                    Phase::PresentWithFinalizer(Provisioning::NotProvisioned)
                }
            }
        })
    }

    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Absent => "absent",
            Phase::PresentNoFinalizer => "present_no_finalizer",
            Phase::PresentWithFinalizer(Provisioning::NotProvisioned) => "not_provisioned",
            Phase::PresentWithFinalizer(Provisioning::Provisioned) => "provisioned",
            Phase::Deleting => "deleting",
            Phase::Released => "released",
        }
    }
}

/// What the runtime should do after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Wait for the next change
    Done,
    RequeueNow,
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    pub fn into_action(self) -> Action {
        match self {
            ReconcileOutcome::Done => Action::await_change(),
            ReconcileOutcome::RequeueNow => Action::requeue(Duration::ZERO),
            ReconcileOutcome::RequeueAfter(after) => Action::requeue(after),
        }
    }
}

/// Runs the state machine for one Machine at a time.
pub struct Reconciler {
    actuator: Arc<Actuator>,
    store: Arc<dyn MachineStore>,
    metrics: Arc<Metrics>,
    /// Steady-state requeue, also used after errors
    pub requeue_after: Duration,
    create_requeue_after: Duration,
}

impl Reconciler {
    pub fn new(
        actuator: Arc<Actuator>,
        store: Arc<dyn MachineStore>,
        metrics: Arc<Metrics>,
        requeue_after: Duration,
        create_requeue_after: Duration,
    ) -> Self {
        Self {
            actuator,
            store,
            metrics,
            requeue_after,
            create_requeue_after,
        }
    }

    /// One reconciliation pass for the Machine `namespace/name`.
    pub async fn reconcile_machine(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let machine = self.store.get_machine(namespace, name).await?;
        let phase = match Phase::of(machine.as_ref()) {
            Ok(phase) => phase,
            Err(e) => {
                self.metrics.record_reconcile_error("unknown");
                return Err(e.into());
            }
        };
        self.metrics.record_reconcile(phase.as_str());
        debug!("Reconciling Machine {}/{} in phase {:?}", namespace, name, phase);

        let result = match (phase, machine) {
            (Phase::PresentNoFinalizer, Some(machine)) => self.attach_finalizer(&machine).await,
            (Phase::PresentWithFinalizer(_), Some(machine)) => self.converge(&machine).await,
            (Phase::Deleting, Some(machine)) => self.release(&machine).await,
            (Phase::Released, Some(machine)) => self.release_unfinalized(&machine).await,
            _ => {
                debug!("Machine {}/{} not found", namespace, name);
                Ok(ReconcileOutcome::Done)
            }
        };

        if let Err(e) = &result {
            self.metrics.record_reconcile_error(phase.as_str());
            warn!("Reconciliation of Machine {}/{} failed in phase {}: {}", namespace, name, phase.as_str(), e);
        }
        result
    }

    /// Attach the finalizer before anything remote happens.
    async fn attach_finalizer(&self, machine: &DynamicObject) -> Result<ReconcileOutcome, ControllerError> {
        self.store.add_finalizer(machine).await?;
        self.store.set_lifecycle_tag(machine, LifecycleTag::Active).await?;
        info!("Attached finalizer to Machine {}", display_name(machine));
        Ok(ReconcileOutcome::RequeueNow)
    }

    async fn converge(&self, machine: &DynamicObject) -> Result<ReconcileOutcome, ControllerError> {
        if self.actuator.exists(machine).await? {
            self.actuator.update(machine).await?;
            Ok(ReconcileOutcome::RequeueAfter(self.requeue_after))
        } else {
            let provider_id = self.actuator.create(machine).await?;
            info!("Machine {} provisioned as {}", display_name(machine), provider_id);
            Ok(ReconcileOutcome::RequeueAfter(self.create_requeue_after))
        }
    }

    /// Release the instance, then let go of the Machine. The finalizer stays
    /// until the remote delete succeeded.
    async fn release(&self, machine: &DynamicObject) -> Result<ReconcileOutcome, ControllerError> {
        if lifecycle_tag(&machine.metadata) != Some(LifecycleTag::DeletingPendingCleanup) {
            self.store
                .set_lifecycle_tag(machine, LifecycleTag::DeletingPendingCleanup)
                .await?;
        }

        self.actuator.delete(machine).await?;
        self.forget_instance(machine).await?;

        // Tag first: the Machine may disappear as soon as the finalizer is gone
        self.store.set_lifecycle_tag(machine, LifecycleTag::Removed).await?;
        self.store.remove_finalizer(machine).await?;
        info!("Released Machine {}", display_name(machine));
        Ok(ReconcileOutcome::Done)
    }

    /// Deletion without our finalizer: release the instance, leave the
    /// finalizers and lifecycle tag alone.
    async fn release_unfinalized(&self, machine: &DynamicObject) -> Result<ReconcileOutcome, ControllerError> {
        debug!("Machine {} is being deleted without our finalizer", display_name(machine));
        self.actuator.delete(machine).await?;
        self.forget_instance(machine).await?;
        Ok(ReconcileOutcome::Done)
    }

    /// Drop the released instance from the provider status, keeping conditions.
    /// Later passes then find nothing to delete.
    async fn forget_instance(&self, machine: &DynamicObject) -> Result<(), ControllerError> {
        let status = decode_provider_status(&machine.data)?;
        if status.instance_id().is_none() {
            return Ok(());
        }
        let cleared = BmmMachineProviderStatus {
            conditions: status.conditions,
            ..Default::default()
        };
        self.store.patch_provider_status(machine, &cleared).await?;
        Ok(())
    }
}

fn display_name(machine: &DynamicObject) -> String {
    format!(
        "{}/{}",
        machine.metadata.namespace.as_deref().unwrap_or_default(),
        machine.metadata.name.as_deref().unwrap_or_default()
    )
}
