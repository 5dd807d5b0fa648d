//! Machine watcher.
//!
//! Drives the reconciler from a `kube_runtime::Controller` over the Machine
//! resource. The runtime handles reconnection and keeps at most one
//! reconciliation per Machine in flight.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use futures::StreamExt;
use kube::ResourceExt;
use kube::api::{Api, ApiResource, DynamicObject};
use kube_runtime::{Controller, controller::Action, watcher};
use std::sync::Arc;
use tracing::{debug, error, info};

async fn reconcile(machine: Arc<DynamicObject>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let name = machine.name_any();
    let namespace = machine
        .namespace()
        .ok_or_else(|| ControllerError::MissingNamespace(name.clone()))?;

    let outcome = ctx.reconcile_machine(&namespace, &name).await?;
    debug!("Machine {}/{} reconciled: {:?}", namespace, name, outcome);
    Ok(outcome.into_action())
}

fn error_policy(machine: Arc<DynamicObject>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action {
    error!(
        "Reconciliation error for Machine {}/{}: {}",
        machine.namespace().unwrap_or_default(),
        machine.name_any(),
        error
    );
    Action::requeue(ctx.requeue_after)
}

/// Watch Machines and reconcile every change until the stream ends.
pub async fn watch_machines(
    api: Api<DynamicObject>,
    ar: ApiResource,
    reconciler: Arc<Reconciler>,
) -> Result<(), ControllerError> {
    info!("Starting Machine watcher");

    Controller::new_with(api, watcher::Config::default(), ar)
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {}", obj.name),
                Err(e) => error!("Machine controller error: {}", e),
            }
        })
        .await;

    info!("Machine watcher stopped");
    Ok(())
}
