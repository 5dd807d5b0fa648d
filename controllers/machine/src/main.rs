//! NVIDIA BMM Machine Controller
//!
//! OpenShift Machine API provider for NVIDIA Bare Metal Manager:
//! - Provisions a BMM instance for every Machine carrying a BMM provider spec
//! - Mirrors instance state and addresses into the Machine's provider status
//! - Releases the instance before the Machine is allowed to disappear

mod actuator;
mod config;
mod controller;
mod error;
mod events;
mod metrics;
mod reconciler;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting NVIDIA BMM Machine Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Metrics address: {}", config.metrics_bind_address);
    info!("  Health probe address: {}", config.health_probe_bind_address);
    info!("  Requeue after: {:?}", config.requeue_after);
    info!("  Requeue after create: {:?}", config.create_requeue_after);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
