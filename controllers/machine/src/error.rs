//! Controller-specific error types.
//!
//! `ActuatorError` covers one actuator operation against a Machine;
//! `ControllerError` covers the reconcile loop and process wiring.

use bmm_client::BmmError;
use crds::{DocumentError, ProviderIdError};
use kube::Error as KubeError;
use thiserror::Error;

/// Errors raised by the Machine store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Machine document could not be encoded for the patch
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Machine vanished between read and write
    #[error("Machine not found: {0}")]
    MachineNotFound(String),

    /// Machine object lacks a namespace or name
    #[error("Invalid Machine object: {0}")]
    InvalidObject(String),
}

/// Errors raised by actuator operations.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// Provider spec/status could not be decoded
    #[error("Invalid provider document: {0}")]
    Document(#[from] DocumentError),

    /// An identifier in the spec or status is not a UUID
    #[error("failed to parse {field} {value:?}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },

    /// Spec is well-formed but violates a provider rule
    #[error("Invalid provider spec: {0}")]
    InvalidSpec(String),

    /// `spec.providerID` is set but cannot be parsed
    #[error("Invalid provider ID: {0}")]
    InvalidProviderId(#[from] ProviderIdError),

    /// Credentials secret or one of its fields is missing
    #[error("Credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// BMM API error
    #[error("BMM error: {0}")]
    Remote(#[from] BmmError),

    /// Delete answered with neither 204 nor 404
    #[error("delete instance returned unexpected status: {0}")]
    UnexpectedDeleteStatus(u16),

    /// Create succeeded without an instance payload
    #[error("create instance returned no data")]
    EmptyCreateResponse,

    /// Get succeeded without an instance payload
    #[error("get instance {0} returned no data")]
    EmptyGetResponse(String),

    /// Update requires a recorded instance ID
    #[error("instance ID not set in provider status of Machine {0}")]
    InstanceNotProvisioned(String),

    /// Machine store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur in the Machine Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Actuator operation failed
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Machine store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Provider document error while deriving the lifecycle phase
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Machine event without namespace
    #[error("Machine has no namespace: {0}")]
    MissingNamespace(String),

    /// HTTP server failed to bind or serve
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
