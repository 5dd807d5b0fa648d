//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";
const DEFAULT_REQUEUE_AFTER_SECONDS: u64 = 30;
const DEFAULT_CREATE_REQUEUE_SECONDS: u64 = 10;

/// Runtime configuration of the Machine Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when `None`
    pub namespace: Option<String>,
    pub metrics_bind_address: SocketAddr,
    pub health_probe_bind_address: SocketAddr,
    /// Steady-state and error requeue interval
    pub requeue_after: Duration,
    /// Requeue interval right after an instance was created
    pub create_requeue_after: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            metrics_bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            health_probe_bind_address: SocketAddr::from(([0, 0, 0, 0], 8081)),
            requeue_after: Duration::from_secs(DEFAULT_REQUEUE_AFTER_SECONDS),
            create_requeue_after: Duration::from_secs(DEFAULT_CREATE_REQUEUE_SECONDS),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let metrics_bind_address = parse_bind_address(
            "METRICS_BIND_ADDRESS",
            lookup("METRICS_BIND_ADDRESS").as_deref(),
            DEFAULT_METRICS_BIND_ADDRESS,
        )?;
        let health_probe_bind_address = parse_bind_address(
            "HEALTH_PROBE_BIND_ADDRESS",
            lookup("HEALTH_PROBE_BIND_ADDRESS").as_deref(),
            DEFAULT_HEALTH_PROBE_BIND_ADDRESS,
        )?;

        let requeue_after = parse_seconds(
            "REQUEUE_AFTER_SECONDS",
            lookup("REQUEUE_AFTER_SECONDS").as_deref(),
            DEFAULT_REQUEUE_AFTER_SECONDS,
        )?;
        let create_requeue_after = parse_seconds(
            "CREATE_REQUEUE_SECONDS",
            lookup("CREATE_REQUEUE_SECONDS").as_deref(),
            DEFAULT_CREATE_REQUEUE_SECONDS,
        )?;

        Ok(Self {
            namespace,
            metrics_bind_address,
            health_probe_bind_address,
            requeue_after,
            create_requeue_after,
        })
    }
}

/// Accepts `host:port` or the bare `:port` form, which binds all interfaces.
fn parse_bind_address(
    key: &str,
    value: Option<&str>,
    default: &str,
) -> Result<SocketAddr, ControllerError> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    let normalized = if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    };
    normalized.parse().map_err(|e| {
        ControllerError::InvalidConfig(format!("{} must be host:port, got {:?}: {}", key, raw, e))
    })
}

fn parse_seconds(key: &str, value: Option<&str>, default: u64) -> Result<Duration, ControllerError> {
    let secs = match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => raw.parse::<u64>().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} must be a number of seconds, got {:?}: {}", key, raw, e))
        })?,
    };
    if secs == 0 {
        return Err(ControllerError::InvalidConfig(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}
