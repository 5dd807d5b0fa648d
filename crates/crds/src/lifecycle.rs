//! Machine lifecycle markers
//!
//! The finalizer guarantees the remote instance is released before a Machine
//! disappears. The lifecycle annotation records where the Machine is in that
//! protocol so operators can read it without inspecting finalizers.

use std::fmt;
use std::str::FromStr;

use kube::api::ObjectMeta;

/// Finalizer held on every Machine managed by this provider
pub const MACHINE_FINALIZER: &str = "machine.openshift.io/nvidia-bmm";

/// Annotation carrying the lifecycle tag
pub const LIFECYCLE_ANNOTATION: &str = "machine.nvidia-bmm.nvidia.com/lifecycle";

/// Value of the lifecycle annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTag {
    /// Finalizer attached, instance managed
    Active,
    /// Deletion requested, remote instance not yet released
    DeletingPendingCleanup,
    /// Remote instance released, finalizer removed
    Removed,
}

impl LifecycleTag {
    /// Annotation value
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleTag::Active => "active",
            LifecycleTag::DeletingPendingCleanup => "deleting-pending-cleanup",
            LifecycleTag::Removed => "removed",
        }
    }
}

impl fmt::Display for LifecycleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LifecycleTag::Active),
            "deleting-pending-cleanup" => Ok(LifecycleTag::DeletingPendingCleanup),
            "removed" => Ok(LifecycleTag::Removed),
            other => Err(format!("unknown lifecycle tag: {other}")),
        }
    }
}

/// True if the Machine carries the provider finalizer
pub fn has_finalizer(meta: &ObjectMeta) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == MACHINE_FINALIZER))
}

/// True once a deletion timestamp has been set
pub fn is_deleting(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}

/// Lifecycle tag from the annotation. Unknown values read as absent.
pub fn lifecycle_tag(meta: &ObjectMeta) -> Option<LifecycleTag> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(LIFECYCLE_ANNOTATION))
        .and_then(|v| v.parse().ok())
}
