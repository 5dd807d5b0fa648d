//! OpenShift Machine resource
//!
//! Machines are owned by the Machine API and are not defined here; the
//! controller works with them as `DynamicObject`s through this `ApiResource`.

use kube::core::{ApiResource, GroupVersionKind};

/// API group of OpenShift Machines
pub const MACHINE_GROUP: &str = "machine.openshift.io";
/// Served Machine API version
pub const MACHINE_VERSION: &str = "v1beta1";
/// Machine kind
pub const MACHINE_KIND: &str = "Machine";

/// `ApiResource` for `machine.openshift.io/v1beta1` Machines
pub fn machine_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        MACHINE_GROUP,
        MACHINE_VERSION,
        MACHINE_KIND,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_api_resource() {
        let ar = machine_api_resource();
        assert_eq!(ar.group, "machine.openshift.io");
        assert_eq!(ar.version, "v1beta1");
        assert_eq!(ar.api_version, "machine.openshift.io/v1beta1");
        assert_eq!(ar.kind, "Machine");
        assert_eq!(ar.plural, "machines");
    }
}
