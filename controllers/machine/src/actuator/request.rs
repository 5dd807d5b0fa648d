//! Create-instance request built from a provider spec.
//!
//! Every identifier is parsed here so a malformed spec fails before any
//! remote call is made.

use crate::error::ActuatorError;
use bmm_client::{CreateInstanceRequest, InterfaceCreateRequest};
use crds::BmmMachineProviderSpec;
use uuid::Uuid;

pub(crate) fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ActuatorError> {
    Uuid::parse_str(value).map_err(|source| ActuatorError::InvalidIdentifier {
        field,
        value: value.to_string(),
        source,
    })
}

/// Reject specs naming both an instance type and a specific machine.
pub fn validate_spec(spec: &BmmMachineProviderSpec) -> Result<(), ActuatorError> {
    if let (Some(instance_type), Some(machine)) = (spec.instance_type_id(), spec.machine_id()) {
        return Err(ActuatorError::InvalidSpec(format!(
            "instanceTypeId ({}) and machineId ({}) are mutually exclusive",
            instance_type, machine
        )));
    }
    Ok(())
}

/// Build the create request for a Machine named `name`.
pub fn build_instance_request(
    name: &str,
    spec: &BmmMachineProviderSpec,
) -> Result<CreateInstanceRequest, ActuatorError> {
    let mut interfaces = vec![InterfaceCreateRequest {
        subnet_id: parse_uuid("subnet ID", &spec.subnet_id)?,
        is_physical: false,
    }];
    for additional in &spec.additional_subnet_ids {
        interfaces.push(InterfaceCreateRequest {
            subnet_id: parse_uuid("additional subnet ID", &additional.subnet_id)?,
            is_physical: additional.is_physical,
        });
    }

    let tenant_id = parse_uuid("tenant ID", &spec.tenant_id)?;
    let vpc_id = parse_uuid("VPC ID", &spec.vpc_id)?;

    let instance_type_id = spec
        .instance_type_id()
        .map(|id| parse_uuid("instance type ID", id))
        .transpose()?;

    let ssh_key_group_ids = if spec.ssh_key_group_ids.is_empty() {
        None
    } else {
        Some(
            spec.ssh_key_group_ids
                .iter()
                .map(|id| parse_uuid("SSH key group ID", id))
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    Ok(CreateInstanceRequest {
        name: name.to_string(),
        tenant_id,
        vpc_id,
        interfaces,
        instance_type_id,
        machine_id: spec.machine_id().map(str::to_string),
        allow_unhealthy_machine: spec.allow_unhealthy_machine.filter(|allow| *allow),
        user_data: spec.user_data().map(str::to_string),
        ssh_key_group_ids,
        labels: (!spec.labels.is_empty()).then(|| spec.labels.clone()),
        phone_home_enabled: Some(true),
    })
}
