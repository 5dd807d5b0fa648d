//! Print the JSON schemas of the provider spec and status as YAML documents.
//!
//! Usage: `cargo run -p crds --bin schemagen > provider-schemas.yaml`

use crds::{BmmMachineProviderSpec, BmmMachineProviderStatus};

fn main() -> Result<(), serde_yaml::Error> {
    let spec = schemars::schema_for!(BmmMachineProviderSpec);
    let status = schemars::schema_for!(BmmMachineProviderStatus);

    println!("{}", serde_yaml::to_string(&spec)?);
    println!("---");
    println!("{}", serde_yaml::to_string(&status)?);
    Ok(())
}
