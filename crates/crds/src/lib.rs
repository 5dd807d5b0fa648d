//! NVIDIA BMM Machine provider types
//!
//! Provider spec/status carried inside OpenShift Machines, the codec that reads
//! and writes them, and the provider ID format linking a Machine to its BMM
//! instance.

pub mod document;
pub mod error;
pub mod lifecycle;
pub mod machine;
pub mod provider_id;
pub mod provider_spec;
pub mod provider_status;

pub use error::{DocumentError, ProviderIdError};
pub use lifecycle::*;
pub use machine::*;
pub use provider_id::*;
pub use provider_spec::*;
pub use provider_status::*;
