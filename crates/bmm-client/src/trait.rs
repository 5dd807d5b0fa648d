//! BmmClient trait for mocking
//!
//! This trait abstracts the BmmClient so the controller can be driven by a
//! mock in unit tests. The concrete BmmClient implements this trait.

use crate::error::BmmError;
use crate::models::*;
use uuid::Uuid;

/// Trait for BMM instance operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait BmmClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Create an instance. `None` when the API answered without an instance payload.
    async fn create_instance(
        &self,
        org: &str,
        request: &CreateInstanceRequest,
    ) -> Result<Option<Instance>, BmmError>;

    /// Get an instance. A missing instance is `BmmError::NotFound`.
    async fn get_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        params: &GetInstanceParams,
    ) -> Result<Option<Instance>, BmmError>;

    /// Delete an instance. Only transport failures are errors; the status code
    /// is returned for the caller to judge.
    async fn delete_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        request: &InstanceDeleteRequest,
    ) -> Result<DeleteInstanceStatus, BmmError>;
}
