//! BMM API client
//!
//! Implements the instance endpoints of the NVIDIA Bare Metal Manager REST API:
//! `/v2/org/{org}/carbide/instance` and `/v2/org/{org}/carbide/instance/{id}`.

use crate::bmm_trait::BmmClientTrait;
use crate::common::HttpClient;
use crate::common::query::{instance_path, instances_path, with_query};
use crate::error::BmmError;
use crate::models::*;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// BMM API client
#[derive(Debug, Clone)]
pub struct BmmClient {
    http: HttpClient,
}

impl BmmClient {
    /// Create a new BMM client
    ///
    /// # Arguments
    /// * `endpoint` - BMM API endpoint (e.g., "https://api.nvidia-bmm.example")
    /// * `token` - Bearer token for authentication
    pub fn new(endpoint: String, token: String) -> Result<Self, BmmError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(BmmError::InvalidRequest(format!(
                "endpoint must be an http(s) URL: {}",
                endpoint
            )));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http: HttpClient::new(client, endpoint, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Create an instance
    pub async fn create_instance(
        &self,
        org: &str,
        request: &CreateInstanceRequest,
    ) -> Result<Option<Instance>, BmmError> {
        debug!("Creating BMM instance {} in org {}", request.name, org);
        self.http
            .post(&instances_path(org), request, StatusCode::CREATED)
            .await
    }

    /// Get an instance by ID
    pub async fn get_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        params: &GetInstanceParams,
    ) -> Result<Option<Instance>, BmmError> {
        let path = with_query(instance_path(org, instance_id), &params.query_pairs());
        self.http.get(&path).await
    }

    /// Delete an instance by ID
    pub async fn delete_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        request: &InstanceDeleteRequest,
    ) -> Result<DeleteInstanceStatus, BmmError> {
        let status = self
            .http
            .delete(&instance_path(org, instance_id), request)
            .await?;
        debug!("Delete instance {} returned {}", instance_id, status);
        Ok(DeleteInstanceStatus::from_status_code(status.as_u16()))
    }
}

#[async_trait::async_trait]
impl BmmClientTrait for BmmClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn create_instance(
        &self,
        org: &str,
        request: &CreateInstanceRequest,
    ) -> Result<Option<Instance>, BmmError> {
        self.create_instance(org, request).await
    }

    async fn get_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        params: &GetInstanceParams,
    ) -> Result<Option<Instance>, BmmError> {
        self.get_instance(org, instance_id, params).await
    }

    async fn delete_instance(
        &self,
        org: &str,
        instance_id: Uuid,
        request: &InstanceDeleteRequest,
    ) -> Result<DeleteInstanceStatus, BmmError> {
        self.delete_instance(org, instance_id, request).await
    }
}
