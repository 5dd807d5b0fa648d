//! Common utilities for the BMM API client
//!
//! Provides the authenticated HTTP wrapper shared by the instance operations.

pub mod query;

use crate::error::BmmError;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client wrapper with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Make a GET request. 404 maps to `NotFound`, an empty body to `None`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BmmError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(BmmError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }
        let response = check_status("GET", path, response).await?;

        if status != StatusCode::OK {
            debug!("GET {} returned {}, no payload expected", path, status);
            return Ok(None);
        }
        decode_optional(response).await
    }

    /// Make a POST request. Only `expected` carries a payload; other 2xx
    /// statuses yield `None`.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<Option<T>, BmmError> {
        let url = self.build_url(path);
        debug!(
            "POST {} with body: {}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response = check_status("POST", path, response).await?;

        if status != expected {
            debug!("POST {} returned {}, expected {}", path, status, expected);
            return Ok(None);
        }
        decode_optional(response).await
    }

    /// Make a DELETE request and return the raw status code. Callers decide
    /// which codes count as success.
    pub async fn delete<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<StatusCode, BmmError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let text = response.text().await.unwrap_or_default();
            debug!("DELETE {} failed: {} - {}", path, status, text);
        }
        Ok(status)
    }
}

async fn check_status(method: &str, path: &str, response: Response) -> Result<Response, BmmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BmmError::Authentication(format!(
            "{} {} rejected: {} - {}",
            method, path, status, body
        )));
    }
    Err(BmmError::Api(format!(
        "{} {} failed: {} - {}",
        method, path, status, body
    )))
}

async fn decode_optional<T: DeserializeOwned>(response: Response) -> Result<Option<T>, BmmError> {
    let text = response.text().await?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some).map_err(|e| {
        BmmError::Api(format!(
            "error decoding response body: {} - Response (first 500 chars): {}",
            e,
            trimmed.chars().take(500).collect::<String>()
        ))
    })
}
