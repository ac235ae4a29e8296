//! Managed database control-plane REST client
//!
//! Thin JSON client with bearer token authentication. Mutating calls return
//! a long-running operation which is wrapped into a [`RemoteOperation`].

use crate::error::{MdbError, Result};
use crate::operation::{OperationState, RemoteOperation};
use crate::wire;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Page size used by every list call
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// gRPC `FAILED_PRECONDITION`, used for "operation already running"
const CODE_FAILED_PRECONDITION: i32 = 9;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the managed database API
    pub endpoint: String,
    /// Base URL of the operation service
    pub operation_endpoint: String,
    pub token: String,
    /// Delay between two operation status polls
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Create ClientConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("NIMBUS_ENDPOINT")
            .map_err(|_| MdbError::MissingEnvVar("NIMBUS_ENDPOINT".to_string()))?;
        let token = std::env::var("NIMBUS_TOKEN")
            .map_err(|_| MdbError::MissingEnvVar("NIMBUS_TOKEN".to_string()))?;
        let operation_endpoint =
            std::env::var("NIMBUS_OPERATION_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        Ok(Self {
            endpoint,
            operation_endpoint,
            token,
            poll_interval: Duration::from_secs(1),
        })
    }
}

/// Error body returned by the gateway
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Managed database API client
#[derive(Debug, Clone)]
pub struct MdbClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MdbClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    pub(crate) fn operation_url(&self, id: &str) -> String {
        format!(
            "{}/operations/{}",
            self.config.operation_endpoint.trim_end_matches('/'),
            id
        )
    }

    /// GET a resource, keys normalised to snake_case
    pub async fn get(&self, path: &str) -> Result<Value> {
        let value = self.get_url(&self.url(path)).await?;
        Ok(wire::snake_keys(value))
    }

    pub(crate) async fn get_url(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        read_response(response).await
    }

    /// Read every page of a list endpoint
    pub async fn list_all(&self, path: &str, items_field: &str) -> Result<Vec<Value>> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page_token = String::new();

        loop {
            let page_size = DEFAULT_PAGE_SIZE.to_string();
            let mut query = vec![("pageSize", page_size.as_str())];
            if !page_token.is_empty() {
                query.push(("pageToken", page_token.as_str()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.config.token)
                .query(&query)
                .send()
                .await?;
            let mut page = read_response(response).await?;

            let next = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            items.extend(wire::take_items(&mut page, items_field).into_iter().map(wire::snake_keys));

            if next.is_empty() {
                break;
            }
            tracing::debug!("Fetching next page of {}", path);
            page_token = next;
        }

        Ok(items)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<RemoteOperation> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.token)
            .json(body)
            .send()
            .await?;
        self.operation(response).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<RemoteOperation> {
        let response = self
            .http
            .patch(self.url(path))
            .bearer_auth(&self.config.token)
            .json(body)
            .send()
            .await?;
        self.operation(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<RemoteOperation> {
        let response = self
            .http
            .delete(self.url(path))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        self.operation(response).await
    }

    async fn operation(&self, response: reqwest::Response) -> Result<RemoteOperation> {
        let body = read_response(response).await?;
        let state: OperationState = serde_json::from_value(body)?;
        if state.id.is_empty() {
            return Err(MdbError::InvalidResponse(
                "operation without id".to_string(),
            ));
        }
        tracing::debug!("Started operation {} ({})", state.id, state.description);
        Ok(RemoteOperation::new(self.clone(), state))
    }
}

/// Map HTTP status and error body onto [`MdbError`]
async fn read_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&text)?);
    }

    let api_status: ApiStatus = serde_json::from_str(&text).unwrap_or_default();
    let message = if api_status.message.is_empty() {
        text
    } else {
        api_status.message
    };
    Err(classify(status.as_u16(), api_status.code, message))
}

pub(crate) fn classify(status: u16, code: i32, message: String) -> MdbError {
    if status == 404 {
        return MdbError::NotFound(message);
    }
    let conflicting = code == CODE_FAILED_PRECONDITION
        && message.to_lowercase().contains("conflicting operation");
    if status == 409 || conflicting {
        return MdbError::Conflict(message);
    }
    MdbError::Api { status, message }
}
