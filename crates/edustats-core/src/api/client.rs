//! API client for the platform's read-only statistics endpoints.

use std::time::Duration;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::ApiError;
use crate::session::{Resource, Role, SessionContext};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client carrying the session's credentials, sharing the connection pool.
    pub fn with_context(&self, context: &SessionContext) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: context.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// One GET, no retries. A failed request is reported to the caller as-is.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = Self::check_response(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(url = %url, error = %e, "Response body is not valid JSON");
            ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e))
        })
    }

    /// Fetch the raw JSON behind a cacheable resource.
    pub async fn fetch_resource(&self, resource: Resource) -> Result<Value, ApiError> {
        debug!(key = resource.key, path = resource.path, "Fetching resource");
        self.get(resource.path).await
    }

    /// Fetch the statistics aggregate shown on a role's dashboard.
    pub async fn fetch_statistics(&self, role: Role) -> Result<Value, ApiError> {
        self.fetch_resource(role.resource()).await
    }
}
