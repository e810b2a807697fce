//! HTTP API client for the compliance ledger server

use std::time::Duration;

use cledger_common::types::ActionFilter;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Overridden by `--timeout-secs` or CLEDGER_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default server URL when neither `--server-url` nor CLEDGER_SERVER_URL is set.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// API client for the compliance ledger server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = endpoints::health_url(&self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = Self::check(response, None).await?;
        Ok(response.json().await?)
    }

    /// Record a compliance action
    pub async fn record(&self, request: &RecordActionRequest) -> Result<RecordedAction> {
        let url = endpoints::actions_url(&self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        Self::data(response, None).await
    }

    /// List actions matching `filter`
    pub async fn list(&self, filter: &ActionFilter) -> Result<ActionList> {
        let url = endpoints::actions_url(&self.base_url);
        let response = self.client.get(&url).query(filter).send().await?;
        Self::data(response, None).await
    }

    pub async fn get(&self, id: Uuid) -> Result<FetchedAction> {
        let url = endpoints::action_url(&self.base_url, id);
        let response = self.client.get(&url).send().await?;
        Self::data(response, Some(id)).await
    }

    /// Repair the index from the ledger
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let url = endpoints::reconcile_url(&self.base_url);
        let response = self.client.post(&url).send().await?;
        Self::data(response, None).await
    }

    pub async fn stats(&self) -> Result<ComplianceStats> {
        let url = endpoints::stats_url(&self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::data(response, None).await
    }

    async fn data<T: DeserializeOwned>(response: Response, id: Option<Uuid>) -> Result<T> {
        let response = Self::check(response, id).await?;
        let envelope: ApiResponse<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Turn non-2xx responses into typed errors
    async fn check(response: Response, id: Option<Uuid>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (status.as_str().to_string(), body),
        };

        tracing::debug!(status = %status, code = %code, "Server returned an error");

        Err(match status {
            StatusCode::NOT_FOUND => match id {
                Some(id) => CliError::NotFound(id.to_string()),
                None => CliError::api(code, message),
            },
            StatusCode::BAD_REQUEST => CliError::Validation(message),
            _ => CliError::api(code, message),
        })
    }
}
