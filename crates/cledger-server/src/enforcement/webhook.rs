//! Webhook enforcer: POST the final record to an external endpoint

use std::time::Duration;

use async_trait::async_trait;
use cledger_common::types::ComplianceAction;
use tracing::debug;

use super::{EnforcementError, EnforcementReport, Enforcer};

pub struct WebhookEnforcer {
    client: reqwest::Client,
    url: String,
}

impl WebhookEnforcer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EnforcementError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Enforcer for WebhookEnforcer {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn enforce(
        &self,
        action: &ComplianceAction,
    ) -> Result<EnforcementReport, EnforcementError> {
        let response = self.client.post(&self.url).json(action).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(EnforcementError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(url = %self.url, status = status.as_u16(), "Webhook accepted action");
        Ok(EnforcementReport::Executed {
            detail: format!("webhook responded {}", status.as_u16()),
        })
    }
}
