//! Enforcement Trigger
//!
//! After an action is recorded the trigger hands the final record to one
//! [`Enforcer`]. Whatever happens inside the enforcer, [`EnforcementTrigger::fire`]
//! reports a [`StepOutcome`] and never fails the recording.
//!
//! The enforcer is chosen by `ENFORCEMENT_MODE`:
//!
//! - `log`: structured notification only
//! - `webhook`: POST the record to an external endpoint
//! - `ansible`: run the playbook mapped to the action code

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cledger_common::types::{ComplianceAction, StepOutcome};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{EnforcementConfig, EnforcementMode};

pub mod ansible;
pub mod webhook;

pub use ansible::AnsibleEnforcer;
pub use webhook::WebhookEnforcer;

#[derive(Debug, Error)]
pub enum EnforcementError {
    #[error("Enforcement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Enforcement endpoint rejected the action with status {status}")]
    Rejected { status: u16 },

    #[error("Enforcement HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Playbook {playbook} exited with {code:?}: {stderr}")]
    PlaybookFailed {
        playbook: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Enforcement IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Enforcement serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Enforcement misconfigured: {0}")]
    Config(String),
}

/// What an enforcer did with an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementReport {
    Executed { detail: String },
    Skipped { reason: String },
}

#[async_trait]
pub trait Enforcer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enforce(
        &self,
        action: &ComplianceAction,
    ) -> Result<EnforcementReport, EnforcementError>;
}

/// Notification-only enforcer
#[derive(Debug, Default, Clone)]
pub struct LogEnforcer;

#[async_trait]
impl Enforcer for LogEnforcer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn enforce(
        &self,
        action: &ComplianceAction,
    ) -> Result<EnforcementReport, EnforcementError> {
        info!(
            action_id = %action.id,
            policy_id = %action.policy_id,
            action_taken = %action.action_taken,
            status = %action.status,
            severity = %action.severity,
            endpoints = action.target_endpoints.len(),
            "Compliance action ready for enforcement"
        );
        Ok(EnforcementReport::Executed {
            detail: "logged".to_string(),
        })
    }
}

/// Bounded, infallible wrapper around the configured enforcer
#[derive(Clone)]
pub struct EnforcementTrigger {
    enforcer: Arc<dyn Enforcer>,
    timeout: Duration,
}

impl EnforcementTrigger {
    pub fn new(enforcer: Arc<dyn Enforcer>, timeout: Duration) -> Self {
        Self { enforcer, timeout }
    }

    pub fn from_config(config: &EnforcementConfig) -> Result<Self, EnforcementError> {
        let enforcer: Arc<dyn Enforcer> = match config.mode {
            EnforcementMode::Log => Arc::new(LogEnforcer),
            EnforcementMode::Webhook => {
                let url = config.webhook_url.clone().ok_or_else(|| {
                    EnforcementError::Config("webhook mode requires a webhook URL".to_string())
                })?;
                Arc::new(WebhookEnforcer::new(url, config.timeout())?)
            },
            EnforcementMode::Ansible => Arc::new(AnsibleEnforcer::new(&config.ansible_path)),
        };

        info!(enforcer = enforcer.name(), "Enforcement trigger configured");
        Ok(Self::new(enforcer, config.timeout()))
    }

    pub fn enforcer_name(&self) -> &'static str {
        self.enforcer.name()
    }

    /// Run the enforcer against the final record
    #[tracing::instrument(skip(self, action), fields(action_id = %action.id, enforcer = self.enforcer.name()))]
    pub async fn fire(&self, action: &ComplianceAction) -> StepOutcome {
        let result = match tokio::time::timeout(self.timeout, self.enforcer.enforce(action)).await
        {
            Ok(result) => result,
            Err(_) => Err(EnforcementError::Timeout(self.timeout)),
        };

        match result {
            Ok(EnforcementReport::Executed { detail }) => {
                info!(detail = %detail, "Enforcement executed");
                StepOutcome::Applied
            },
            Ok(EnforcementReport::Skipped { reason }) => {
                info!(reason = %reason, "Enforcement skipped");
                StepOutcome::skipped(reason)
            },
            Err(e) => {
                warn!(error = %e, "Enforcement failed");
                StepOutcome::failed(e)
            },
        }
    }
}

impl std::fmt::Debug for EnforcementTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementTrigger")
            .field("enforcer", &self.enforcer.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
