//! Record compliance action command
//!
//! Records one enforcement decision. The ledger write decides the final
//! status; the index mirror and the enforcement hook are best-effort and
//! report their outcome instead of failing the call.
//!
//! # Steps
//!
//! 1. Validate and build a `PENDING` record with a fresh id
//! 2. Write it to the ledger under its id (`EXECUTED` on success, `FAILED` otherwise)
//! 3. Mirror the final record into the index
//! 4. Hand the final record to the enforcement trigger

use cledger_common::types::{
    ActionStatus, ComplianceAction, ConfidencePolicy, RecordOutcome, Severity, StepOutcome,
    WriteHealth,
};
use cledger_common::CommonError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::features::shared::{
    validate_endpoints, validate_optional_text, validate_required_text, with_deadline,
    FieldValidationError,
};
use crate::features::ComplianceContext;
use crate::index::IndexError;
use crate::ledger::{LedgerEntry, LedgerError, LedgerMode, LedgerResult};

/// Event published after a successful ledger write
pub const RECORDED_EVENT: &str = "ComplianceActionRecorded";

const MAX_POLICY_ID_LENGTH: usize = 128;
const MAX_ACTION_LENGTH: usize = 128;
const MAX_DESCRIPTION_LENGTH: usize = 4096;
const MAX_ENDPOINT_LENGTH: usize = 255;

/// Command to record a compliance action
///
/// # Examples
///
/// ```rust,ignore
/// use cledger_server::features::compliance_actions::RecordActionCommand;
///
/// let command = RecordActionCommand {
///     policy_id: "POL-003".to_string(),
///     action_taken: "BLOCK_RDP_PORT".to_string(),
///     threat_description: Some("RDP brute force from 10.0.0.9".to_string()),
///     confidence: Some(0.92),
///     severity: Some("critical".to_string()),
///     target_endpoints: Some(vec!["srv-01".to_string()]),
/// };
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActionCommand {
    #[serde(default)]
    pub policy_id: String,

    /// Action code such as `BLOCK_RDP_PORT`
    #[serde(default)]
    pub action_taken: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_description: Option<String>,

    /// Numbers and numeric strings are accepted; anything else counts as malformed
    #[serde(
        default,
        deserialize_with = "lenient_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_endpoints: Option<Vec<String>>,
}

/// Response from recording an action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActionResponse {
    #[serde(flatten)]
    pub outcome: RecordOutcome,
    pub health: WriteHealth,
    pub ledger_mode: LedgerMode,
}

/// Errors that can occur when recording an action
///
/// Backend failures are not errors here: they are reported in the outcome.
#[derive(Debug, thiserror::Error)]
pub enum RecordActionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Record lifecycle error: {0}")]
    Lifecycle(CommonError),
}

impl From<FieldValidationError> for RecordActionError {
    fn from(err: FieldValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CommonError> for RecordActionError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Validation(_)
            | CommonError::ConfidenceOutOfRange(_)
            | CommonError::UnknownValue { .. } => Self::Validation(err.to_string()),
            other => Self::Lifecycle(other),
        }
    }
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(s)) => Some(s.trim().parse().unwrap_or(f64::NAN)),
        Some(_) => Some(f64::NAN),
    })
}

impl RecordActionCommand {
    /// Validate the command and build the `PENDING` record
    ///
    /// # Errors
    ///
    /// - `policyId` / `actionTaken` empty after trimming or longer than 128 characters
    /// - `threatDescription` longer than 4096 characters
    /// - blank endpoint names
    /// - unknown severity
    /// - confidence rejected by the configured policy
    pub fn validate(
        &self,
        policy: ConfidencePolicy,
    ) -> Result<ComplianceAction, RecordActionError> {
        let policy_id = validate_required_text(&self.policy_id, "policyId", MAX_POLICY_ID_LENGTH)?;
        let action_taken =
            validate_required_text(&self.action_taken, "actionTaken", MAX_ACTION_LENGTH)?;
        let threat_description = validate_optional_text(
            self.threat_description.as_deref(),
            "threatDescription",
            MAX_DESCRIPTION_LENGTH,
        )?;
        let endpoints = validate_endpoints(
            self.target_endpoints.as_deref().unwrap_or_default(),
            MAX_ENDPOINT_LENGTH,
        )?;
        let severity = match self.severity.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse::<Severity>()?,
            _ => Severity::default(),
        };
        let confidence = policy.apply(self.confidence)?;

        Ok(ComplianceAction::new(policy_id, action_taken, confidence)
            .with_threat_description(threat_description)
            .with_severity(severity)
            .with_target_endpoints(endpoints))
    }
}

/// Handler for recording compliance actions
///
/// Returns an error only for invalid input. Ledger, index and enforcement
/// failures end up in the returned outcome.
#[tracing::instrument(
    skip(ctx, command),
    fields(policy_id = %command.policy_id, action_taken = %command.action_taken)
)]
pub async fn handle(
    ctx: ComplianceContext,
    command: RecordActionCommand,
) -> Result<RecordActionResponse, RecordActionError> {
    let mut action = command.validate(ctx.settings.confidence_policy)?;
    let ledger_mode = ctx.ledger.mode();

    info!(action_id = %action.id, ledger_mode = %ledger_mode, "Recording compliance action");

    let ledger = write_to_ledger(&ctx, &mut action).await?;
    let index = mirror_to_index(&ctx, &action).await;
    let enforcement = ctx.enforcement.fire(&action).await;

    let outcome = RecordOutcome {
        action,
        ledger,
        index,
        enforcement,
    };
    let health = outcome.health();

    info!(
        action_id = %outcome.action.id,
        status = %outcome.action.status,
        health = ?health,
        "Compliance action recorded"
    );

    Ok(RecordActionResponse {
        outcome,
        health,
        ledger_mode,
    })
}

/// Commit the record and settle its status
///
/// A timed-out or dropped write may still have committed, so the status is
/// settled by reading the key back before falling to `FAILED`.
async fn write_to_ledger(
    ctx: &ComplianceContext,
    action: &mut ComplianceAction,
) -> Result<StepOutcome, RecordActionError> {
    // The stored value is the record as it stands once the write commits.
    let mut committed = action.clone();
    committed.transition(ActionStatus::Executed)?;
    let value = committed.to_ledger_bytes()?;
    let key = action.id.to_string();

    let result: LedgerResult<_> =
        with_deadline(ctx.settings.ledger_timeout, ctx.ledger.put(&key, value)).await;

    let settled = match result {
        Ok(receipt) => Ok(Some(receipt.proof)),
        Err(e @ (LedgerError::Timeout | LedgerError::Unavailable(_))) => {
            confirm_write(ctx, &key, e).await
        },
        Err(e) => Err(e),
    };

    match settled {
        Ok(proof) => {
            action.transition(ActionStatus::Executed)?;
            action.ledger_proof = proof;

            let payload = action.to_ledger_bytes()?;
            if tokio::time::timeout(
                ctx.settings.ledger_timeout,
                ctx.ledger.emit(RECORDED_EVENT, payload),
            )
            .await
            .is_err()
            {
                warn!(action_id = %action.id, "Ledger event emission timed out");
            }

            Ok(StepOutcome::Applied)
        },
        Err(e) => {
            warn!(action_id = %action.id, error = %e, "Ledger write failed, marking action FAILED");
            action.transition(ActionStatus::Failed)?;
            Ok(StepOutcome::failed(e))
        },
    }
}

/// Look for the entry of a write whose acknowledgement never arrived
///
/// Returns the committed entry's proof, or `write_error` when the key is
/// absent or the lookup itself fails.
async fn confirm_write(
    ctx: &ComplianceContext,
    key: &str,
    write_error: LedgerError,
) -> LedgerResult<Option<String>> {
    let lookup: LedgerResult<Option<LedgerEntry>> =
        with_deadline(ctx.settings.ledger_timeout, ctx.ledger.get(key)).await;

    match lookup {
        Ok(Some(entry)) => {
            info!(key, error = %write_error, "Ledger write committed despite a lost acknowledgement");
            Ok(entry.proof)
        },
        Ok(None) => Err(write_error),
        Err(e) => {
            warn!(key, error = %e, "Could not confirm ledger write");
            Err(write_error)
        },
    }
}

async fn mirror_to_index(ctx: &ComplianceContext, action: &ComplianceAction) -> StepOutcome {
    let result: Result<(), IndexError> =
        with_deadline(ctx.settings.index_timeout, ctx.index.upsert(action)).await;

    match result {
        Ok(()) => StepOutcome::Applied,
        Err(e) => {
            warn!(action_id = %action.id, error = %e, "Index mirror failed");
            StepOutcome::failed(e)
        },
    }
}
