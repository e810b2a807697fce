//! Compliance action domain types
//!
//! A [`ComplianceAction`] is the canonical audit record of one enforcement
//! decision. It is owned by the ledger; the relational index only holds a
//! derivative copy.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CommonError, Result};

mod filter;
mod outcome;

pub use filter::{ActionCriteria, ActionFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use outcome::{RecordOutcome, StepOutcome, WriteHealth};

// ============================================================================
// Status lifecycle
// ============================================================================

/// Lifecycle status of a compliance action
///
/// The only legal transitions are `PENDING -> EXECUTED` and
/// `PENDING -> FAILED`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    Executed,
    Failed,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 3] =
        [ActionStatus::Pending, ActionStatus::Executed, ActionStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Executed => "EXECUTED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executed) | (Self::Pending, Self::Failed)
        )
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "EXECUTED" => Ok(Self::Executed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(CommonError::UnknownValue {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity attached to an action, used for index filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(CommonError::UnknownValue {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Confidence policy
// ============================================================================

/// How out-of-range or malformed confidence values are handled at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidencePolicy {
    /// Absent or non-finite becomes 0, finite values are clamped into [0, 1]
    #[default]
    Clamp,
    /// Absent becomes 0, anything outside [0, 1] is a validation error
    Reject,
}

impl ConfidencePolicy {
    /// Resolve a requested confidence into a stored value in `[0, 1]`
    pub fn apply(&self, requested: Option<f64>) -> Result<f64> {
        let Some(value) = requested else {
            return Ok(0.0);
        };

        match self {
            Self::Clamp if !value.is_finite() => Ok(0.0),
            Self::Clamp => Ok(value.clamp(0.0, 1.0)),
            Self::Reject if value.is_finite() && (0.0..=1.0).contains(&value) => Ok(value),
            Self::Reject => Err(CommonError::ConfidenceOutOfRange(value)),
        }
    }
}

impl FromStr for ConfidencePolicy {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            _ => Err(CommonError::UnknownValue {
                kind: "confidence policy",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// ComplianceAction
// ============================================================================

/// Canonical record of one enforcement decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceAction {
    pub id: Uuid,
    pub policy_id: String,
    pub action_taken: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_description: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub target_endpoints: BTreeSet<String>,
    pub status: ActionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_proof: Option<String>,
}

impl ComplianceAction {
    /// Create a fresh `PENDING` action with a newly generated id
    pub fn new(
        policy_id: impl Into<String>,
        action_taken: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id: policy_id.into(),
            action_taken: action_taken.into(),
            threat_description: None,
            confidence,
            severity: Severity::default(),
            target_endpoints: BTreeSet::new(),
            status: ActionStatus::Pending,
            // Relational backends keep microseconds; match them so copies compare equal.
            timestamp: Utc::now().trunc_subsecs(6),
            ledger_proof: None,
        }
    }

    pub fn with_threat_description(mut self, description: Option<String>) -> Self {
        self.threat_description = description;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_target_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Move the action to `next`, refusing anything but `PENDING -> terminal`
    pub fn transition(&mut self, next: ActionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CommonError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Serialize into the byte form stored in the ledger and carried by events
    pub fn to_ledger_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a ledger value, attaching the proof recorded alongside it
    pub fn from_ledger_bytes(bytes: &[u8], proof: Option<String>) -> Result<Self> {
        let mut action: ComplianceAction = serde_json::from_slice(bytes)?;
        if proof.is_some() {
            action.ledger_proof = proof;
        }
        Ok(action)
    }
}
