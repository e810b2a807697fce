//! Typed outcomes of the record path
//!
//! Writes to the index and the enforcement hook are best-effort. Rather than
//! hiding their failures in logs, each step reports a [`StepOutcome`] and the
//! whole call is summarized as a [`WriteHealth`].

use serde::{Deserialize, Serialize};

use super::ComplianceAction;

/// Result of one side-effecting step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum StepOutcome {
    Applied,
    /// The step had nothing to do for this record
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Overall health of one `record` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteHealth {
    /// Every step applied (or had nothing to do)
    Complete,
    /// The ledger accepted the record but a mirror or enforcement step failed
    Degraded,
    /// The ledger write failed; the record is `FAILED`
    LedgerFailed,
}

/// The final record plus what happened at each step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub action: ComplianceAction,
    pub ledger: StepOutcome,
    pub index: StepOutcome,
    pub enforcement: StepOutcome,
}

impl RecordOutcome {
    pub fn health(&self) -> WriteHealth {
        if self.ledger.is_failed() {
            WriteHealth::LedgerFailed
        } else if self.index.is_failed() || self.enforcement.is_failed() {
            WriteHealth::Degraded
        } else {
            WriteHealth::Complete
        }
    }
}
