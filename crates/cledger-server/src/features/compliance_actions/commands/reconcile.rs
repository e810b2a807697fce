//! Reconcile command
//!
//! Operator-triggered repair of the index from the ledger. Every ledger entry
//! missing from the index is inserted, index rows still `PENDING` are moved
//! to the ledger's terminal status, and terminal disagreements are counted
//! but never rewritten.

use cledger_common::types::ComplianceAction;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::features::compliance_actions::queries::LEDGER_SCAN_PREFIX;
use crate::features::shared::with_deadline;
use crate::features::ComplianceContext;
use crate::index::IndexError;
use crate::ledger::LedgerError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileCommand {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    /// Ledger entries read
    pub scanned: u64,
    /// Entries absent from the index and inserted
    pub inserted: u64,
    /// Index rows moved from `PENDING` to the ledger's status
    pub advanced: u64,
    /// Terminal status in the index differs from the ledger; left untouched
    pub conflicts: u64,
    /// Ledger entries that could not be decoded
    pub skipped: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(#[from] IndexError),
}

#[tracing::instrument(skip(ctx, _command), fields(ledger_mode = %ctx.ledger.mode()))]
pub async fn handle(
    ctx: ComplianceContext,
    _command: ReconcileCommand,
) -> Result<ReconcileResponse, ReconcileError> {
    let ledger_timeout = ctx.settings.ledger_timeout;
    let index_timeout = ctx.settings.index_timeout;

    let mut scan = with_deadline(ledger_timeout, ctx.ledger.scan_prefix(LEDGER_SCAN_PREFIX)).await?;
    let mut report = ReconcileResponse::default();

    loop {
        let next: Option<Result<_, LedgerError>> = tokio::time::timeout(ledger_timeout, scan.next())
            .await
            .map_err(LedgerError::from)?;
        let Some(entry) = next.transpose()? else {
            break;
        };
        report.scanned += 1;

        let action = match ComplianceAction::from_ledger_bytes(&entry.value, entry.proof) {
            Ok(action) => action,
            Err(e) => {
                warn!(key = %entry.key, error = %e, "Skipping undecodable ledger entry");
                report.skipped += 1;
                continue;
            },
        };

        let indexed = with_deadline(index_timeout, ctx.index.get(action.id)).await?;
        match indexed {
            None => {
                with_deadline(index_timeout, ctx.index.upsert(&action)).await?;
                report.inserted += 1;
            },
            Some(row) if row.status == action.status => {},
            Some(row) if !row.status.is_terminal() => {
                with_deadline(index_timeout, ctx.index.upsert(&action)).await?;
                report.advanced += 1;
            },
            Some(row) => {
                warn!(
                    action_id = %action.id,
                    ledger_status = %action.status,
                    index_status = %row.status,
                    "Ledger and index disagree on terminal status"
                );
                report.conflicts += 1;
            },
        }
    }

    info!(
        scanned = report.scanned,
        inserted = report.inserted,
        advanced = report.advanced,
        conflicts = report.conflicts,
        skipped = report.skipped,
        "Reconciliation finished"
    );

    Ok(report)
}
