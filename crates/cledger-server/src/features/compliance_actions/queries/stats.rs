//! Compliance statistics query
//!
//! Counts come from the index; the ledger has no cheap count.

use std::collections::BTreeMap;

use cledger_common::types::ActionStatus;
use serde::{Deserialize, Serialize};

use crate::features::shared::with_deadline;
use crate::features::ComplianceContext;
use crate::index::IndexError;
use crate::ledger::LedgerMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub ledger_mode: LedgerMode,
    pub indexed_actions: i64,
    /// Keyed by status name
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Index unavailable: {0}")]
    IndexUnavailable(#[from] IndexError),
}

#[tracing::instrument(skip(ctx, _query))]
pub async fn handle(ctx: ComplianceContext, _query: StatsQuery) -> Result<StatsResponse, StatsError> {
    let timeout = ctx.settings.index_timeout;

    let indexed_actions = with_deadline(timeout, ctx.index.count(None)).await?;

    let mut by_status = BTreeMap::new();
    for status in ActionStatus::ALL {
        let count = with_deadline(timeout, ctx.index.count(Some(status))).await?;
        by_status.insert(status.as_str().to_string(), count);
    }

    Ok(StatsResponse {
        ledger_mode: ctx.ledger.mode(),
        indexed_actions,
        by_status,
    })
}
