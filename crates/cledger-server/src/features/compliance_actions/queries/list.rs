//! List compliance actions query
//!
//! Tiers, first success wins:
//!
//! 1. Ledger: full prefix scan, filtered and paginated in process
//! 2. Index: filtered SQL query
//! 3. Defaults: the built-in set, paginated but unfiltered
//!
//! A reachable tier answers even when it has nothing to return; only a
//! failure or timeout moves on to the next one.

use cledger_common::types::{ActionCriteria, ActionFilter, ComplianceAction};
use cledger_common::CommonError;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ReadSource, LEDGER_SCAN_PREFIX};
use crate::features::compliance_actions::defaults::default_actions;
use crate::features::shared::{with_deadline, PaginationMetadata};
use crate::features::ComplianceContext;
use crate::index::IndexError;
use crate::ledger::{LedgerError, LedgerResult};

/// Query to list compliance actions
///
/// # Examples
///
/// ```rust,ignore
/// use cledger_common::types::{ActionFilter, ActionStatus};
/// use cledger_server::features::compliance_actions::ListActionsQuery;
///
/// let query = ListActionsQuery(ActionFilter::default().with_status(ActionStatus::Executed));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListActionsQuery(pub ActionFilter);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActionsResponse {
    pub items: Vec<ComplianceAction>,
    pub source: ReadSource,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ListActionsError {
    #[error("Invalid filter: {0}")]
    Validation(String),
}

impl From<CommonError> for ListActionsError {
    fn from(err: CommonError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[tracing::instrument(skip(ctx, query))]
pub async fn handle(
    ctx: ComplianceContext,
    query: ListActionsQuery,
) -> Result<ListActionsResponse, ListActionsError> {
    let criteria = query
        .0
        .resolve(ctx.settings.default_page_size, ctx.settings.max_page_size)?;

    let from_ledger: LedgerResult<_> =
        with_deadline(ctx.settings.ledger_timeout, scan_ledger(&ctx, &criteria)).await;
    match from_ledger {
        Ok(items) => return Ok(respond(items, ReadSource::Ledger, &criteria)),
        Err(e) => warn!(error = %e, "Ledger read failed, falling back to index"),
    }

    let from_index: Result<_, IndexError> =
        with_deadline(ctx.settings.index_timeout, ctx.index.query(&criteria)).await;
    match from_index {
        Ok(items) => return Ok(respond(items, ReadSource::Index, &criteria)),
        Err(e) => warn!(error = %e, "Index read failed, serving default actions"),
    }

    Ok(respond(
        criteria.paginate(default_actions()),
        ReadSource::Defaults,
        &criteria,
    ))
}

async fn scan_ledger(
    ctx: &ComplianceContext,
    criteria: &ActionCriteria,
) -> Result<Vec<ComplianceAction>, LedgerError> {
    let entries: Vec<_> = ctx
        .ledger
        .scan_prefix(LEDGER_SCAN_PREFIX)
        .await?
        .try_collect()
        .await?;

    let matching = entries
        .into_iter()
        .filter_map(|entry| {
            match ComplianceAction::from_ledger_bytes(&entry.value, entry.proof) {
                Ok(action) => Some(action),
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "Skipping undecodable ledger entry");
                    None
                },
            }
        })
        .filter(|action| criteria.matches(action))
        .collect();

    Ok(criteria.paginate(matching))
}

fn respond(
    items: Vec<ComplianceAction>,
    source: ReadSource,
    criteria: &ActionCriteria,
) -> ListActionsResponse {
    debug!(source = %source, returned = items.len(), "Listed compliance actions");
    ListActionsResponse {
        pagination: PaginationMetadata::from_criteria(criteria, items.len()),
        items,
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::features::compliance_actions::commands::{record, RecordActionCommand};
    use crate::features::shared::test_helpers::{TestContext, UnreachableLedger};
    use crate::index::ActionIndex;
    use crate::ledger::LedgerStore;
    use cledger_common::types::ActionStatus;
    use std::sync::Arc;

    fn command(policy: &str, code: &str) -> RecordActionCommand {
        RecordActionCommand {
            policy_id: policy.to_string(),
            action_taken: code.to_string(),
            confidence: Some(0.8),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lists_from_ledger_first() {
        let test = TestContext::new().await;
        let recorded = record::handle(test.ctx.clone(), command("POL-003", "BLOCK_RDP_PORT"))
            .await
            .unwrap();

        let response = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter::default().with_status(ActionStatus::Executed)),
        )
        .await
        .unwrap();

        assert_eq!(response.source, ReadSource::Ledger);
        assert_eq!(response.items, vec![recorded.outcome.action]);
        assert_eq!(response.pagination.returned, 1);
    }

    #[tokio::test]
    async fn test_empty_ledger_still_answers() {
        let test = TestContext::new().await;
        let response = handle(test.ctx.clone(), ListActionsQuery::default()).await.unwrap();
        assert_eq!(response.source, ReadSource::Ledger);
        assert!(response.items.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_filters_and_paginates() {
        let test = TestContext::new().await;
        for (policy, code) in [
            ("POL-001", "DISABLE_SMBv1"),
            ("POL-003", "BLOCK_RDP_PORT"),
            ("POL-003", "UPDATE_FIREWALL"),
        ] {
            record::handle(test.ctx.clone(), command(policy, code)).await.unwrap();
        }

        let by_policy = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter {
                policy_id: Some("POL-003".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_policy.items.len(), 2);

        let page = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter::default().with_limit(1)),
        )
        .await
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.limit, 1);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_falls_back_to_index() {
        let test = TestContext::with_ledger(Arc::new(UnreachableLedger)).await;
        let recorded = record::handle(test.ctx.clone(), command("POL-003", "BLOCK_RDP_PORT"))
            .await
            .unwrap();

        let response = handle(test.ctx.clone(), ListActionsQuery::default()).await.unwrap();

        assert_eq!(response.source, ReadSource::Index);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id, recorded.outcome.action.id);
        assert_eq!(response.items[0].status, ActionStatus::Failed);
    }

    #[tokio::test]
    async fn test_both_unreachable_serves_defaults_unfiltered() {
        let test = TestContext::with_ledger(Arc::new(UnreachableLedger)).await;
        test.index.close().await;

        let response = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter::default().with_status(ActionStatus::Pending)),
        )
        .await
        .unwrap();

        assert_eq!(response.source, ReadSource::Defaults);
        assert_eq!(response.items, default_actions());

        let paged = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter::default().with_limit(2)),
        )
        .await
        .unwrap();
        assert_eq!(paged.items.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected() {
        let test = TestContext::new().await;
        let err = handle(
            test.ctx.clone(),
            ListActionsQuery(ActionFilter {
                status: Some("DONE".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ListActionsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_undecodable_ledger_entries_are_skipped() {
        let test = TestContext::new().await;
        test.ctx.ledger.put("junk", b"{".to_vec()).await.unwrap();
        record::handle(test.ctx.clone(), command("POL-001", "DISABLE_SMBv1"))
            .await
            .unwrap();

        let response = handle(test.ctx.clone(), ListActionsQuery::default()).await.unwrap();
        assert_eq!(response.source, ReadSource::Ledger);
        assert_eq!(response.items.len(), 1);
        assert_eq!(test.index.count(None).await.unwrap(), 1);
    }
}
