//! Get compliance action query
//!
//! Ledger first, then the index. There is no defaults tier: an id neither
//! backend can produce is `NotFound`.

use cledger_common::types::ComplianceAction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ReadSource;
use crate::features::shared::with_deadline;
use crate::features::ComplianceContext;
use crate::index::IndexError;
use crate::ledger::LedgerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetActionQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetActionResponse {
    pub action: ComplianceAction,
    pub source: ReadSource,
}

#[derive(Debug, thiserror::Error)]
pub enum GetActionError {
    #[error("Compliance action '{0}' not found")]
    NotFound(Uuid),
}

#[tracing::instrument(skip(ctx), fields(action_id = %query.id))]
pub async fn handle(
    ctx: ComplianceContext,
    query: GetActionQuery,
) -> Result<GetActionResponse, GetActionError> {
    let key = query.id.to_string();

    let from_ledger: Result<_, LedgerError> =
        with_deadline(ctx.settings.ledger_timeout, ctx.ledger.get(&key)).await;
    match from_ledger {
        Ok(Some(entry)) => match ComplianceAction::from_ledger_bytes(&entry.value, entry.proof) {
            Ok(action) => {
                return Ok(GetActionResponse {
                    action,
                    source: ReadSource::Ledger,
                })
            },
            Err(e) => warn!(error = %e, "Undecodable ledger entry, trying index"),
        },
        Ok(None) => debug!("Not in ledger, trying index"),
        Err(e) => warn!(error = %e, "Ledger read failed, trying index"),
    }

    let from_index: Result<_, IndexError> =
        with_deadline(ctx.settings.index_timeout, ctx.index.get(query.id)).await;
    match from_index {
        Ok(Some(action)) => Ok(GetActionResponse {
            action,
            source: ReadSource::Index,
        }),
        Ok(None) => Err(GetActionError::NotFound(query.id)),
        Err(e) => {
            warn!(error = %e, "Index read failed");
            Err(GetActionError::NotFound(query.id))
        },
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

    fn command() -> RecordActionCommand {
        RecordActionCommand {
            policy_id: "POL-003".to_string(),
            action_taken: "BLOCK_RDP_PORT".to_string(),
            confidence: Some(0.92),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_returns_identical_record() {
        let test = TestContext::new().await;
        let recorded = record::handle(test.ctx.clone(), command()).await.unwrap();
        let id = recorded.outcome.action.id;

        let response = handle(test.ctx.clone(), GetActionQuery { id }).await.unwrap();
        assert_eq!(response.source, ReadSource::Ledger);
        assert_eq!(response.action, recorded.outcome.action);
    }

    #[tokio::test]
    async fn test_index_serves_when_ledger_lacks_key() {
        let test = TestContext::new().await;
        let mut action = ComplianceAction::new("POL-009", "UPDATE_FIREWALL", 0.3);
        action.transition(ActionStatus::Executed).unwrap();
        test.index.upsert(&action).await.unwrap();

        let response = handle(test.ctx.clone(), GetActionQuery { id: action.id }).await.unwrap();
        assert_eq!(response.source, ReadSource::Index);
        assert_eq!(response.action, action);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let test = TestContext::new().await;
        let id = Uuid::new_v4();
        let err = handle(test.ctx.clone(), GetActionQuery { id }).await.unwrap_err();
        assert!(matches!(err, GetActionError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_ledger_only_record_is_not_found_when_ledger_unreachable() {
        // Write to a ledger the context cannot reach.
        let written = TestContext::new().await;
        let recorded = record::handle(written.ctx.clone(), command()).await.unwrap();
        let id = recorded.outcome.action.id;
        assert!(written.local.unwrap().get(&id.to_string()).await.unwrap().is_some());

        let test = TestContext::with_ledger(Arc::new(UnreachableLedger)).await;
        let err = handle(test.ctx.clone(), GetActionQuery { id }).await.unwrap_err();
        assert!(matches!(err, GetActionError::NotFound(_)));
    }
}
