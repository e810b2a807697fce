//! Compliance action API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/compliance/actions` - Record a compliance action
//! - `GET /api/v1/compliance/actions` - List actions with filters and pagination
//! - `GET /api/v1/compliance/actions/:id` - Get a single action
//! - `POST /api/v1/compliance/reconcile` - Repair the index from the ledger
//! - `GET /api/v1/compliance/stats` - Index counts and ledger mode

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cledger_common::types::ActionFilter;
use uuid::Uuid;

use super::{
    commands::{ReconcileCommand, ReconcileError, RecordActionCommand, RecordActionError},
    queries::{
        GetActionError, GetActionQuery, ListActionsError, ListActionsQuery, StatsError, StatsQuery,
    },
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::ComplianceContext;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn compliance_routes() -> Router<ComplianceContext> {
    Router::new()
        .route("/actions", post(record_action).get(list_actions))
        .route("/actions/:id", get(get_action))
        .route("/reconcile", post(reconcile))
        .route("/stats", get(stats))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Record a compliance action
///
/// # Request Body
///
/// ```json
/// {
///   "policyId": "POL-003",
///   "actionTaken": "BLOCK_RDP_PORT",
///   "threatDescription": "RDP brute force",
///   "confidence": 0.92,
///   "severity": "CRITICAL",
///   "targetEndpoints": ["srv-01"]
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - Recorded; `health` tells whether every step applied
/// - `400 Bad Request` - Validation error
#[tracing::instrument(skip(ctx, command), fields(policy_id = %command.policy_id))]
async fn record_action(
    State(ctx): State<ComplianceContext>,
    Json(command): Json<RecordActionCommand>,
) -> Result<Response, ComplianceApiError> {
    let response = super::commands::record::handle(ctx, command).await?;

    tracing::info!(
        action_id = %response.outcome.action.id,
        status = %response.outcome.action.status,
        "Compliance action recorded via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Reconcile the index against the ledger
///
/// # Response
///
/// - `200 OK` - Reconciliation report
/// - `503 Service Unavailable` - Ledger or index unreachable
#[tracing::instrument(skip(ctx))]
async fn reconcile(State(ctx): State<ComplianceContext>) -> Result<Response, ComplianceApiError> {
    let response = super::commands::reconcile::handle(ctx, ReconcileCommand {}).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// List compliance actions
///
/// `GET /api/v1/compliance/actions?status=EXECUTED&severity=CRITICAL&policyId=POL-003&q=rdp&since=...&until=...&limit=50&offset=0`
#[tracing::instrument(skip(ctx, filter))]
async fn list_actions(
    State(ctx): State<ComplianceContext>,
    Query(filter): Query<ActionFilter>,
) -> Result<Response, ComplianceApiError> {
    let response = super::queries::list::handle(ctx, ListActionsQuery(filter)).await?;

    tracing::debug!(
        source = %response.source,
        returned = response.items.len(),
        "Compliance actions listed via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Get a single compliance action
///
/// # Response
///
/// - `200 OK` - Found in the ledger or the index
/// - `404 Not Found` - Neither backend has it
#[tracing::instrument(skip(ctx), fields(action_id = %id))]
async fn get_action(
    State(ctx): State<ComplianceContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ComplianceApiError> {
    let response = super::queries::get::handle(ctx, GetActionQuery { id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx))]
async fn stats(State(ctx): State<ComplianceContext>) -> Result<Response, ComplianceApiError> {
    let response = super::queries::stats::handle(ctx, StatsQuery {}).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for compliance API endpoints
#[derive(Debug)]
enum ComplianceApiError {
    Record(RecordActionError),
    List(ListActionsError),
    Get(GetActionError),
    Reconcile(ReconcileError),
    Stats(StatsError),
}

impl From<RecordActionError> for ComplianceApiError {
    fn from(err: RecordActionError) -> Self {
        Self::Record(err)
    }
}

impl From<ListActionsError> for ComplianceApiError {
    fn from(err: ListActionsError) -> Self {
        Self::List(err)
    }
}

impl From<GetActionError> for ComplianceApiError {
    fn from(err: GetActionError) -> Self {
        Self::Get(err)
    }
}

impl From<ReconcileError> for ComplianceApiError {
    fn from(err: ReconcileError) -> Self {
        Self::Reconcile(err)
    }
}

impl From<StatsError> for ComplianceApiError {
    fn from(err: StatsError) -> Self {
        Self::Stats(err)
    }
}

impl IntoResponse for ComplianceApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Record(RecordActionError::Validation(_))
            | Self::List(ListActionsError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            },
            Self::Record(RecordActionError::Lifecycle(_)) => {
                tracing::error!("Record lifecycle error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            },
            Self::Get(GetActionError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Reconcile(_) | Self::Stats(_) => {
                tracing::warn!("Backend unavailable: {}", self);
                (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
            },
        };

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

impl std::fmt::Display for ComplianceApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
            Self::Reconcile(e) => write!(f, "{}", e),
            Self::Stats(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    use crate::features::shared::test_helpers::{SlowAckLedger, TestContext};
    use crate::ledger::LocalLedger;
    use crate::index::ActionIndex;

    #[test]
    fn test_error_status_codes() {
        let validation = ComplianceApiError::Record(RecordActionError::Validation("x".to_string()));
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ComplianceApiError::Get(GetActionError::NotFound(Uuid::nil()));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let unavailable = ComplianceApiError::Reconcile(ReconcileError::LedgerUnavailable(
            crate::ledger::LedgerError::Timeout,
        ));
        assert_eq!(unavailable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_display() {
        let err = ComplianceApiError::Get(GetActionError::NotFound(Uuid::nil()));
        assert!(err.to_string().contains("not found"));
    }

    async fn post_record(app: Router) -> StatusCode {
        let body = r#"{"policyId":"POL-003","actionTaken":"BLOCK_RDP_PORT","confidence":0.92}"#;
        app.oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/compliance/actions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_concurrent_records_run_in_parallel() {
        let delay = Duration::from_millis(300);
        let ledger = SlowAckLedger::committing(Arc::new(LocalLedger::new()), delay);
        let test = TestContext::with_ledger(Arc::new(ledger)).await;
        let app = crate::features::router(test.ctx.clone());

        let started = Instant::now();
        let statuses = futures::future::join_all((0..4).map(|_| post_record(app.clone()))).await;

        assert!(statuses.iter().all(|s| *s == StatusCode::CREATED));
        assert!(started.elapsed() < delay * 3, "records were serialized");
        assert_eq!(test.index.count(None).await.unwrap(), 4);
    }
}
