//! PostgreSQL-backed index

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cledger_common::types::{ActionCriteria, ActionStatus, ComplianceAction};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, ActionIndex, IndexError, IndexResult};
use crate::config::IndexConfig;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/postgres");

/// ASCII-only case folding, matching SQLite's `LOWER` and the ledger tier
const ASCII_FOLD_FROM: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ASCII_FOLD_TO: &str = "abcdefghijklmnopqrstuvwxyz";

const SELECT_COLUMNS: &str = "SELECT id, policy_id, action_taken, threat_description, confidence, \
     severity, target_endpoints, status, recorded_at, ledger_proof FROM compliance_actions";

#[derive(Debug, FromRow)]
struct ActionRow {
    id: Uuid,
    policy_id: String,
    action_taken: String,
    threat_description: Option<String>,
    confidence: f64,
    severity: String,
    target_endpoints: Json<Vec<String>>,
    status: String,
    recorded_at: DateTime<Utc>,
    ledger_proof: Option<String>,
}

fn ascii_lower(column: &str) -> String {
    format!("translate({}, '{}', '{}')", column, ASCII_FOLD_FROM, ASCII_FOLD_TO)
}

impl TryFrom<ActionRow> for ComplianceAction {
    type Error = IndexError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        Ok(ComplianceAction {
            id: row.id,
            status: row.status.parse().map_err(|e| IndexError::corrupt(row.id, e))?,
            severity: row.severity.parse().map_err(|e| IndexError::corrupt(row.id, e))?,
            policy_id: row.policy_id,
            action_taken: row.action_taken,
            threat_description: row.threat_description,
            confidence: row.confidence,
            target_endpoints: row.target_endpoints.0.into_iter().collect::<BTreeSet<_>>(),
            timestamp: row.recorded_at,
            ledger_proof: row.ledger_proof,
        })
    }
}

pub struct PgActionIndex {
    pool: PgPool,
}

impl PgActionIndex {
    /// Create a lazily connecting pool; no connection is made until first use
    pub fn connect(config: &IndexConfig) -> IndexResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_lazy(&config.url)?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionIndex for PgActionIndex {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn migrate(&self) -> IndexResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, action: &ComplianceAction) -> IndexResult<()> {
        let endpoints: Vec<&String> = action.target_endpoints.iter().collect();

        sqlx::query(
            r#"
            INSERT INTO compliance_actions (
                id, policy_id, action_taken, threat_description, confidence,
                severity, target_endpoints, status, recorded_at, ledger_proof
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                policy_id = EXCLUDED.policy_id,
                action_taken = EXCLUDED.action_taken,
                threat_description = EXCLUDED.threat_description,
                confidence = EXCLUDED.confidence,
                severity = EXCLUDED.severity,
                target_endpoints = EXCLUDED.target_endpoints,
                status = CASE
                    WHEN compliance_actions.status = 'PENDING' THEN EXCLUDED.status
                    ELSE compliance_actions.status
                END,
                recorded_at = EXCLUDED.recorded_at,
                ledger_proof = EXCLUDED.ledger_proof,
                indexed_at = NOW()
            "#,
        )
        .bind(action.id)
        .bind(&action.policy_id)
        .bind(&action.action_taken)
        .bind(&action.threat_description)
        .bind(action.confidence)
        .bind(action.severity.as_str())
        .bind(Json(endpoints))
        .bind(action.status.as_str())
        .bind(action.timestamp)
        .bind(&action.ledger_proof)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, criteria: &ActionCriteria) -> IndexResult<Vec<ComplianceAction>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE 1 = 1");

        if let Some(status) = criteria.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(severity) = criteria.severity {
            qb.push(" AND severity = ").push_bind(severity.as_str());
        }
        if let Some(ref policy_id) = criteria.policy_id {
            qb.push(" AND policy_id = ").push_bind(policy_id.clone());
        }
        if let Some(ref text) = criteria.text {
            let pattern = like_pattern(text);
            let columns = [
                ascii_lower("policy_id"),
                ascii_lower("action_taken"),
                ascii_lower("COALESCE(threat_description, '')"),
            ];
            qb.push(" AND (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(column)
                    .push(" LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
        if let Some(since) = criteria.since {
            qb.push(" AND recorded_at >= ").push_bind(since);
        }
        if let Some(until) = criteria.until {
            qb.push(" AND recorded_at <= ").push_bind(until);
        }

        qb.push(" ORDER BY recorded_at DESC, id LIMIT ")
            .push_bind(criteria.limit)
            .push(" OFFSET ")
            .push_bind(criteria.offset);

        let rows: Vec<ActionRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(ComplianceAction::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> IndexResult<Option<ComplianceAction>> {
        let row: Option<ActionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ComplianceAction::try_from).transpose()
    }

    async fn count(&self, status: Option<ActionStatus>) -> IndexResult<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM compliance_actions WHERE status = $1")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await?
            },
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM compliance_actions")
                    .fetch_one(&self.pool)
                    .await?
            },
        };
        Ok(count)
    }

    async fn health_check(&self) -> IndexResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
