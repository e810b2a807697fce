//! SQLite-backed index
//!
//! Used for local development and tests. `recorded_at` is stored as integer
//! microseconds since the epoch and `target_endpoints` as a JSON array string.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cledger_common::types::{ActionCriteria, ActionStatus, ComplianceAction};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{like_pattern, ActionIndex, IndexError, IndexResult};
use crate::config::IndexConfig;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

const SELECT_COLUMNS: &str = "SELECT id, policy_id, action_taken, threat_description, confidence, \
     severity, target_endpoints, status, recorded_at, ledger_proof FROM compliance_actions";

#[derive(Debug, FromRow)]
struct ActionRow {
    id: String,
    policy_id: String,
    action_taken: String,
    threat_description: Option<String>,
    confidence: f64,
    severity: String,
    target_endpoints: String,
    status: String,
    recorded_at: i64,
    ledger_proof: Option<String>,
}

impl TryFrom<ActionRow> for ComplianceAction {
    type Error = IndexError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| IndexError::corrupt(&row.id, e))?;
        let endpoints: Vec<String> = serde_json::from_str(&row.target_endpoints)
            .map_err(|e| IndexError::corrupt(id, e))?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(row.recorded_at)
            .ok_or_else(|| IndexError::corrupt(id, "recorded_at out of range"))?;

        Ok(ComplianceAction {
            id,
            status: row.status.parse().map_err(|e| IndexError::corrupt(id, e))?,
            severity: row.severity.parse().map_err(|e| IndexError::corrupt(id, e))?,
            policy_id: row.policy_id,
            action_taken: row.action_taken,
            threat_description: row.threat_description,
            confidence: row.confidence,
            target_endpoints: endpoints.into_iter().collect(),
            timestamp,
            ledger_proof: row.ledger_proof,
        })
    }
}

pub struct SqliteActionIndex {
    pool: SqlitePool,
}

impl SqliteActionIndex {
    pub async fn connect(config: &IndexConfig) -> IndexResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // Each in-memory connection is its own database; keep exactly one alive.
        let pool = if is_in_memory(&config.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(config.connect_timeout())
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.connect_timeout())
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Fresh migrated in-memory index
    pub async fn in_memory() -> IndexResult<Self> {
        let mut config = crate::config::Config::default().index;
        config.url = "sqlite::memory:".to_string();
        let index = Self::connect(&config).await?;
        index.migrate().await?;
        Ok(index)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl ActionIndex for SqliteActionIndex {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> IndexResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, action: &ComplianceAction) -> IndexResult<()> {
        let endpoints = serde_json::to_string(&action.target_endpoints)
            .map_err(|e| IndexError::corrupt(action.id, e))?;

        sqlx::query(
            r#"
            INSERT INTO compliance_actions (
                id, policy_id, action_taken, threat_description, confidence,
                severity, target_endpoints, status, recorded_at, ledger_proof
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                policy_id = excluded.policy_id,
                action_taken = excluded.action_taken,
                threat_description = excluded.threat_description,
                confidence = excluded.confidence,
                severity = excluded.severity,
                target_endpoints = excluded.target_endpoints,
                status = CASE
                    WHEN compliance_actions.status = 'PENDING' THEN excluded.status
                    ELSE compliance_actions.status
                END,
                recorded_at = excluded.recorded_at,
                ledger_proof = excluded.ledger_proof,
                indexed_at = datetime('now')
            "#,
        )
        .bind(action.id.to_string())
        .bind(&action.policy_id)
        .bind(&action.action_taken)
        .bind(&action.threat_description)
        .bind(action.confidence)
        .bind(action.severity.as_str())
        .bind(endpoints)
        .bind(action.status.as_str())
        .bind(action.timestamp.timestamp_micros())
        .bind(&action.ledger_proof)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, criteria: &ActionCriteria) -> IndexResult<Vec<ComplianceAction>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
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
            qb.push(" AND (LOWER(policy_id) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(action_taken) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(COALESCE(threat_description, '')) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(since) = criteria.since {
            qb.push(" AND recorded_at >= ").push_bind(since.timestamp_micros());
        }
        if let Some(until) = criteria.until {
            qb.push(" AND recorded_at <= ").push_bind(until.timestamp_micros());
        }

        qb.push(" ORDER BY recorded_at DESC, id LIMIT ")
            .push_bind(criteria.limit)
            .push(" OFFSET ")
            .push_bind(criteria.offset);

        let rows: Vec<ActionRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(ComplianceAction::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> IndexResult<Option<ComplianceAction>> {
        let row: Option<ActionRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ComplianceAction::try_from).transpose()
    }

    async fn count(&self, status: Option<ActionStatus>) -> IndexResult<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM compliance_actions WHERE status = ?")
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cledger_common::types::{ActionFilter, Severity};

    fn action(policy: &str, code: &str) -> ComplianceAction {
        ComplianceAction::new(policy, code, 0.8)
    }

    fn criteria(filter: ActionFilter) -> ActionCriteria {
        filter.resolve(50, 200).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let mut recorded = action("POL-003", "BLOCK_RDP_PORT")
            .with_severity(Severity::Critical)
            .with_threat_description(Some("RDP brute force".to_string()))
            .with_target_endpoints(["srv-01", "ws-07"]);
        recorded.transition(ActionStatus::Executed).unwrap();
        recorded.ledger_proof = Some("sim-tx-0011223344556677".to_string());

        index.upsert(&recorded).await.unwrap();

        let fetched = index.get(recorded.id).await.unwrap().unwrap();
        assert_eq!(fetched, recorded);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        assert!(index.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let recorded = action("POL-001", "DISABLE_SMBv1");

        index.upsert(&recorded).await.unwrap();
        index.upsert(&recorded).await.unwrap();

        assert_eq!(index.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_status_only_leaves_pending() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let pending = action("POL-001", "DISABLE_SMBv1");
        index.upsert(&pending).await.unwrap();

        let mut executed = pending.clone();
        executed.transition(ActionStatus::Executed).unwrap();
        index.upsert(&executed).await.unwrap();
        assert_eq!(
            index.get(pending.id).await.unwrap().unwrap().status,
            ActionStatus::Executed
        );

        // Neither a stale PENDING nor a conflicting terminal status overwrites it.
        index.upsert(&pending).await.unwrap();
        let mut failed = pending.clone();
        failed.transition(ActionStatus::Failed).unwrap();
        failed.action_taken = "ISOLATE_ENDPOINT".to_string();
        index.upsert(&failed).await.unwrap();

        let stored = index.get(pending.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ActionStatus::Executed);
        assert_eq!(stored.action_taken, "ISOLATE_ENDPOINT");
    }

    #[tokio::test]
    async fn test_query_filters() {
        let index = SqliteActionIndex::in_memory().await.unwrap();

        let mut rdp = action("POL-003", "BLOCK_RDP_PORT").with_severity(Severity::Critical);
        rdp.transition(ActionStatus::Executed).unwrap();
        let mut smb = action("POL-001", "DISABLE_SMBv1")
            .with_threat_description(Some("EternalBlue 100%_match".to_string()));
        smb.transition(ActionStatus::Failed).unwrap();
        let fw = action("POL-009", "UPDATE_FIREWALL").with_severity(Severity::Low);

        for a in [&rdp, &smb, &fw] {
            index.upsert(a).await.unwrap();
        }

        let executed = index
            .query(&criteria(ActionFilter::default().with_status(ActionStatus::Executed)))
            .await
            .unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].id, rdp.id);

        let critical = index
            .query(&criteria(ActionFilter {
                severity: Some("critical".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(critical.len(), 1);

        let by_policy = index
            .query(&criteria(ActionFilter {
                policy_id: Some("POL-009".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(by_policy[0].id, fw.id);

        let by_text = index
            .query(&criteria(ActionFilter {
                q: Some("eternalblue".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, smb.id);

        // Wildcards in the needle match literally.
        let literal = index
            .query(&criteria(ActionFilter {
                q: Some("100%_".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(literal.len(), 1);

        let none = index
            .query(&criteria(ActionFilter {
                q: Some("_%".to_string()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_text_search_folds_ascii_only() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let screen = action("POL-009", "UPDATE_FIREWALL")
            .with_threat_description(Some("ÉCRAN de veille".to_string()));
        index.upsert(&screen).await.unwrap();

        let search = |q: &str| {
            criteria(ActionFilter {
                q: Some(q.to_string()),
                ..Default::default()
            })
        };

        for q in ["ÉCRAN", "Écran", "VEILLE"] {
            let hits = index.query(&search(q)).await.unwrap();
            assert_eq!(hits.len(), 1, "query {:?}", q);
            assert!(search(q).matches(&hits[0]));
        }
        assert!(index.query(&search("écran")).await.unwrap().is_empty());
        assert!(!search("écran").matches(&screen));
    }

    #[tokio::test]
    async fn test_query_time_window() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let mut old = action("POL-001", "DISABLE_SMBv1");
        old.timestamp = old.timestamp - Duration::days(3);
        let recent = action("POL-003", "BLOCK_RDP_PORT");
        index.upsert(&old).await.unwrap();
        index.upsert(&recent).await.unwrap();

        let window = index
            .query(&criteria(ActionFilter {
                since: Some(recent.timestamp - Duration::hours(1)),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, recent.id);

        let before = index
            .query(&criteria(ActionFilter {
                until: Some(old.timestamp),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].id, old.id);
    }

    #[tokio::test]
    async fn test_query_is_newest_first_and_paginated() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut a = action(&format!("POL-{:03}", i), "UPDATE_FIREWALL");
            a.timestamp = base - Duration::minutes(i);
            a.timestamp = DateTime::from_timestamp_micros(a.timestamp.timestamp_micros()).unwrap();
            ids.push(a.id);
            index.upsert(&a).await.unwrap();
        }

        let page = index
            .query(&criteria(ActionFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            }))
            .await
            .unwrap();
        let got: Vec<Uuid> = page.iter().map(|a| a.id).collect();
        assert_eq!(got, vec![ids[1], ids[2]]);

        let past_end = index
            .query(&criteria(ActionFilter {
                offset: Some(10),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        let mut done = action("POL-001", "DISABLE_SMBv1");
        done.transition(ActionStatus::Executed).unwrap();
        index.upsert(&done).await.unwrap();
        index.upsert(&action("POL-002", "UPDATE_FIREWALL")).await.unwrap();

        assert_eq!(index.count(None).await.unwrap(), 2);
        assert_eq!(index.count(Some(ActionStatus::Executed)).await.unwrap(), 1);
        assert_eq!(index.count(Some(ActionStatus::Failed)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_errors() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        index.health_check().await.unwrap();
        index.close().await;

        assert!(index.health_check().await.is_err());
        assert!(index.upsert(&action("POL-001", "DISABLE_SMBv1")).await.is_err());
        assert!(index.get(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let index = SqliteActionIndex::in_memory().await.unwrap();
        index.migrate().await.unwrap();
    }
}
