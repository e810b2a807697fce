//! Secondary Index
//!
//! A relational copy of every recorded action, used for filtered and paginated
//! reads and as the fallback when the ledger cannot be reached. The ledger
//! stays authoritative; the index is advisory.
//!
//! The backend is picked from the database URL scheme: `postgres://` or
//! `postgresql://` selects [`PgActionIndex`], `sqlite:` selects
//! [`SqliteActionIndex`].

use std::sync::Arc;

use async_trait::async_trait;
use cledger_common::types::{ActionCriteria, ActionStatus, ComplianceAction};
use thiserror::Error;
use uuid::Uuid;

use crate::config::IndexConfig;

pub mod postgres;
pub mod sqlite;

pub use postgres::PgActionIndex;
pub use sqlite::SqliteActionIndex;

pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Index migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Index call timed out")]
    Timeout,

    #[error("Corrupt index row {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Unsupported index database URL '{0}' (expected postgres:// or sqlite:)")]
    UnsupportedUrl(String),
}

impl From<tokio::time::error::Elapsed> for IndexError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl IndexError {
    pub(crate) fn corrupt(id: impl ToString, reason: impl ToString) -> Self {
        Self::Corrupt {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Relational mirror of compliance actions
#[async_trait]
pub trait ActionIndex: Send + Sync {
    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Apply pending schema migrations
    async fn migrate(&self) -> IndexResult<()>;

    /// Insert or overwrite the row for `action.id`
    ///
    /// Every column takes the new value except `status`, which only moves
    /// away from `PENDING`; a terminal status is never rewritten.
    async fn upsert(&self, action: &ComplianceAction) -> IndexResult<()>;

    /// Filtered page, newest first
    async fn query(&self, criteria: &ActionCriteria) -> IndexResult<Vec<ComplianceAction>>;

    async fn get(&self, id: Uuid) -> IndexResult<Option<ComplianceAction>>;

    /// Row count, optionally restricted to one status
    async fn count(&self, status: Option<ActionStatus>) -> IndexResult<i64>;

    async fn health_check(&self) -> IndexResult<()>;

    /// Close the pool; later calls fail
    async fn close(&self);
}

/// Connect to the index named by `config.url`
///
/// PostgreSQL pools connect lazily so an unreachable database degrades reads
/// instead of preventing startup.
pub async fn connect(config: &IndexConfig) -> IndexResult<Arc<dyn ActionIndex>> {
    let url = config.url.as_str();

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Arc::new(PgActionIndex::connect(config)?))
    } else if url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteActionIndex::connect(config).await?))
    } else {
        Err(IndexError::UnsupportedUrl(url.to_string()))
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside `LIKE`
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rdp"), "%rdp%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let mut config = Config::default().index;
        config.url = "mysql://localhost/cledger".to_string();
        assert!(matches!(
            connect(&config).await,
            Err(IndexError::UnsupportedUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_selects_sqlite() {
        let config = Config::default().index;
        let index = connect(&config).await.unwrap();
        assert_eq!(index.backend(), "sqlite");
    }

    #[tokio::test]
    async fn test_connect_postgres_is_lazy() {
        let mut config = Config::default().index;
        config.url = "postgres://cledger@127.0.0.1:1/cledger".to_string();
        let index = connect(&config).await.unwrap();
        assert_eq!(index.backend(), "postgres");
    }
}
