//! Feature modules implementing the compliance ledger API
//!
//! Features are vertical slices following the CQRS (Command Query Responsibility
//! Segregation) pattern, each with its own commands, queries, and routes.
//!
//! # Features
//!
//! - **compliance_actions**: Record, list, fetch and reconcile compliance actions
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (record, reconcile)
//! - `queries/` - Read operations (list, get, stats)
//! - `routes.rs` - HTTP route definitions
//!
//! Routes call each handler directly. Handlers take a [`ComplianceContext`]
//! instead of a bare connection pool.

pub mod compliance_actions;
pub mod shared;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cledger_common::types::ConfidencePolicy;

use crate::config::Config;
use crate::enforcement::EnforcementTrigger;
use crate::index::ActionIndex;
use crate::ledger::LedgerStore;

/// Tunables the handlers read on every call
#[derive(Debug, Clone)]
pub struct ComplianceSettings {
    pub confidence_policy: ConfidencePolicy,
    /// Upper bound on a single ledger call
    pub ledger_timeout: Duration,
    /// Upper bound on a single index call
    pub index_timeout: Duration,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl ComplianceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            confidence_policy: config.compliance.confidence_policy,
            ledger_timeout: config.ledger.timeout(),
            index_timeout: config.index.timeout(),
            default_page_size: config.index.default_page_size,
            max_page_size: config.index.max_page_size,
        }
    }
}

/// Shared state for all feature handlers
///
/// The ledger backend is chosen once at startup and never swapped.
#[derive(Clone)]
pub struct ComplianceContext {
    pub ledger: Arc<dyn LedgerStore>,
    pub index: Arc<dyn ActionIndex>,
    pub enforcement: EnforcementTrigger,
    pub settings: ComplianceSettings,
}

impl std::fmt::Debug for ComplianceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceContext")
            .field("ledger_mode", &self.ledger.mode())
            .field("index_backend", &self.index.backend())
            .field("enforcement", &self.enforcement)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/compliance` - Compliance action recording and reads
pub fn router(ctx: ComplianceContext) -> Router<()> {
    Router::new().nest("/compliance", compliance_actions::compliance_routes().with_state(ctx))
}
