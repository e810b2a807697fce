//! Test helpers and fixtures for feature tests
//!
//! Builds a [`ComplianceContext`] over the local ledger and an in-memory
//! SQLite index, plus ledger doubles for failure paths.
//!
//! # Examples
//!
//! ```rust,ignore
//! use cledger_server::features::shared::test_helpers::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = TestContext::new().await;
//!     let ctx = TestContext::with_ledger(Arc::new(UnreachableLedger)).await;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cledger_common::types::ConfidencePolicy;

use crate::enforcement::{EnforcementTrigger, LogEnforcer};
use crate::features::{ComplianceContext, ComplianceSettings};
use crate::index::{ActionIndex, SqliteActionIndex};
use crate::ledger::{
    LedgerEntry, LedgerError, LedgerMode, LedgerReceipt, LedgerResult, LedgerScan, LedgerStore,
    LocalLedger,
};

/// Ledger double whose every call fails
#[derive(Debug, Default)]
pub struct UnreachableLedger;

#[async_trait]
impl LedgerStore for UnreachableLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Network
    }

    async fn put(&self, _key: &str, _value: Vec<u8>) -> LedgerResult<LedgerReceipt> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> LedgerResult<Option<LedgerEntry>> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }

    async fn scan_prefix(&self, _prefix: &str) -> LedgerResult<LedgerScan> {
        Err(LedgerError::Unavailable("connection refused".to_string()))
    }

    async fn emit(&self, _event_name: &str, _payload: Vec<u8>) {}
}

/// Local ledger whose write acknowledgements arrive after `delay`
///
/// With `commit` set the write lands before the stall; otherwise it is dropped.
pub struct SlowAckLedger {
    inner: Arc<LocalLedger>,
    delay: Duration,
    commit: bool,
}

impl SlowAckLedger {
    pub fn committing(inner: Arc<LocalLedger>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            commit: true,
        }
    }

    pub fn dropping(inner: Arc<LocalLedger>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            commit: false,
        }
    }
}

#[async_trait]
impl LedgerStore for SlowAckLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Network
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LedgerResult<LedgerReceipt> {
        let receipt = if self.commit {
            Some(self.inner.put(key, value).await?)
        } else {
            None
        };
        tokio::time::sleep(self.delay).await;
        receipt.ok_or_else(|| LedgerError::Unavailable("write dropped".to_string()))
    }

    async fn get(&self, key: &str) -> LedgerResult<Option<LedgerEntry>> {
        self.inner.get(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> LedgerResult<LedgerScan> {
        self.inner.scan_prefix(prefix).await
    }

    async fn emit(&self, event_name: &str, payload: Vec<u8>) {
        self.inner.emit(event_name, payload).await
    }
}

/// Handles to the pieces of a test context
pub struct TestContext {
    pub ctx: ComplianceContext,
    pub local: Option<Arc<LocalLedger>>,
    pub index: Arc<SqliteActionIndex>,
}

impl TestContext {
    /// Local ledger, in-memory index, log enforcer
    pub async fn new() -> Self {
        let local = Arc::new(LocalLedger::new());
        let mut test = Self::build(local.clone()).await;
        test.local = Some(local);
        test
    }

    pub async fn with_ledger(ledger: Arc<dyn LedgerStore>) -> Self {
        Self::build(ledger).await
    }

    async fn build(ledger: Arc<dyn LedgerStore>) -> Self {
        let index = Arc::new(
            SqliteActionIndex::in_memory()
                .await
                .expect("in-memory index"),
        );
        let index_dyn: Arc<dyn ActionIndex> = index.clone();

        let ctx = ComplianceContext {
            ledger,
            index: index_dyn,
            enforcement: EnforcementTrigger::new(Arc::new(LogEnforcer), Duration::from_secs(1)),
            settings: test_settings(ConfidencePolicy::Clamp),
        };

        Self {
            ctx,
            local: None,
            index,
        }
    }

    pub fn with_confidence_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.ctx.settings.confidence_policy = policy;
        self
    }
}

pub fn test_settings(confidence_policy: ConfidencePolicy) -> ComplianceSettings {
    ComplianceSettings {
        confidence_policy,
        ledger_timeout: Duration::from_secs(2),
        index_timeout: Duration::from_secs(2),
        default_page_size: 50,
        max_page_size: 200,
    }
}
