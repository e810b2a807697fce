//! Shared fixtures for the HTTP integration tests
//!
//! Builds the full router over an in-memory SQLite index and a local ledger
//! that can be switched off mid-test.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cledger_common::types::{ComplianceAction, ConfidencePolicy};
use serde_json::Value;
use tower::ServiceExt;

use cledger_server::api::create_router;
use cledger_server::config::Config;
use cledger_server::enforcement::{
    EnforcementError, EnforcementReport, EnforcementTrigger, Enforcer,
};
use cledger_server::index::SqliteActionIndex;
use cledger_server::ledger::{
    LedgerEntry, LedgerError, LedgerMode, LedgerReceipt, LedgerResult, LedgerScan, LedgerStore,
    LocalLedger,
};
use cledger_server::{ComplianceContext, ComplianceSettings};

/// Local ledger behind a reachability switch
pub struct SwitchableLedger {
    inner: LocalLedger,
    reachable: AtomicBool,
}

impl SwitchableLedger {
    pub fn new() -> Self {
        Self {
            inner: LocalLedger::new(),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Write straight to the ledger, bypassing the recorder and the index
    pub async fn put_action(&self, action: &ComplianceAction) {
        let bytes = serde_json::to_vec(action).unwrap();
        self.inner.put(&action.id.to_string(), bytes).await.unwrap();
    }

    fn check(&self) -> LedgerResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("switched off by test".to_string()))
        }
    }
}

#[async_trait]
impl LedgerStore for SwitchableLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Local
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LedgerResult<LedgerReceipt> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn get(&self, key: &str) -> LedgerResult<Option<LedgerEntry>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> LedgerResult<LedgerScan> {
        self.check()?;
        self.inner.scan_prefix(prefix).await
    }

    async fn emit(&self, event_name: &str, payload: Vec<u8>) {
        if self.check().is_ok() {
            self.inner.emit(event_name, payload).await;
        }
    }
}

/// Enforcer that counts how often it was fired
#[derive(Default)]
pub struct CountingEnforcer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Enforcer for CountingEnforcer {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn enforce(
        &self,
        action: &ComplianceAction,
    ) -> Result<EnforcementReport, EnforcementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EnforcementReport::Executed {
            detail: format!("counted {}", action.id),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<SwitchableLedger>,
    pub index: Arc<SqliteActionIndex>,
    pub enforcer: Arc<CountingEnforcer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(ConfidencePolicy::Clamp).await
    }

    pub async fn with_policy(confidence_policy: ConfidencePolicy) -> Self {
        let ledger = Arc::new(SwitchableLedger::new());
        let index = Arc::new(SqliteActionIndex::in_memory().await.unwrap());
        let enforcer = Arc::new(CountingEnforcer::default());

        let ctx = ComplianceContext {
            ledger: ledger.clone(),
            index: index.clone(),
            enforcement: EnforcementTrigger::new(enforcer.clone(), Duration::from_secs(1)),
            settings: ComplianceSettings {
                confidence_policy,
                ledger_timeout: Duration::from_secs(2),
                index_timeout: Duration::from_secs(2),
                default_page_size: 50,
                max_page_size: 200,
            },
        };

        let router = create_router(ctx, &Config::default());

        Self {
            router,
            ledger,
            index,
            enforcer,
        }
    }

    pub fn enforcement_calls(&self) -> usize {
        self.enforcer.calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections answer with plain text
        let value = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

        (status, value)
    }

    /// Record through the API and return the stored action
    pub async fn record(&self, body: Value) -> Value {
        let (status, json) = self.post("/api/v1/compliance/actions", body).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
        json["data"]["action"].clone()
    }
}
