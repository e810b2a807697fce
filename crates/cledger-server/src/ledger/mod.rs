//! Ledger Store
//!
//! The ledger is the authoritative home of every compliance action. Two
//! backends implement [`LedgerStore`]:
//!
//! - [`NetworkLedger`]: a permissioned ledger reached through its REST gateway
//! - [`LocalLedger`]: an in-process simulation with synthetic transaction ids
//!
//! [`select_backend`] picks one of them exactly once at startup. A failed
//! handshake pins the process to the local ledger; there is no later promotion.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LedgerConfig;

pub mod local;
pub mod network;

pub use local::{LedgerEvent, LocalLedger};
pub use network::{NetworkLedger, NetworkLedgerConfig};

/// Which ledger backend the process is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    Network,
    Local,
}

impl LedgerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of a committed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub key: String,
    /// Transaction reference proving the write
    pub proof: String,
}

/// A stored value together with the proof of the write that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub proof: Option<String>,
}

/// Lazy, finite stream of entries in storage order
pub type LedgerScan = BoxStream<'static, LedgerResult<LedgerEntry>>;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger call timed out")]
    Timeout,

    #[error("Ledger rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Ledger codec error: {0}")]
    Codec(String),
}

impl From<tokio::time::error::Elapsed> for LedgerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Codec(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

impl From<cledger_common::CommonError> for LedgerError {
    fn from(err: cledger_common::CommonError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Key/value capability shared by both ledger backends
#[async_trait]
pub trait LedgerStore: Send + Sync {
    fn mode(&self) -> LedgerMode;

    /// Write `value` under `key`. A repeated key silently overwrites.
    async fn put(&self, key: &str, value: Vec<u8>) -> LedgerResult<LedgerReceipt>;

    /// `Ok(None)` means the key was never written
    async fn get(&self, key: &str) -> LedgerResult<Option<LedgerEntry>>;

    /// Stream every entry whose key starts with `prefix`. Restart by calling again.
    async fn scan_prefix(&self, prefix: &str) -> LedgerResult<LedgerScan>;

    /// Publish an event. Delivery failures are logged, never returned.
    async fn emit(&self, event_name: &str, payload: Vec<u8>);
}

/// Choose the ledger backend for the lifetime of the process
pub async fn select_backend(config: &LedgerConfig) -> Arc<dyn LedgerStore> {
    match NetworkLedgerConfig::from_config(config) {
        Some(network_config) => {
            let gateway = network_config.gateway_url.clone();
            match NetworkLedger::connect(network_config).await {
                Ok(ledger) => {
                    info!(gateway = %gateway, ledger_mode = "network", "Connected to ledger gateway");
                    return Arc::new(ledger);
                },
                Err(e) => {
                    warn!(
                        gateway = %gateway,
                        error = %e,
                        "Ledger handshake failed, pinning process to the local ledger"
                    );
                },
            }
        },
        None => {
            info!("No ledger gateway credentials configured");
        },
    }

    info!(ledger_mode = "local", "Using local simulated ledger");
    Arc::new(LocalLedger::new())
}
