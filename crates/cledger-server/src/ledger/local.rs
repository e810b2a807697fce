//! In-process simulated ledger
//!
//! Entries live in a `BTreeMap`, so key order is storage order. Every write
//! gets a synthetic `sim-tx-<hex>` proof derived from the key, the value and a
//! monotonically increasing write sequence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{LedgerEntry, LedgerMode, LedgerReceipt, LedgerResult, LedgerScan, LedgerStore};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event published through [`LedgerStore::emit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct StoredEntry {
    value: Vec<u8>,
    proof: String,
}

#[derive(Debug, Default)]
struct LocalState {
    entries: BTreeMap<String, StoredEntry>,
    sequence: u64,
}

pub struct LocalLedger {
    state: RwLock<LocalState>,
    events: broadcast::Sender<LedgerEvent>,
}

impl LocalLedger {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(LocalState::default()),
            events,
        }
    }

    /// Receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

impl Default for LocalLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn simulated_proof(key: &str, value: &[u8], sequence: u64) -> String {
    let digest = Sha256::new()
        .chain_update(key.as_bytes())
        .chain_update([0u8])
        .chain_update(value)
        .chain_update(sequence.to_be_bytes())
        .finalize();
    format!("sim-tx-{}", hex::encode(&digest[..8]))
}

#[async_trait]
impl LedgerStore for LocalLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Local
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LedgerResult<LedgerReceipt> {
        let mut state = self.state.write().await;
        state.sequence += 1;
        let proof = simulated_proof(key, &value, state.sequence);

        state.entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                proof: proof.clone(),
            },
        );

        debug!(key, proof = %proof, "Local ledger write committed");
        Ok(LedgerReceipt {
            key: key.to_string(),
            proof,
        })
    }

    async fn get(&self, key: &str) -> LedgerResult<Option<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).map(|stored| LedgerEntry {
            key: key.to_string(),
            value: stored.value.clone(),
            proof: Some(stored.proof.clone()),
        }))
    }

    async fn scan_prefix(&self, prefix: &str) -> LedgerResult<LedgerScan> {
        // Snapshot under the read lock so the stream does not hold it.
        let state = self.state.read().await;
        let entries: Vec<LedgerEntry> = state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, stored)| LedgerEntry {
                key: key.clone(),
                value: stored.value.clone(),
                proof: Some(stored.proof.clone()),
            })
            .collect();

        Ok(stream::iter(entries.into_iter().map(Ok)).boxed())
    }

    async fn emit(&self, event_name: &str, payload: Vec<u8>) {
        let event = LedgerEvent {
            name: event_name.to_string(),
            payload,
        };
        if self.events.send(event).is_err() {
            debug!(event = event_name, "No local ledger listeners for event");
        }
    }
}
