//! Ledger REST gateway client
//!
//! Talks to a permissioned-ledger gateway exposing one chaincode's world state:
//!
//! | Call            | Request                                                   |
//! |-----------------|-----------------------------------------------------------|
//! | handshake       | `GET  {gateway}/health`                                   |
//! | `put`           | `PUT  {contract}/state/{key}` (raw JSON body)             |
//! | `get`           | `GET  {contract}/state/{key}`                             |
//! | `scan_prefix`   | `GET  {contract}/state?prefix=&pageSize=&bookmark=`       |
//! | `emit`          | `POST {contract}/events`                                  |
//!
//! where `{contract}` is `{gateway}/channels/{channel}/chaincodes/{chaincode}`.
//! Values travel base64-encoded in responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use super::{
    LedgerEntry, LedgerError, LedgerMode, LedgerReceipt, LedgerResult, LedgerScan, LedgerStore,
};
use crate::config::LedgerConfig;

/// Connection settings for [`NetworkLedger`]
#[derive(Debug, Clone)]
pub struct NetworkLedgerConfig {
    pub gateway_url: String,
    pub api_token: String,
    pub channel: String,
    pub chaincode: String,
    pub timeout: Duration,
    pub max_connections: usize,
    pub page_size: u32,
}

impl NetworkLedgerConfig {
    /// `None` unless both the gateway URL and the API token are configured
    pub fn from_config(config: &LedgerConfig) -> Option<Self> {
        let gateway_url = config.gateway_url.clone()?;
        let api_token = config.api_token.clone()?;

        Some(Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            api_token,
            channel: config.channel.clone(),
            chaincode: config.chaincode.clone(),
            timeout: config.timeout(),
            max_connections: config.max_connections,
            page_size: config.page_size,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutStateResponse {
    tx_id: String,
    #[serde(default)]
    block_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateEntry {
    key: String,
    value: String,
    #[serde(default)]
    tx_id: Option<String>,
}

impl StateEntry {
    fn into_entry(self) -> LedgerResult<LedgerEntry> {
        let value = STANDARD
            .decode(self.value.as_bytes())
            .map_err(|e| LedgerError::Codec(format!("value of '{}' is not base64: {}", self.key, e)))?;
        Ok(LedgerEntry {
            key: self.key,
            value,
            proof: self.tx_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StatePage {
    #[serde(default)]
    entries: Vec<StateEntry>,
    #[serde(default)]
    bookmark: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventRequest<'a> {
    name: &'a str,
    payload: String,
}

/// Shared request plumbing, cloned into scan streams
#[derive(Debug)]
struct Gateway {
    client: Client,
    /// One permit per in-flight request
    in_flight: Semaphore,
    health_url: String,
    contract_url: String,
    api_token: String,
    page_size: u32,
}

impl Gateway {
    async fn permit(&self) -> LedgerResult<SemaphorePermit<'_>> {
        self.in_flight
            .acquire()
            .await
            .map_err(|_| LedgerError::Unavailable("ledger client is shut down".to_string()))
    }

    fn state_url(&self) -> String {
        format!("{}/state", self.contract_url)
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/state/{}", self.contract_url, key)
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.contract_url)
    }

    async fn fetch_page(&self, prefix: &str, bookmark: Option<&str>) -> LedgerResult<StatePage> {
        let page_size = self.page_size.to_string();
        let mut query = vec![("prefix", prefix), ("pageSize", page_size.as_str())];
        if let Some(bookmark) = bookmark {
            query.push(("bookmark", bookmark));
        }

        let _permit = self.permit().await?;
        let response = self
            .client
            .get(self.state_url())
            .bearer_auth(&self.api_token)
            .query(&query)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

/// Position of a paged scan
#[derive(Debug)]
enum Cursor {
    Start,
    Bookmark(String),
    Done,
}

async fn next_page(
    gateway: Arc<Gateway>,
    prefix: String,
    cursor: Cursor,
) -> LedgerResult<Option<(Vec<LedgerEntry>, Cursor)>> {
    let bookmark = match cursor {
        Cursor::Start => None,
        Cursor::Bookmark(mark) => Some(mark),
        Cursor::Done => return Ok(None),
    };

    let page = gateway.fetch_page(&prefix, bookmark.as_deref()).await?;
    let entries = page
        .entries
        .into_iter()
        .map(StateEntry::into_entry)
        .collect::<LedgerResult<Vec<_>>>()?;

    // An empty page ends the scan even if the gateway hands back a bookmark.
    let next = match page.bookmark {
        Some(mark) if !mark.is_empty() && !entries.is_empty() => Cursor::Bookmark(mark),
        _ => Cursor::Done,
    };

    Ok(Some((entries, next)))
}

async fn ensure_success(response: Response) -> LedgerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(LedgerError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// [`LedgerStore`] backed by the ledger gateway
pub struct NetworkLedger {
    gateway: Arc<Gateway>,
}

impl NetworkLedger {
    /// Build the client without contacting the gateway
    ///
    /// At most `max_connections` requests are in flight at once; further
    /// calls wait for a free slot.
    pub fn new(config: NetworkLedgerConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_connections)
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        let contract_url = format!(
            "{}/channels/{}/chaincodes/{}",
            config.gateway_url, config.channel, config.chaincode
        );

        Ok(Self {
            gateway: Arc::new(Gateway {
                client,
                in_flight: Semaphore::new(config.max_connections.max(1)),
                health_url: format!("{}/health", config.gateway_url),
                contract_url,
                api_token: config.api_token,
                page_size: config.page_size.max(1),
            }),
        })
    }

    /// Build the client and verify the gateway answers its health check
    pub async fn connect(config: NetworkLedgerConfig) -> LedgerResult<Self> {
        let ledger = Self::new(config)?;
        ledger.handshake().await?;
        Ok(ledger)
    }

    pub async fn handshake(&self) -> LedgerResult<()> {
        let _permit = self.gateway.permit().await?;
        let response = self
            .gateway
            .client
            .get(&self.gateway.health_url)
            .bearer_auth(&self.gateway.api_token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for NetworkLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Network
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> LedgerResult<LedgerReceipt> {
        let _permit = self.gateway.permit().await?;
        let response = self
            .gateway
            .client
            .put(self.gateway.key_url(key))
            .bearer_auth(&self.gateway.api_token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(value)
            .send()
            .await?;

        let committed: PutStateResponse = ensure_success(response).await?.json().await?;
        debug!(
            key,
            tx_id = %committed.tx_id,
            block = ?committed.block_number,
            "Ledger write committed"
        );

        Ok(LedgerReceipt {
            key: key.to_string(),
            proof: committed.tx_id,
        })
    }

    async fn get(&self, key: &str) -> LedgerResult<Option<LedgerEntry>> {
        let _permit = self.gateway.permit().await?;
        let response = self
            .gateway
            .client
            .get(self.gateway.key_url(key))
            .bearer_auth(&self.gateway.api_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entry: StateEntry = ensure_success(response).await?.json().await?;
        entry.into_entry().map(Some)
    }

    async fn scan_prefix(&self, prefix: &str) -> LedgerResult<LedgerScan> {
        let gateway = Arc::clone(&self.gateway);
        let prefix = prefix.to_string();

        let pages = stream::try_unfold(Cursor::Start, move |cursor| {
            next_page(Arc::clone(&gateway), prefix.clone(), cursor)
        });

        Ok(pages
            .map_ok(|entries| stream::iter(entries.into_iter().map(Ok)))
            .try_flatten()
            .boxed())
    }

    async fn emit(&self, event_name: &str, payload: Vec<u8>) {
        let body = EventRequest {
            name: event_name,
            payload: STANDARD.encode(payload),
        };

        let _permit = match self.gateway.permit().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(event = event_name, error = %e, "Failed to emit ledger event");
                return;
            },
        };
        let result = self
            .gateway
            .client
            .post(self.gateway.events_url())
            .bearer_auth(&self.gateway.api_token)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(event = event_name, "Ledger event emitted");
            },
            Ok(response) => {
                warn!(event = event_name, status = %response.status(), "Ledger rejected event");
            },
            Err(e) => {
                warn!(event = event_name, error = %e, "Failed to emit ledger event");
            },
        }
    }
}
