//! JSON-RPC implementations of [`Ledger`] and [`Wallet`].
//!
//! Batched reads are sent as one JSON-RPC batch of `eth_call`s; each entry
//! carries its own result or error so partial failure is preserved.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U64, U256};
use flare_core::StarterConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::abi::ContractCall;
use crate::ledger::{CallOutcome, Ledger, LedgerError, TxReceipt, Wallet};
use crate::rpc_config::RpcConfigStore;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptWire {
    transaction_hash: H256,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    gas_used: Option<U256>,
}

impl From<ReceiptWire> for TxReceipt {
    fn from(w: ReceiptWire) -> Self {
        Self {
            tx_hash: w.transaction_hash,
            // Pre-Byzantium receipts have no status; treat them as success.
            success: w.status.is_none_or(|s| s == U64::one()),
            block_number: w.block_number.map(|b| b.as_u64()),
            gas_used: w.gas_used,
        }
    }
}

fn call_object(call: &ContractCall, from: Option<Address>) -> Value {
    let mut obj = json!({ "to": call.to, "data": call.data });
    if let Some(from) = from {
        obj["from"] = json!(from);
    }
    obj
}

/// Build the JSON body for a batch of `eth_call`s with ids starting at `first_id`.
fn build_call_batch(calls: &[ContractCall], first_id: u64) -> Value {
    Value::Array(
        calls
            .iter()
            .enumerate()
            .map(|(i, call)| {
                json!({
                    "jsonrpc": "2.0",
                    "id": first_id + i as u64,
                    "method": "eth_call",
                    "params": [call_object(call, None), "latest"],
                })
            })
            .collect(),
    )
}

/// Re-order batch responses by id and convert each into a [`CallOutcome`].
/// Entries the node dropped become per-call failures.
fn collate_batch(
    responses: Vec<RpcResponse>,
    first_id: u64,
    len: usize,
) -> Vec<CallOutcome> {
    let mut out: Vec<CallOutcome> = vec![Err("missing from batch response".into()); len];
    for resp in responses {
        let Some(idx) = resp.id.checked_sub(first_id).map(|i| i as usize) else {
            continue;
        };
        if idx >= len {
            continue;
        }
        out[idx] = match (resp.result, resp.error) {
            (_, Some(err)) => Err(err.message),
            (Some(value), None) => serde_json::from_value::<Bytes>(value)
                .map_err(|e| format!("invalid call result: {e}")),
            (None, None) => Err("empty call result".into()),
        };
    }
    out
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Shared HTTP JSON-RPC transport.
#[derive(Debug)]
pub struct RpcTransport {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Network(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn reserve_ids(&self, count: usize) -> u64 {
        self.next_id.fetch_add(count.max(1) as u64, Ordering::Relaxed)
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LedgerError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Rpc {
                code: i64::from(status.as_u16()),
                message: format!("RPC endpoint returned {status}: {text}"),
            });
        }
        Ok(resp)
    }

    /// Single JSON-RPC request.
    pub async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let id = self.reserve_ids(1);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let resp: RpcResponse = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        if let Some(err) = resp.error {
            return Err(LedgerError::from_rpc(err.code, err.message));
        }
        let value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| LedgerError::Malformed(format!("{method}: {e}")))
    }

    async fn call_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, LedgerError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let first_id = self.reserve_ids(calls.len());
        let body = build_call_batch(calls, first_id);
        let responses: Vec<RpcResponse> = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        Ok(collate_batch(responses, first_id, calls.len()))
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// [`Ledger`] backed by an HTTP JSON-RPC node.
pub struct JsonRpcLedger {
    transport: Arc<RpcTransport>,
    poll_interval: Duration,
    receipt_timeout: Option<Duration>,
}

impl JsonRpcLedger {
    pub fn new(transport: Arc<RpcTransport>, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
            receipt_timeout: None,
        }
    }

    pub fn with_receipt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Build a ledger for the configured network and RPC override.
    pub fn from_config(config: &StarterConfig) -> anyhow::Result<Self> {
        let (store, chain) = RpcConfigStore::from_config(config)?;
        let rpc = store
            .get_rpc(chain)
            .ok_or_else(|| anyhow::anyhow!("no RPC endpoint for {chain}"))?;
        let transport = RpcTransport::new(rpc.url.clone(), rpc.timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            Duration::from_millis(config.receipt_poll_interval_ms),
        )
        .with_receipt_timeout(config.receipt_timeout_secs.map(Duration::from_secs)))
    }

    pub fn transport(&self) -> Arc<RpcTransport> {
        Arc::clone(&self.transport)
    }

    async fn poll_receipt(&self, tx_hash: H256) -> Result<TxReceipt, LedgerError> {
        loop {
            let receipt: Option<ReceiptWire> = self
                .transport
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(r) = receipt {
                return Ok(r.into());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Ledger for JsonRpcLedger {
    async fn call_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, LedgerError> {
        debug!(count = calls.len(), url = %self.transport.url(), "eth_call batch");
        let out = self.transport.call_batch(calls).await?;
        let failed = out.iter().filter(|o| o.is_err()).count();
        if failed > 0 {
            warn!(failed, total = out.len(), "batched read had failing calls");
        }
        Ok(out)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt, LedgerError> {
        match self.receipt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_receipt(tx_hash))
                .await
                .map_err(|_| LedgerError::Timeout(tx_hash))?,
            None => self.poll_receipt(tx_hash).await,
        }
    }

    async fn native_balance(&self, account: Address) -> Result<U256, LedgerError> {
        self.transport
            .request("eth_getBalance", json!([account, "latest"]))
            .await
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// [`Wallet`] that forwards `eth_sendTransaction` to an endpoint holding the
/// account's keys (a wallet bridge or an unlocked development node).
pub struct JsonRpcWallet {
    transport: Arc<RpcTransport>,
    account: Option<Address>,
}

impl JsonRpcWallet {
    pub fn new(transport: Arc<RpcTransport>, account: Option<Address>) -> Self {
        Self { transport, account }
    }

    pub fn disconnect(&mut self) {
        self.account = None;
    }
}

#[async_trait]
impl Wallet for JsonRpcWallet {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<H256, LedgerError> {
        let from = self.account.ok_or(LedgerError::NotConnected)?;
        self.transport
            .request("eth_sendTransaction", json!([call_object(call, Some(from))]))
            .await
    }
}
