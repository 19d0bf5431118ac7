//! Ledger backends that mint transactions are submitted to
//!
//! - `MemoryLedger`: in-process pending pool for development and tests
//! - `RpcLedger`: a node's JSON-RPC endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wormhole_common::{quantity, Address, Error, Result, TxHash};

use crate::transaction::SignedTransaction;

/// Submission failure, split by whether the ledger may hold the transaction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The ledger refused the transaction; it will never be included
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// No definite answer; the transaction may or may not have been accepted
    #[error("transaction submission outcome unknown: {0}")]
    Indeterminate(String),
}

/// Backing ledger the issuer talks to
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Chain id used as the signing domain
    async fn chain_id(&self) -> Result<u64>;

    /// Next nonce of `address`, counting pending transactions
    async fn next_nonce(&self, address: &Address) -> Result<u64>;

    /// Submit a signed transaction
    async fn submit(&self, tx: &SignedTransaction) -> std::result::Result<TxHash, SubmitError>;
}

#[derive(Debug, Default)]
struct PoolState {
    nonces: HashMap<Address, u64>,
    transactions: Vec<SignedTransaction>,
}

/// In-process ledger
///
/// Accepts a transaction only if it is signed for this chain and carries
/// exactly the next nonce of its recovered sender.
#[derive(Debug)]
pub struct MemoryLedger {
    chain_id: u64,
    state: Mutex<PoolState>,
}

impl MemoryLedger {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Accepted transactions, in submission order
    pub async fn transactions(&self) -> Vec<SignedTransaction> {
        self.state.lock().await.transactions.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn next_nonce(&self, address: &Address) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.nonces.get(address).copied().unwrap_or(0))
    }

    async fn submit(&self, tx: &SignedTransaction) -> std::result::Result<TxHash, SubmitError> {
        if tx.chain_id() != Some(self.chain_id) {
            return Err(SubmitError::Rejected(format!(
                "invalid chain id: expected {}, got {:?}",
                self.chain_id,
                tx.chain_id()
            )));
        }

        let sender = tx
            .recover_sender()
            .map_err(|e| SubmitError::Rejected(format!("invalid sender: {}", e)))?;

        let mut state = self.state.lock().await;
        if state.transactions.iter().any(|known| known.hash() == tx.hash()) {
            return Err(SubmitError::Rejected(format!("already known: {}", tx.hash())));
        }

        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if tx.nonce() != expected {
            return Err(SubmitError::Rejected(format!(
                "nonce mismatch for {}: expected {}, got {}",
                sender,
                expected,
                tx.nonce()
            )));
        }

        state.nonces.insert(sender, expected + 1);
        state.transactions.push(tx.clone());
        debug!("Accepted transaction {} (nonce {}) from {}", tx.hash(), expected, sender);

        Ok(tx.hash())
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC ledger client
pub struct RpcLedger {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Create a new client
    ///
    /// # Arguments
    /// * `url` - Node JSON-RPC endpoint (e.g., "http://localhost:8545")
    pub fn new(url: String) -> Self {
        info!("Using JSON-RPC ledger at {}", url);
        Self {
            url,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Perform one call. A node-side error object is a definite rejection;
    /// anything else that goes wrong leaves the outcome unknown.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, SubmitError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("JSON-RPC call {} to {}", method, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubmitError::Indeterminate(format!("{} failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(SubmitError::Indeterminate(format!(
                "{} failed: HTTP {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            SubmitError::Indeterminate(format!("failed to parse {} response: {}", method, e))
        })?;

        if let Some(err) = body.error {
            return Err(SubmitError::Rejected(format!(
                "{} error {}: {}",
                method, err.code, err.message
            )));
        }

        body.result
            .ok_or_else(|| SubmitError::Indeterminate(format!("{} returned no result", method)))
    }

    async fn call_u64(&self, method: &str, params: serde_json::Value) -> Result<u64> {
        let value = self
            .call(method, params)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;
        let text = value
            .as_str()
            .ok_or_else(|| Error::Backend(format!("{} returned a non-string result", method)))?;
        let parsed = quantity::parse_uint(text)?;
        u64::try_from(&parsed)
            .map_err(|_| Error::Backend(format!("{} result out of range: {}", method, text)))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn chain_id(&self) -> Result<u64> {
        self.call_u64("eth_chainId", serde_json::json!([])).await
    }

    async fn next_nonce(&self, address: &Address) -> Result<u64> {
        self.call_u64(
            "eth_getTransactionCount",
            serde_json::json!([address.to_hex(), "pending"]),
        )
        .await
    }

    async fn submit(&self, tx: &SignedTransaction) -> std::result::Result<TxHash, SubmitError> {
        let raw = format!("0x{}", hex::encode(tx.raw()));
        let result = self
            .call("eth_sendRawTransaction", serde_json::json!([raw]))
            .await?;

        // Accepted at this point; the locally computed hash is authoritative
        match result.as_str().map(TxHash::from_hex) {
            Some(Ok(hash)) if hash == tx.hash() => {}
            Some(Ok(hash)) => warn!("Node reported hash {} for transaction {}", hash, tx.hash()),
            _ => warn!("Node returned an unexpected result for {}: {}", tx.hash(), result),
        }

        Ok(tx.hash())
    }
}
