#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::abi::{Token, encode};
use ethers_core::types::{Address, Bytes, H256, U256};
use parking_lot::Mutex;
use tokio::sync::Notify;

use flare_chain::{CallOutcome, ContractCall, Ledger, LedgerError, TxReceipt, Wallet};

/// Shared, ordered record of every interaction with the mocks.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

// -- Ledger ------------------------------------------------------------

#[derive(Default)]
pub struct MockLedger {
    pub journal: Journal,
    responses: Mutex<HashMap<(Address, String), CallOutcome>>,
    reverted: Mutex<HashSet<H256>>,
    lost: Mutex<HashSet<H256>>,
    transport_down: Mutex<bool>,
    native_down: Mutex<bool>,
    pub batches: Mutex<Vec<Vec<ContractCall>>>,
}

impl MockLedger {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn respond(&self, to: Address, function: &str, outcome: CallOutcome) {
        self.responses.lock().insert((to, function.to_string()), outcome);
    }

    pub fn respond_tokens(&self, to: Address, function: &str, tokens: &[Token]) {
        self.respond(to, function, Ok(Bytes::from(encode(tokens))));
    }

    pub fn revert_receipt(&self, tx_hash: H256) {
        self.reverted.lock().insert(tx_hash);
    }

    /// The receipt for `tx_hash` never shows up.
    pub fn lose_receipt(&self, tx_hash: H256) {
        self.lost.lock().insert(tx_hash);
    }

    pub fn set_transport_down(&self, down: bool) {
        *self.transport_down.lock() = down;
    }

    pub fn set_native_down(&self, down: bool) {
        *self.native_down.lock() = down;
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn call_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, LedgerError> {
        if *self.transport_down.lock() {
            return Err(LedgerError::Network("connection refused".into()));
        }
        self.journal.push(format!("batch:{}", calls.len()));
        self.batches.lock().push(calls.to_vec());
        let responses = self.responses.lock();
        Ok(calls
            .iter()
            .map(|c| {
                responses
                    .get(&(c.to, c.function.clone()))
                    .cloned()
                    .unwrap_or_else(|| Err("execution reverted".into()))
            })
            .collect())
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt, LedgerError> {
        self.journal.push(format!("receipt:{}", tx_hash.to_low_u64_be()));
        if self.lost.lock().contains(&tx_hash) {
            return Err(LedgerError::Timeout(tx_hash));
        }
        Ok(TxReceipt {
            tx_hash,
            success: !self.reverted.lock().contains(&tx_hash),
            block_number: Some(1),
            gas_used: None,
        })
    }

    async fn native_balance(&self, _account: Address) -> Result<U256, LedgerError> {
        self.journal.push("native");
        if *self.native_down.lock() {
            return Err(LedgerError::Network("connection reset".into()));
        }
        Ok(U256::exp10(18))
    }
}

// -- Wallet ------------------------------------------------------------

#[derive(Default)]
pub struct MockWallet {
    pub journal: Journal,
    account: Option<Address>,
    pub sent: Mutex<Vec<ContractCall>>,
    rejected: Mutex<HashSet<String>>,
    next_hash: Mutex<u64>,
    /// When set, every send waits for a notification first.
    hold: Option<Arc<Notify>>,
}

impl MockWallet {
    pub fn connected(journal: Journal, account: Address) -> Self {
        Self {
            journal,
            account: Some(account),
            ..Default::default()
        }
    }

    pub fn disconnected(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn holding(mut self, hold: Arc<Notify>) -> Self {
        self.hold = Some(hold);
        self
    }

    /// The user will decline prompts for `function`.
    pub fn reject(&self, function: &str) {
        self.rejected.lock().insert(function.to_string());
    }

    pub fn sent_functions(&self) -> Vec<String> {
        self.sent.lock().iter().map(|c| c.function.clone()).collect()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn send_transaction(&self, call: &ContractCall) -> Result<H256, LedgerError> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.journal.push(format!("send:{}", call.function));
        self.sent.lock().push(call.clone());
        if self.rejected.lock().contains(&call.function) {
            return Err(LedgerError::from_rpc(4001, "User rejected the request."));
        }
        let mut next = self.next_hash.lock();
        *next += 1;
        Ok(H256::from_low_u64_be(*next))
    }
}
