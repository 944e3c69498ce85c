//! The ledger read/write boundary.
//!
//! [`Ledger`] covers reads and receipt observation; [`Wallet`] is the
//! externally owned signing session. Both are injected handles so tests can
//! substitute in-memory versions and record every interaction.

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};
use flare_core::{ErrorCategory, UserFacing};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abi::ContractCall;

/// EIP-1193 code a wallet returns when the user declines a prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors any ledger or wallet operation may return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("User rejected the request")]
    UserRejected,

    #[error("Transaction {tx_hash:?} reverted: {reason}")]
    Reverted { tx_hash: H256, reason: String },

    #[error("No wallet connected")]
    NotConnected,

    #[error("Timed out waiting for {0:?}")]
    Timeout(H256),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Map a JSON-RPC error object, recognising wallet rejections.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            Self::UserRejected
        } else {
            Self::Rpc {
                code,
                message: message.into(),
            }
        }
    }
}

impl UserFacing for LedgerError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,
            Self::Rpc { .. } | Self::Malformed(_) => ErrorCategory::Service,
            Self::UserRejected => ErrorCategory::UserRejected,
            Self::Reverted { .. } => ErrorCategory::Reverted,
            Self::NotConnected => ErrorCategory::Precondition,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".into(),
            Self::Timeout(_) => "The transaction is taking longer than expected.".into(),
            Self::Rpc { message, .. } => message.clone(),
            Self::Malformed(_) => "The network returned an unexpected response.".into(),
            Self::UserRejected => "You rejected the request in your wallet.".into(),
            Self::Reverted { reason, .. } => reason.clone(),
            Self::NotConnected => "Connect your wallet to continue.".into(),
        }
    }
}

/// Outcome of one call inside a batched read. Each call fails or succeeds
/// independently of its neighbours.
pub type CallOutcome = Result<Bytes, String>;

/// Mined transaction receipt, reduced to what the flows need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Read side of the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Execute every call as one batch. The returned vector has exactly one
    /// outcome per input call, in input order.
    async fn call_batch(&self, calls: &[ContractCall]) -> Result<Vec<CallOutcome>, LedgerError>;

    /// Poll until the transaction is mined and return its receipt.
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt, LedgerError>;

    /// Native gas-token balance.
    async fn native_balance(&self, account: Address) -> Result<U256, LedgerError>;

    /// Single call convenience built on [`Ledger::call_batch`].
    async fn call(&self, call: &ContractCall) -> Result<Bytes, LedgerError> {
        let mut out = self.call_batch(std::slice::from_ref(call)).await?;
        match out.pop() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(reason)) => Err(LedgerError::Rpc {
                code: -32000,
                message: reason,
            }),
            None => Err(LedgerError::Malformed("empty batch response".into())),
        }
    }
}

/// The connected signing session. Owned by the wallet integration; this
/// crate only submits transactions through it.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Connected account, or `None` when no session exists.
    fn account(&self) -> Option<Address>;

    /// Ask the wallet to sign and broadcast a transaction.
    async fn send_transaction(&self, call: &ContractCall) -> Result<H256, LedgerError>;
}

/// Why [`submit_and_confirm`] did not produce a successful receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Nothing was broadcast, or the transaction was mined and reverted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Broadcast, but the receipt could not be observed. The transaction may
    /// still be mined.
    #[error("Transaction {tx_hash:?} submitted but not confirmed: {source}")]
    Unconfirmed { tx_hash: H256, source: LedgerError },
}

impl From<SubmitError> for LedgerError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Ledger(e) | SubmitError::Unconfirmed { source: e, .. } => e,
        }
    }
}

/// Submit a transaction and wait for it to be mined successfully.
///
/// `on_submitted` runs once the wallet has returned a hash. Any failure while
/// waiting for the receipt becomes [`SubmitError::Unconfirmed`]; a receipt
/// with a failure status becomes [`LedgerError::Reverted`].
pub async fn submit_and_confirm(
    ledger: &dyn Ledger,
    wallet: &dyn Wallet,
    call: &ContractCall,
    on_submitted: impl FnOnce(H256) + Send,
) -> Result<TxReceipt, SubmitError> {
    let tx_hash = wallet.send_transaction(call).await?;
    tracing::debug!(function = %call.function, to = ?call.to, ?tx_hash, "transaction submitted");
    on_submitted(tx_hash);
    let receipt = ledger
        .wait_for_receipt(tx_hash)
        .await
        .map_err(|source| SubmitError::Unconfirmed { tx_hash, source })?;
    if !receipt.success {
        return Err(LedgerError::Reverted {
            tx_hash,
            reason: format!("{} reverted on-chain", call.function),
        }
        .into());
    }
    Ok(receipt)
}

/// [`submit_and_confirm`] for callers that do not track the pending hash.
pub async fn send_and_confirm(
    ledger: &dyn Ledger,
    wallet: &dyn Wallet,
    call: &ContractCall,
) -> Result<TxReceipt, LedgerError> {
    submit_and_confirm(ledger, wallet, call, |_| {})
        .await
        .map_err(LedgerError::from)
}
