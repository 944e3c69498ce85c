use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::abi::{self, erc20_balance_of};
use crate::chain::Chain;
use crate::ledger::{Ledger, LedgerError};
use crate::tokens::TokenTable;
use crate::units::{PLATFORM_DECIMALS, format_units};

/// A single holding, raw and formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub raw: U256,
    pub formatted: String,
}

impl TokenBalance {
    fn new(symbol: &str, raw: U256) -> Self {
        Self {
            symbol: symbol.to_string(),
            raw,
            formatted: format_units(raw, PLATFORM_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalances {
    pub native: TokenBalance,
    pub tokens: Vec<TokenBalance>,
}

/// Native balance plus every configured token balance.
///
/// The native read and the token batch run concurrently. Token reads that
/// fail are left out; a failed native read fails the whole call.
pub async fn wallet_balances(
    ledger: &dyn Ledger,
    chain: Chain,
    tokens: &TokenTable,
    account: Address,
) -> Result<WalletBalances, LedgerError> {
    let assets: Vec<_> = tokens.configured().collect();
    let calls: Vec<_> = assets
        .iter()
        .map(|t| erc20_balance_of(t.address, account))
        .collect();

    let (native, token_outcomes) =
        futures::future::join(ledger.native_balance(account), ledger.call_batch(&calls)).await;
    let native = native?;

    let mut balances = Vec::new();
    match token_outcomes {
        Ok(outcomes) => {
            for (asset, outcome) in assets.iter().zip(outcomes) {
                match outcome
                    .and_then(|data| abi::decode_u256(&data).map_err(|e| e.to_string()))
                {
                    Ok(raw) => balances.push(TokenBalance::new(&asset.ticker, raw)),
                    Err(reason) => {
                        warn!(token = %asset.ticker, %reason, "token balance read failed");
                    }
                }
            }
        }
        Err(e) => warn!(error = %e, "token balance batch failed"),
    }

    Ok(WalletBalances {
        native: TokenBalance::new(chain.native_symbol(), native),
        tokens: balances,
    })
}
