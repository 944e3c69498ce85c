use ethers_core::types::Address;
use flare_core::{TokenEntry, StarterConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a ticker cannot be used for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown asset ticker: {0}")]
    Unknown(String),

    #[error("no token contract configured for {0}")]
    Unconfigured(String),

    #[error("invalid token address for {ticker}: {address}")]
    InvalidAddress { ticker: String, address: String },
}

/// A ticker and its token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetToken {
    pub ticker: String,
    pub name: String,
    /// `Address::zero()` when the ticker has no real deployment.
    pub address: Address,
}

impl AssetToken {
    pub fn is_configured(&self) -> bool {
        !self.address.is_zero()
    }
}

/// The hard-coded asset-ticker-to-contract-address table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenTable {
    tokens: Vec<AssetToken>,
}

impl TokenTable {
    pub fn from_entries(entries: &[TokenEntry]) -> Result<Self, TokenError> {
        let tokens = entries
            .iter()
            .map(|e| {
                let address = e.address.parse::<Address>().map_err(|_| {
                    TokenError::InvalidAddress {
                        ticker: e.ticker.clone(),
                        address: e.address.clone(),
                    }
                })?;
                Ok(AssetToken {
                    ticker: e.ticker.clone(),
                    name: e.name.clone(),
                    address,
                })
            })
            .collect::<Result<Vec<_>, TokenError>>()?;
        Ok(Self { tokens })
    }

    pub fn from_config(config: &StarterConfig) -> Result<Self, TokenError> {
        Self::from_entries(&config.tokens)
    }

    /// Every known ticker, configured or not.
    pub fn all(&self) -> &[AssetToken] {
        &self.tokens
    }

    pub fn get(&self, ticker: &str) -> Option<&AssetToken> {
        self.tokens.iter().find(|t| t.ticker == ticker)
    }

    /// Only tickers backed by a real token contract.
    pub fn configured(&self) -> impl Iterator<Item = &AssetToken> {
        self.tokens.iter().filter(|t| t.is_configured())
    }

    /// Resolve the token contract for a ticker that is about to be spent.
    ///
    /// Both an unknown ticker and a zero-address mapping are configuration
    /// errors; the caller must not prompt for any signature after either.
    pub fn resolve(&self, ticker: &str) -> Result<Address, TokenError> {
        let token = self
            .get(ticker)
            .ok_or_else(|| TokenError::Unknown(ticker.to_string()))?;
        if !token.is_configured() {
            return Err(TokenError::Unconfigured(ticker.to_string()));
        }
        Ok(token.address)
    }
}
