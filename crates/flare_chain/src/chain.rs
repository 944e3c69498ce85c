use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Supported Flare-family networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Flare,
    Songbird,
    Coston2,
}

impl Chain {
    /// Human-readable label for the chain.
    pub fn label(&self) -> &'static str {
        match self {
            Chain::Flare => "Flare Mainnet",
            Chain::Songbird => "Songbird Canary-Network",
            Chain::Coston2 => "Flare Testnet Coston2",
        }
    }

    /// EVM chain ID.
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Flare => 14,
            Chain::Songbird => 19,
            Chain::Coston2 => 114,
        }
    }

    /// Ticker of the native gas token.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Flare => "FLR",
            Chain::Songbird => "SGB",
            Chain::Coston2 => "C2FLR",
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Chain::Coston2)
    }

    /// Built-in endpoint and explorer for this chain.
    pub fn config(&self) -> &'static ChainConfig {
        // Every variant is inserted in CHAIN_CONFIGS.
        &CHAIN_CONFIGS[self]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flare" => Ok(Chain::Flare),
            "songbird" => Ok(Chain::Songbird),
            "coston2" | "flare-testnet" => Ok(Chain::Coston2),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Network-specific configuration for a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: String,
}

impl ChainConfig {
    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url)
    }
}

static CHAIN_CONFIGS: Lazy<HashMap<Chain, ChainConfig>> = Lazy::new(get_chain_configs);

/// Returns default chain configurations for all supported networks.
pub fn get_chain_configs() -> HashMap<Chain, ChainConfig> {
    let mut configs = HashMap::new();

    configs.insert(
        Chain::Flare,
        ChainConfig {
            name: "Flare Mainnet".to_string(),
            chain_id: 14,
            rpc_url: "https://flare-api.flare.network/ext/C/rpc".to_string(),
            explorer_url: "https://flare-explorer.flare.network".to_string(),
        },
    );

    configs.insert(
        Chain::Songbird,
        ChainConfig {
            name: "Songbird Canary-Network".to_string(),
            chain_id: 19,
            rpc_url: "https://songbird-api.flare.network/ext/C/rpc".to_string(),
            explorer_url: "https://songbird-explorer.flare.network".to_string(),
        },
    );

    configs.insert(
        Chain::Coston2,
        ChainConfig {
            name: "Flare Testnet Coston2".to_string(),
            chain_id: 114,
            rpc_url: "https://coston2-api.flare.network/ext/C/rpc".to_string(),
            explorer_url: "https://coston2-explorer.flare.network".to_string(),
        },
    );

    configs
}
