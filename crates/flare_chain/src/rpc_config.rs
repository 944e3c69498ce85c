//! JSON-RPC endpoint selection: the built-in node for each network, with a
//! user-supplied override for the active one.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, bail};
use flare_core::StarterConfig;
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, get_chain_configs};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSource {
    Builtin,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub chain: Chain,
    pub url: String,
    pub source: EndpointSource,
    pub timeout: Duration,
}

impl RpcEndpoint {
    fn builtin(chain: Chain, url: String) -> Self {
        Self {
            chain,
            url,
            source: EndpointSource::Builtin,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.source == EndpointSource::Custom
    }
}

#[derive(Debug, Clone)]
pub struct RpcConfigStore {
    endpoints: HashMap<Chain, RpcEndpoint>,
}

impl Default for RpcConfigStore {
    fn default() -> Self {
        Self {
            endpoints: get_chain_configs()
                .into_iter()
                .map(|(chain, cc)| (chain, RpcEndpoint::builtin(chain, cc.rpc_url)))
                .collect(),
        }
    }
}

impl RpcConfigStore {
    /// Endpoints for the configured network, plus the network itself.
    pub fn from_config(config: &StarterConfig) -> anyhow::Result<(Self, Chain)> {
        let chain: Chain = config
            .network
            .parse()
            .map_err(anyhow::Error::msg)
            .context("invalid `network` in config")?;
        let mut store = Self::default();
        if let Some(url) = config.custom_rpc_url.as_deref().filter(|u| !u.is_empty()) {
            store.set_custom_rpc(chain, url)?;
        }
        Ok((store, chain))
    }

    pub fn get_rpc(&self, chain: Chain) -> Option<&RpcEndpoint> {
        self.endpoints.get(&chain)
    }

    /// Point `chain` at a custom node. Only `http`/`https` URLs with a host
    /// are accepted.
    pub fn set_custom_rpc(&mut self, chain: Chain, url: &str) -> anyhow::Result<()> {
        if !validate_url(url) {
            bail!("invalid RPC URL: {url}");
        }
        self.endpoints.insert(
            chain,
            RpcEndpoint {
                chain,
                url: url.to_string(),
                source: EndpointSource::Custom,
                timeout: REQUEST_TIMEOUT,
            },
        );
        Ok(())
    }

    pub fn reset_to_default(&mut self, chain: Chain) {
        self.endpoints
            .insert(chain, RpcEndpoint::builtin(chain, chain.config().rpc_url.clone()));
    }
}

pub fn validate_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}
