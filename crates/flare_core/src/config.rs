use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding the AI service key. Keys never touch disk.
pub const AI_API_KEY_ENV: &str = "FLARESTARTER_AI_API_KEY";

/// One row of the asset-ticker-to-token-address table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub ticker: String,
    pub name: String,
    /// Hex contract address. The zero address marks an unconfigured ticker.
    pub address: String,
}

impl TokenEntry {
    fn new(ticker: &str, name: &str, address: &str) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A configured price feed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFeedEntry {
    pub asset: String,
    pub price: f64,
    pub change_24h: f64,
}

/// Application configuration stored at `~/.flarestarter/config.json`.
///
/// The AI API key is skipped during serialization and only ever read from
/// [`AI_API_KEY_ENV`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterConfig {
    #[serde(skip)]
    pub ai_api_key: Option<String>,

    // Ledger
    pub network: String,
    pub custom_rpc_url: Option<String>,
    pub factory_address: String,
    pub fdc_verifier_address: String,
    pub tokens: Vec<TokenEntry>,

    // Transactions
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: Option<u64>,
    pub revoke_allowance_on_failure: bool,
    pub require_identity: bool,

    // Prices & advisory
    pub price_feeds: Vec<PriceFeedEntry>,
    pub ai_base_url: String,
    pub ai_model: String,

    // General
    pub log_level: String,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            network: "coston2".into(),
            custom_rpc_url: None,
            factory_address: "0x136Fc40F09eB9f7a51302558D6f290176Af9bB0d".into(),
            fdc_verifier_address: "0x0000000000000000000000000000000000000000".into(),
            tokens: vec![
                TokenEntry::new(
                    "F-BTC",
                    "Flare BTC",
                    "0x76E4b5DDD42BD84161f7f298D35723FbC576e861",
                ),
                TokenEntry::new(
                    "F-XRP",
                    "Flare XRP",
                    "0xBAf7dE33f98B018055EA5aCDfBDcA9be11780d06",
                ),
                TokenEntry::new(
                    "F-DOGE",
                    "Flare DOGE",
                    "0x0000000000000000000000000000000000000000",
                ),
                TokenEntry::new(
                    "F-LTC",
                    "Flare LTC",
                    "0x0000000000000000000000000000000000000000",
                ),
                TokenEntry::new(
                    "F-USDC",
                    "Flare USDC",
                    "0x94f41643DB84e373491aE358e24278a562307E30",
                ),
            ],
            receipt_poll_interval_ms: 1_500,
            receipt_timeout_secs: None,
            revoke_allowance_on_failure: false,
            require_identity: true,
            price_feeds: vec![
                PriceFeedEntry { asset: "F-BTC".into(), price: 68_000.50, change_24h: 2.5 },
                PriceFeedEntry { asset: "F-XRP".into(), price: 0.52, change_24h: -1.2 },
                PriceFeedEntry { asset: "F-DOGE".into(), price: 0.16, change_24h: 5.8 },
                PriceFeedEntry { asset: "F-LTC".into(), price: 85.30, change_24h: 1.1 },
                PriceFeedEntry { asset: "F-USDC".into(), price: 1.00, change_24h: 0.01 },
            ],
            ai_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
            ai_model: "gemini-2.5-flash".into(),
            log_level: "info".into(),
        }
    }
}

impl StarterConfig {
    /// Returns the base config directory: `~/.flarestarter/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".flarestarter"))
    }

    /// Returns the config file path: `~/.flarestarter/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.flarestarter/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing, then picks up
    /// the AI key from the environment.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        let mut config = Self::load_from_path(&path)?;
        config.ai_api_key = std::env::var(AI_API_KEY_ENV).ok().filter(|k| !k.is_empty());
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Saves config to disk (the AI key is excluded via `#[serde(skip)]`).
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Look up a token row by ticker (case-sensitive, e.g. `F-BTC`).
    pub fn token(&self, ticker: &str) -> Option<&TokenEntry> {
        self.tokens.iter().find(|t| t.ticker == ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_table() {
        let config = StarterConfig::default();
        assert_eq!(config.network, "coston2");
        assert_eq!(config.tokens.len(), 5);
        assert_eq!(
            config.token("F-BTC").unwrap().address,
            "0x76E4b5DDD42BD84161f7f298D35723FbC576e861"
        );
        assert!(config.token("F-DOGE").unwrap().address.ends_with("0000"));
        assert!(config.token("F-SOL").is_none());
        assert!(!config.revoke_allowance_on_failure);
        assert!(config.receipt_timeout_secs.is_none());
    }

    #[test]
    fn missing_file_creates_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let config = StarterConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.ai_model, "gemini-2.5-flash");
    }

    #[test]
    fn round_trips_through_disk_without_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let mut config = StarterConfig::default();
        config.ai_api_key = Some("secret".into());
        config.custom_rpc_url = Some("http://localhost:9650/ext/bc/C/rpc".into());
        config.revoke_allowance_on_failure = true;
        config.save_to_path(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));

        let loaded = StarterConfig::load_from_path(&path).unwrap();
        assert!(loaded.ai_api_key.is_none());
        assert!(loaded.revoke_allowance_on_failure);
        assert_eq!(loaded.custom_rpc_url, config.custom_rpc_url);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{ "network": "flare", "log_level": "debug" }"#).unwrap();

        let loaded = StarterConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.network, "flare");
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.tokens.len(), 5);
        assert_eq!(loaded.receipt_poll_interval_ms, 1_500);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = StarterConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }
}
