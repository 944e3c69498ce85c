//! Asset price feeds and USD estimates.

use std::collections::HashMap;

use async_trait::async_trait;
use flare_core::{PriceFeedEntry, StarterConfig};
use serde::{Deserialize, Serialize};

/// Latest price for one asset ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFeed {
    pub asset: String,
    pub price: f64,
    /// 24h change in percent.
    pub change_24h: f64,
}

impl PriceFeed {
    pub fn is_up(&self) -> bool {
        self.change_24h >= 0.0
    }
}

impl From<&PriceFeedEntry> for PriceFeed {
    fn from(e: &PriceFeedEntry) -> Self {
        Self {
            asset: e.asset.clone(),
            price: e.price,
            change_24h: e.change_24h,
        }
    }
}

/// Anything that can quote an asset price.
#[async_trait]
pub trait PriceFeedSource: Send + Sync {
    async fn latest(&self, asset: &str) -> Option<PriceFeed>;

    async fn all(&self) -> Vec<PriceFeed>;
}

/// Static price table loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct PriceFeedBook {
    order: Vec<String>,
    feeds: HashMap<String, PriceFeed>,
}

impl PriceFeedBook {
    pub fn from_entries(entries: &[PriceFeedEntry]) -> Self {
        let mut book = Self::default();
        for entry in entries {
            book.upsert(PriceFeed::from(entry));
        }
        book
    }

    pub fn from_config(config: &StarterConfig) -> Self {
        Self::from_entries(&config.price_feeds)
    }

    pub fn upsert(&mut self, feed: PriceFeed) {
        if !self.feeds.contains_key(&feed.asset) {
            self.order.push(feed.asset.clone());
        }
        self.feeds.insert(feed.asset.clone(), feed);
    }

    pub fn get(&self, asset: &str) -> Option<&PriceFeed> {
        self.feeds.get(asset)
    }

    /// USD value of `amount` units of `asset`, if the asset is quoted.
    pub fn usd_estimate(&self, asset: &str, amount: f64) -> Option<f64> {
        self.get(asset).map(|f| f.price * amount)
    }
}

#[async_trait]
impl PriceFeedSource for PriceFeedBook {
    async fn latest(&self, asset: &str) -> Option<PriceFeed> {
        self.get(asset).cloned()
    }

    async fn all(&self) -> Vec<PriceFeed> {
        self.order
            .iter()
            .filter_map(|a| self.feeds.get(a).cloned())
            .collect()
    }
}

/// `~ $1,234.56 USD` style label for a contribution form.
pub fn format_usd(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let whole = (cents / 100).abs().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if cents < 0 { "-" } else { "" };
    format!("~ {sign}${grouped}.{:02} USD", (cents % 100).abs())
}
