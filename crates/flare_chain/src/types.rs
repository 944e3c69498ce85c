//! Campaign view models.

use chrono::{DateTime, Utc};
use ethers_core::types::Address;
use ethers_core::utils::to_checksum;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x400";
pub const PLACEHOLDER_AVATAR: &str = "https://placehold.co/100";
pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_DESCRIPTION: &str = "Blockchain Campaign";
pub const DEFAULT_CATEGORY: &str = "Tech";

/// Campaign categories offered when creating a campaign. `Other` takes a
/// free-form value instead.
pub const CATEGORIES: &[&str] = &["Tech", "Medical", "DeFi", "Gaming", "Other"];

/// Derived lifecycle state. Never stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Successful,
    Expired,
    Cancelled,
}

impl CampaignStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Successful => "Successful",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Derive the status from funding and time.
    pub fn derive(
        current: f64,
        goal: f64,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
        cancelled: bool,
    ) -> Self {
        if cancelled {
            Self::Cancelled
        } else if now < deadline {
            Self::Active
        } else if goal > 0.0 && current >= goal {
            Self::Successful
        } else {
            Self::Expired
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_date: DateTime<Utc>,
    pub status: MilestoneStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub is_verified: bool,
}

impl Creator {
    /// Creator card built from an on-chain address. Verification is not
    /// readable from the campaign contract, so it starts unverified.
    pub fn from_address(address: Address) -> Self {
        let id = to_checksum(&address, None);
        Self {
            name: short_address(&id),
            id,
            avatar_url: PLACEHOLDER_AVATAR.to_string(),
            is_verified: false,
        }
    }
}

/// First six characters followed by `...`.
pub fn short_address(address: &str) -> String {
    let head: String = address.chars().take(6).collect();
    format!("{head}...")
}

/// An accepted asset as shown on a campaign page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedAsset {
    pub symbol: String,
    pub name: String,
}

impl AcceptedAsset {
    /// `F-BTC` is shown as `Flare BTC`.
    pub fn from_ticker(ticker: &str) -> Self {
        let base = ticker.split_once('-').map_or(ticker, |(_, rest)| rest);
        Self {
            symbol: ticker.to_string(),
            name: format!("Flare {base}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Address,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub funding_goal: f64,
    pub current_funding: f64,
    pub deadline: DateTime<Utc>,
    pub creator: Creator,
    pub accepted_assets: Vec<AcceptedAsset>,
    pub milestones: Vec<Milestone>,
    pub requires_fdc: bool,
    /// Set by callers that learn of a cancellation out of band.
    #[serde(default)]
    pub cancelled: bool,
}

impl Campaign {
    pub fn status_at(&self, now: DateTime<Utc>) -> CampaignStatus {
        CampaignStatus::derive(
            self.current_funding,
            self.funding_goal,
            self.deadline,
            now,
            self.cancelled,
        )
    }

    pub fn status(&self) -> CampaignStatus {
        self.status_at(Utc::now())
    }

    /// Funding progress in percent, 0 when there is no goal.
    pub fn progress_percent(&self) -> f64 {
        if self.funding_goal > 0.0 {
            self.current_funding / self.funding_goal * 100.0
        } else {
            0.0
        }
    }

    /// Whole days until the deadline; 0 once it has passed.
    pub fn days_left_at(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_days().max(0)
    }

    pub fn accepts(&self, ticker: &str) -> bool {
        self.accepted_assets.iter().any(|a| a.symbol == ticker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    None,
    Pending,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// `<campaign>-<ticker>`.
    pub id: String,
    pub campaign_id: Address,
    pub campaign_title: String,
    pub asset: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub refund_status: RefundStatus,
    pub has_voting_rights: bool,
}

impl Contribution {
    pub fn make_id(campaign: Address, ticker: &str) -> String {
        format!("{}-{ticker}", to_checksum(&campaign, None))
    }
}
