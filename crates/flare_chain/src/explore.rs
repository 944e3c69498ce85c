//! Filtering and sorting for the campaign browser.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Campaign, CampaignStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Highest funding ratio first.
    #[default]
    Trending,
    /// Latest deadline first.
    Latest,
    /// Largest goal first.
    Goal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreFilter {
    pub search: String,
    /// `None` matches every category.
    pub category: Option<String>,
    /// `None` matches every status.
    pub status: Option<CampaignStatus>,
    /// Only campaigns that require verified contributors.
    pub requires_fdc: bool,
    pub sort_by: SortBy,
}

impl ExploreFilter {
    pub fn matches(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        let search = self.search.trim().to_lowercase();
        (search.is_empty() || campaign.title.to_lowercase().contains(&search))
            && self
                .category
                .as_deref()
                .is_none_or(|c| c == "All" || campaign.category == c)
            && self.status.is_none_or(|s| campaign.status_at(now) == s)
            && (!self.requires_fdc || campaign.requires_fdc)
    }

    /// Filter then sort, evaluating status against `now`.
    pub fn apply_at<'a>(&self, campaigns: &'a [Campaign], now: DateTime<Utc>) -> Vec<&'a Campaign> {
        let mut out: Vec<&Campaign> = campaigns.iter().filter(|c| self.matches(c, now)).collect();
        out.sort_by(|a, b| compare(self.sort_by, a, b));
        out
    }

    pub fn apply<'a>(&self, campaigns: &'a [Campaign]) -> Vec<&'a Campaign> {
        self.apply_at(campaigns, Utc::now())
    }
}

fn ratio(c: &Campaign) -> f64 {
    if c.funding_goal > 0.0 {
        c.current_funding / c.funding_goal
    } else {
        0.0
    }
}

fn compare(sort_by: SortBy, a: &Campaign, b: &Campaign) -> Ordering {
    match sort_by {
        SortBy::Trending => ratio(b).total_cmp(&ratio(a)),
        SortBy::Latest => b.deadline.cmp(&a.deadline),
        SortBy::Goal => b.funding_goal.total_cmp(&a.funding_goal),
    }
}
