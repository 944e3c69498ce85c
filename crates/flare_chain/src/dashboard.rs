//! Per-account dashboard: campaigns created and contributions made.

use chrono::Utc;
use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abi::{self, ContractCall};
use crate::aggregator::{CampaignField, CampaignReader, FieldReads, read_keyed};
use crate::ledger::{Ledger, LedgerError};
use crate::tokens::{AssetToken, TokenTable};
use crate::types::{Contribution, DEFAULT_TITLE, RefundStatus};
use crate::units::{PLATFORM_DECIMALS, to_display};

/// A read issued per campaign for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DashboardField {
    Campaign(CampaignField),
    /// `contributions(account, token)` for the ticker at this table index.
    Contributed(usize),
}

fn contributions_call(campaign: Address, account: Address, token: Address) -> ContractCall {
    ContractCall::new(
        campaign,
        "contributions",
        &[ParamType::Address, ParamType::Address],
        &[Token::Address(account), Token::Address(token)],
    )
}

/// A campaign the account created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedCampaign {
    pub id: Address,
    pub title: String,
    pub funding_goal: f64,
    pub current_funding: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dashboard {
    pub my_campaigns: Vec<OwnedCampaign>,
    pub contributions: Vec<Contribution>,
}

impl Dashboard {
    /// Sum of every contribution, in display units.
    pub fn total_donated(&self) -> f64 {
        self.contributions.iter().map(|c| c.amount).sum()
    }
}

/// Load the dashboard for `account` from the factory's deployed campaigns.
///
/// `None` for the account means no wallet is connected.
pub async fn load_dashboard(
    reader: &CampaignReader,
    ledger: &dyn Ledger,
    tokens: &TokenTable,
    account: Option<Address>,
) -> Result<Dashboard, LedgerError> {
    let account = account.ok_or(LedgerError::NotConnected)?;
    let campaigns = reader.deployed_campaigns().await?;
    build_dashboard(ledger, tokens, account, &campaigns).await
}

/// Dashboard for an explicit campaign list.
pub async fn build_dashboard(
    ledger: &dyn Ledger,
    tokens: &TokenTable,
    account: Address,
    campaigns: &[Address],
) -> Result<Dashboard, LedgerError> {
    let assets: Vec<&AssetToken> = tokens.configured().collect();

    let mut fields = vec![
        DashboardField::Campaign(CampaignField::Title),
        DashboardField::Campaign(CampaignField::Creator),
        DashboardField::Campaign(CampaignField::FundingGoalUsd),
        DashboardField::Campaign(CampaignField::CurrentFundingUsd),
    ];
    fields.extend((0..assets.len()).map(DashboardField::Contributed));

    let reads = read_keyed(ledger, campaigns, &fields, |campaign, field| match field {
        DashboardField::Campaign(f) => f.call(campaign),
        DashboardField::Contributed(i) => contributions_call(campaign, account, assets[i].address),
    })
    .await?;

    let dashboard = collect_dashboard(&reads, &assets, account, campaigns);
    debug!(
        created = dashboard.my_campaigns.len(),
        contributions = dashboard.contributions.len(),
        "dashboard loaded"
    );
    Ok(dashboard)
}

fn collect_dashboard(
    reads: &FieldReads<DashboardField>,
    assets: &[&AssetToken],
    account: Address,
    campaigns: &[Address],
) -> Dashboard {
    let now = Utc::now();
    let mut dashboard = Dashboard::default();

    for (idx, campaign) in campaigns.iter().enumerate() {
        let Some(title) = reads
            .get(idx, DashboardField::Campaign(CampaignField::Title), abi::decode_string)
            .ok()
        else {
            continue;
        };
        let title = if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title
        };

        let amount = |field: CampaignField| {
            to_display(
                reads
                    .get(idx, DashboardField::Campaign(field), abi::decode_u256)
                    .unwrap_or_default(),
                PLATFORM_DECIMALS,
            )
        };

        let creator = reads
            .get(idx, DashboardField::Campaign(CampaignField::Creator), abi::decode_address)
            .ok();
        if creator == Some(account) {
            dashboard.my_campaigns.push(OwnedCampaign {
                id: *campaign,
                title: title.clone(),
                funding_goal: amount(CampaignField::FundingGoalUsd),
                current_funding: amount(CampaignField::CurrentFundingUsd),
            });
        }

        for (i, asset) in assets.iter().enumerate() {
            let contributed: U256 = reads
                .get(idx, DashboardField::Contributed(i), abi::decode_u256)
                .unwrap_or_default();
            if contributed.is_zero() {
                continue;
            }
            dashboard.contributions.push(Contribution {
                id: Contribution::make_id(*campaign, &asset.ticker),
                campaign_id: *campaign,
                campaign_title: title.clone(),
                asset: asset.ticker.clone(),
                amount: to_display(contributed, PLATFORM_DECIMALS),
                // Contribution time is not readable without event logs.
                timestamp: now,
                refund_status: RefundStatus::None,
                has_voting_rights: true,
            });
        }
    }
    dashboard
}
