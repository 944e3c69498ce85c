//! Campaign view-model aggregation over batched contract reads.
//!
//! Every read is planned as `(entity index, field)` and its outcome is stored
//! under that key, so a record is assembled only from its own entity's
//! results no matter how many neighbouring calls failed.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers_core::types::{Address, U256};
use flare_core::NoticeCenter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abi::{self, ContractCall};
use crate::fields::{FieldResult, Lookup};
use crate::ledger::{CallOutcome, Ledger, LedgerError};
use crate::types::{
    AcceptedAsset, Campaign, Creator, DEFAULT_CATEGORY, DEFAULT_DESCRIPTION, DEFAULT_TITLE,
    PLACEHOLDER_IMAGE,
};
use crate::units::{PLATFORM_DECIMALS, to_display};

/// Return slot of `getDetails` that carries the accepted tickers.
pub const DETAILS_TICKERS_SLOT: usize = 4;

/// A named read-only entry point on a campaign contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignField {
    Title,
    ImageUrl,
    Category,
    CurrentFundingUsd,
    FundingGoalUsd,
    Deadline,
    Creator,
    Description,
    Details,
    RequiresFdc,
}

impl CampaignField {
    /// Fields read for list views.
    pub const LIST: &'static [CampaignField] = &[
        Self::Title,
        Self::ImageUrl,
        Self::Category,
        Self::CurrentFundingUsd,
        Self::FundingGoalUsd,
        Self::Deadline,
        Self::Creator,
        Self::RequiresFdc,
    ];

    /// Fields read for a single campaign page.
    pub const DETAIL: &'static [CampaignField] = &[
        Self::Title,
        Self::ImageUrl,
        Self::Category,
        Self::CurrentFundingUsd,
        Self::FundingGoalUsd,
        Self::Deadline,
        Self::Creator,
        Self::Description,
        Self::Details,
        Self::RequiresFdc,
    ];

    /// Contract function backing this field.
    pub fn function(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::ImageUrl => "imageUrl",
            Self::Category => "category",
            Self::CurrentFundingUsd => "currentFundingUSD",
            Self::FundingGoalUsd => "fundingGoalUSD",
            Self::Deadline => "deadline",
            Self::Creator => "creator",
            Self::Description => "description",
            Self::Details => "getDetails",
            Self::RequiresFdc => "requiresFdc",
        }
    }

    pub fn call(&self, campaign: Address) -> ContractCall {
        ContractCall::getter(campaign, self.function())
    }
}

// ---------------------------------------------------------------------------
// Keyed batch results
// ---------------------------------------------------------------------------

/// Outcomes of one batched read, keyed by `(entity index, field)`.
#[derive(Debug)]
pub struct FieldReads<F = CampaignField> {
    outcomes: HashMap<(usize, F), CallOutcome>,
}

impl<F> Default for FieldReads<F> {
    fn default() -> Self {
        Self {
            outcomes: HashMap::new(),
        }
    }
}

impl<F: Copy + Eq + Hash> FieldReads<F> {
    /// Plan the calls for `fields` on every entity, in a stable order.
    pub fn plan(
        entities: &[Address],
        fields: &[F],
        call: impl Fn(Address, F) -> ContractCall,
    ) -> (Vec<(usize, F)>, Vec<ContractCall>) {
        let mut keys = Vec::with_capacity(entities.len() * fields.len());
        let mut calls = Vec::with_capacity(keys.capacity());
        for (idx, addr) in entities.iter().enumerate() {
            for field in fields {
                keys.push((idx, *field));
                calls.push(call(*addr, *field));
            }
        }
        (keys, calls)
    }

    /// Pair a batch response with its plan. The two must have equal length.
    pub fn from_outcomes(
        keys: Vec<(usize, F)>,
        outcomes: Vec<CallOutcome>,
    ) -> Result<Self, LedgerError> {
        if keys.len() != outcomes.len() {
            return Err(LedgerError::Malformed(format!(
                "batch returned {} results for {} calls",
                outcomes.len(),
                keys.len()
            )));
        }
        Ok(Self {
            outcomes: keys.into_iter().zip(outcomes).collect(),
        })
    }

    pub fn insert(&mut self, index: usize, field: F, outcome: CallOutcome) {
        self.outcomes.insert((index, field), outcome);
    }

    /// Decode one field. Missing keys are still pending.
    pub fn get<T, E: std::fmt::Display>(
        &self,
        index: usize,
        field: F,
        decoder: impl FnOnce(&[u8]) -> Result<T, E>,
    ) -> FieldResult<T> {
        match self.outcomes.get(&(index, field)) {
            Some(outcome) => FieldResult::decode(outcome, decoder),
            None => FieldResult::Pending,
        }
    }

    pub fn failures(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_err()).count()
    }
}

/// Run one batch for `fields` on every entity and key the outcomes.
pub async fn read_keyed<F: Copy + Eq + Hash>(
    ledger: &dyn Ledger,
    entities: &[Address],
    fields: &[F],
    call: impl Fn(Address, F) -> ContractCall,
) -> Result<FieldReads<F>, LedgerError> {
    let (keys, calls) = FieldReads::plan(entities, fields, call);
    let outcomes = ledger.call_batch(&calls).await?;
    let reads = FieldReads::from_outcomes(keys, outcomes)?;
    let failed = reads.failures();
    if failed > 0 {
        warn!(failed, entities = entities.len(), "some fields failed to load");
    }
    Ok(reads)
}

fn non_empty(value: FieldResult<String>, fallback: &str) -> String {
    value
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn timestamp(seconds: U256) -> DateTime<Utc> {
    let secs = if seconds > U256::from(i64::MAX as u64) {
        0
    } else {
        seconds.as_u64() as i64
    };
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Build the view model for entity `index`, or `None` when its title read
/// did not succeed. Every other field falls back independently.
pub fn assemble_campaign(reads: &FieldReads, index: usize, address: Address) -> Option<Campaign> {
    let title = reads.get(index, CampaignField::Title, abi::decode_string).ok()?;
    let title = if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    };

    let amount = |field: CampaignField| {
        to_display(
            reads.get(index, field, abi::decode_u256).unwrap_or_default(),
            PLATFORM_DECIMALS,
        )
    };

    let creator = reads
        .get(index, CampaignField::Creator, abi::decode_address)
        .unwrap_or_default();

    let tickers = reads
        .get(index, CampaignField::Details, |data| {
            abi::decode_string_array_at(data, DETAILS_TICKERS_SLOT)
        })
        .unwrap_or_default();

    Some(Campaign {
        id: address,
        title,
        description: non_empty(
            reads.get(index, CampaignField::Description, abi::decode_string),
            DEFAULT_DESCRIPTION,
        ),
        image_url: non_empty(
            reads.get(index, CampaignField::ImageUrl, abi::decode_string),
            PLACEHOLDER_IMAGE,
        ),
        category: non_empty(
            reads.get(index, CampaignField::Category, abi::decode_string),
            DEFAULT_CATEGORY,
        ),
        funding_goal: amount(CampaignField::FundingGoalUsd),
        current_funding: amount(CampaignField::CurrentFundingUsd),
        deadline: timestamp(
            reads
                .get(index, CampaignField::Deadline, abi::decode_u256)
                .unwrap_or_default(),
        ),
        creator: Creator::from_address(creator),
        accepted_assets: tickers.iter().map(|t| AcceptedAsset::from_ticker(t)).collect(),
        milestones: Vec::new(),
        requires_fdc: reads
            .get(index, CampaignField::RequiresFdc, abi::decode_bool)
            .unwrap_or(false),
        cancelled: false,
    })
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads campaign view models from the factory and campaign contracts.
#[derive(Clone)]
pub struct CampaignReader {
    ledger: Arc<dyn Ledger>,
    factory: Address,
}

impl CampaignReader {
    pub fn new(ledger: Arc<dyn Ledger>, factory: Address) -> Self {
        Self { ledger, factory }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    /// Addresses of every campaign the factory has deployed.
    pub async fn deployed_campaigns(&self) -> Result<Vec<Address>, LedgerError> {
        let call = ContractCall::getter(self.factory, "getDeployedCampaigns");
        let data = self.ledger.call(&call).await?;
        abi::decode_address_array(&data).map_err(|e| LedgerError::Malformed(e.to_string()))
    }

    /// Batch-read `fields` for every address and keep the outcomes keyed.
    pub async fn read_fields(
        &self,
        addresses: &[Address],
        fields: &[CampaignField],
    ) -> Result<FieldReads, LedgerError> {
        read_keyed(self.ledger.as_ref(), addresses, fields, |addr, field| field.call(addr)).await
    }

    /// List view models for `addresses`, in order. Campaigns whose title
    /// could not be read are omitted.
    pub async fn list(&self, addresses: &[Address]) -> Result<Vec<Campaign>, LedgerError> {
        let reads = self.read_fields(addresses, CampaignField::LIST).await?;
        let campaigns: Vec<Campaign> = addresses
            .iter()
            .enumerate()
            .filter_map(|(idx, addr)| assemble_campaign(&reads, idx, *addr))
            .collect();
        debug!(requested = addresses.len(), loaded = campaigns.len(), "campaign list read");
        Ok(campaigns)
    }

    /// Every deployed campaign as a list view model.
    pub async fn list_deployed(&self) -> Result<Vec<Campaign>, LedgerError> {
        let addresses = self.deployed_campaigns().await?;
        info!(count = addresses.len(), "loaded deployed campaigns");
        self.list(&addresses).await
    }

    /// Detail view model; `Ok(None)` when the campaign has no readable title.
    pub async fn detail(&self, address: Address) -> Result<Option<Campaign>, LedgerError> {
        let reads = self.read_fields(&[address], CampaignField::DETAIL).await?;
        Ok(assemble_campaign(&reads, 0, address))
    }
}

/// The state of one campaign page.
pub struct CampaignDetailQuery {
    address: Address,
    state: Lookup<Campaign>,
}

impl CampaignDetailQuery {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: Lookup::Loading,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &Lookup<Campaign> {
        &self.state
    }

    /// Run the read. A transport failure leaves the state as it was and
    /// reports a notice instead of claiming the campaign does not exist.
    pub async fn refresh(
        &mut self,
        reader: &CampaignReader,
        notices: &NoticeCenter,
    ) -> &Lookup<Campaign> {
        match reader.detail(self.address).await {
            Ok(Some(campaign)) => self.state = Lookup::Found(campaign),
            Ok(None) => {
                debug!(campaign = ?self.address, "campaign title unreadable, not found");
                self.state = Lookup::NotFound;
            }
            Err(e) => {
                warn!(campaign = ?self.address, error = %e, "campaign detail read failed");
                notices.report(&e);
            }
        }
        &self.state
    }
}
