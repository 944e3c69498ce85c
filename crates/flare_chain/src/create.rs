//! Campaign creation through the factory contract.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{Address, U256};
use flare_core::{ErrorCategory, Notice, UserFacing};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::abi::ContractCall;
use crate::ledger::{Ledger, LedgerError, TxReceipt, Wallet, send_and_confirm};
use crate::tokens::TokenTable;
use crate::types::PLACEHOLDER_IMAGE;
use crate::units::{PLATFORM_DECIMALS, whole_units};

/// Largest accepted image data URL, in bytes.
pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error("No wallet connected")]
    NotConnected,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl UserFacing for CreateError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Invalid(_) => ErrorCategory::Validation,
            Self::NotConnected => ErrorCategory::Precondition,
            Self::Ledger(e) => e.category(),
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Invalid(errors) => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Please check the form.".into()),
            Self::NotConnected => "Connect your wallet to create a campaign.".into(),
            Self::Ledger(e) => e.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub title: String,
    pub description: String,
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Used when `category` is `Other`.
    pub other_category: String,
    pub funding_goal: u64,
    pub deadline: Option<DateTime<Utc>>,
    /// `data:` URL of an uploaded image.
    pub image: Option<String>,
    pub milestones: Vec<MilestoneDraft>,
    pub requires_fdc: bool,
    pub accepted_assets: Vec<String>,
}

impl Default for CampaignDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: String::new(),
            other_category: String::new(),
            funding_goal: 1000,
            deadline: None,
            image: None,
            milestones: Vec::new(),
            requires_fdc: false,
            accepted_assets: Vec::new(),
        }
    }
}

/// A draft that passed validation, in the shape `createCampaign` takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignParams {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub goal: U256,
    pub duration_days: u64,
    pub requires_fdc: bool,
    pub token_addresses: Vec<Address>,
    pub tickers: Vec<String>,
}

impl CampaignParams {
    pub fn call(&self, factory: Address) -> ContractCall {
        ContractCall::new(
            factory,
            "createCampaign",
            &[
                ParamType::String,
                ParamType::String,
                ParamType::String,
                ParamType::String,
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Bool,
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Array(Box::new(ParamType::String)),
            ],
            &[
                Token::String(self.title.clone()),
                Token::String(self.description.clone()),
                Token::String(self.image_url.clone()),
                Token::String(self.category.clone()),
                Token::Uint(self.goal),
                Token::Uint(U256::from(self.duration_days)),
                Token::Bool(self.requires_fdc),
                Token::Array(
                    self.token_addresses
                        .iter()
                        .map(|a| Token::Address(*a))
                        .collect(),
                ),
                Token::Array(self.tickers.iter().map(|t| Token::String(t.clone())).collect()),
            ],
        )
    }
}

/// Days from `now` to `deadline`, rounded up.
pub fn duration_days(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (deadline - now).num_seconds();
    if secs <= 0 {
        return 0;
    }
    (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

impl CampaignDraft {
    /// Check every field, returning all errors together.
    pub fn validate_at(
        &self,
        tokens: &TokenTable,
        now: DateTime<Utc>,
    ) -> Result<CampaignParams, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.title.trim().chars().count() < 5 {
            errors.push(FieldError::new("title", "Title must be at least 5 characters"));
        }
        if self.description.trim().chars().count() < 20 {
            errors.push(FieldError::new(
                "description",
                "Description must be at least 20 characters",
            ));
        }

        let category = if self.category == "Other" {
            self.other_category.trim()
        } else {
            self.category.trim()
        };
        if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Please select a category"));
        } else if category.is_empty() {
            errors.push(FieldError::new("other_category", "Please specify the category name"));
        }

        if self.funding_goal < 1 {
            errors.push(FieldError::new("funding_goal", "Funding goal must be at least 1"));
        }

        let days = match self.deadline {
            None => {
                errors.push(FieldError::new("deadline", "A deadline date is required."));
                0
            }
            Some(deadline) => {
                let days = duration_days(deadline, now);
                if days <= 0 {
                    errors.push(FieldError::new("deadline", "Deadline must be in the future"));
                }
                days
            }
        };

        let image_url = match &self.image {
            Some(data) if data.len() > MAX_IMAGE_BYTES => {
                errors.push(FieldError::new(
                    "image",
                    "Please upload an image smaller than 1MB.",
                ));
                PLACEHOLDER_IMAGE.to_string()
            }
            Some(data) if !data.is_empty() => data.clone(),
            _ => PLACEHOLDER_IMAGE.to_string(),
        };

        for (i, m) in self.milestones.iter().enumerate() {
            if m.title.trim().chars().count() < 3 {
                errors.push(FieldError::new(
                    format!("milestones[{i}].title"),
                    "Title must be at least 3 characters",
                ));
            }
            if m.description.trim().chars().count() < 10 {
                errors.push(FieldError::new(
                    format!("milestones[{i}].description"),
                    "Description must be at least 10 characters",
                ));
            }
            if m.target_date.is_none() {
                errors.push(FieldError::new(
                    format!("milestones[{i}].target_date"),
                    "A target date is required.",
                ));
            }
        }

        let mut token_addresses = Vec::new();
        if self.accepted_assets.is_empty() {
            errors.push(FieldError::new("accepted_assets", "Select at least one asset"));
        }
        for ticker in &self.accepted_assets {
            match tokens.get(ticker) {
                Some(t) => token_addresses.push(t.address),
                None => errors.push(FieldError::new(
                    "accepted_assets",
                    format!("Unknown asset {ticker}"),
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CampaignParams {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            image_url,
            category: category.to_string(),
            goal: whole_units(self.funding_goal, PLATFORM_DECIMALS),
            duration_days: days as u64,
            requires_fdc: self.requires_fdc,
            token_addresses,
            tickers: self.accepted_assets.clone(),
        })
    }

    pub fn validate(&self, tokens: &TokenTable) -> Result<CampaignParams, Vec<FieldError>> {
        self.validate_at(tokens, Utc::now())
    }
}

pub struct CampaignCreator {
    ledger: Arc<dyn Ledger>,
    factory: Address,
    tokens: TokenTable,
}

impl CampaignCreator {
    pub fn new(ledger: Arc<dyn Ledger>, factory: Address, tokens: TokenTable) -> Self {
        Self {
            ledger,
            factory,
            tokens,
        }
    }

    /// Validate, submit `createCampaign`, and wait for the receipt.
    pub async fn create(
        &self,
        wallet: &dyn Wallet,
        draft: &CampaignDraft,
    ) -> Result<TxReceipt, CreateError> {
        let params = draft.validate(&self.tokens).map_err(CreateError::Invalid)?;
        if wallet.account().is_none() {
            return Err(CreateError::NotConnected);
        }
        let receipt = send_and_confirm(self.ledger.as_ref(), wallet, &params.call(self.factory)).await?;
        info!(
            title = %params.title,
            days = params.duration_days,
            tx = ?receipt.tx_hash,
            "campaign created"
        );
        Ok(receipt)
    }
}

pub fn created_notice() -> Notice {
    Notice::success("Campaign Created Successfully!")
        .with_description("Your Smart Account has been deployed to the Flare Network.")
}
