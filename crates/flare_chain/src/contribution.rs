//! Two-phase contribution: `approve` on the token, then `contribute` on the
//! campaign, each awaited to a successful receipt before moving on.

use std::sync::Arc;

use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{Address, H256, U256};
use flare_core::{ErrorCategory, IdentitySession, Notice, StarterConfig, UserFacing};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::abi::{ContractCall, erc20_approve};
use crate::ledger::{Ledger, LedgerError, SubmitError, TxReceipt, Wallet, submit_and_confirm};
use crate::tokens::{TokenError, TokenTable};
use crate::units::{PLATFORM_DECIMALS, UnitsError, format_units, parse_positive_amount};

pub const VERIFICATION_REQUIRED_NOTICE: &str =
    "This campaign only accepts contributions from verified users. Verify your identity from the dashboard to contribute.";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContributionError {
    #[error("No wallet connected")]
    NotConnected,

    #[error("Sign in required")]
    IdentityRequired,

    #[error("Verification required")]
    VerificationRequired,

    #[error("Token configuration error: {0}")]
    Configuration(#[from] TokenError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] UnitsError),

    #[error("Another contribution is already in progress")]
    InProgress,

    #[error("Approval failed: {0}")]
    Approval(LedgerError),

    /// The approval was mined but the contribution was not, so the campaign
    /// may still spend `amount` of `token` on the account's behalf.
    #[error("Contribution failed after approval: {source}")]
    LeftoverAllowance {
        source: LedgerError,
        token: Address,
        spender: Address,
        amount: U256,
        /// A zero approval was mined after the failure.
        revoked: bool,
    },

    /// A transaction was broadcast but its receipt never arrived, so its
    /// outcome is unknown. No revocation is attempted.
    #[error("{step:?} transaction {tx_hash:?} not confirmed: {source}")]
    Unconfirmed {
        step: ContributionStep,
        tx_hash: H256,
        source: LedgerError,
        spender: Address,
        amount: U256,
    },
}

impl ContributionError {
    /// The campaign may hold an allowance the user did not spend.
    pub fn allowance_pending(&self) -> bool {
        match self {
            Self::LeftoverAllowance { revoked, .. } => !revoked,
            Self::Unconfirmed { step, .. } => *step == ContributionStep::Approval,
            _ => false,
        }
    }
}

impl UserFacing for ContributionError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConnected
            | Self::IdentityRequired
            | Self::VerificationRequired
            | Self::InProgress => ErrorCategory::Precondition,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidAmount(_) => ErrorCategory::Validation,
            Self::Approval(e) => e.category(),
            Self::LeftoverAllowance { source, .. } | Self::Unconfirmed { source, .. } => {
                source.category()
            }
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::NotConnected => "Connect your wallet to contribute.".into(),
            Self::IdentityRequired => "Sign in to contribute to campaigns.".into(),
            Self::VerificationRequired => VERIFICATION_REQUIRED_NOTICE.into(),
            Self::Configuration(TokenError::Unconfigured(t)) => {
                format!("{t} is not available for contributions yet.")
            }
            Self::Configuration(e) => e.to_string(),
            Self::InvalidAmount(e) => format!("Please enter a valid amount: {e}."),
            Self::InProgress => "Please wait for your current contribution to finish.".into(),
            Self::Approval(e) => format!("Token approval failed. {}", e.user_message()),
            Self::LeftoverAllowance {
                source,
                amount,
                revoked,
                ..
            } => {
                if *revoked {
                    format!(
                        "Contribution failed. {} The token approval has been revoked.",
                        source.user_message()
                    )
                } else {
                    format!(
                        "Contribution failed. {} The campaign is still approved to spend {} tokens; revoke the approval in your wallet if you do not retry.",
                        source.user_message(),
                        format_units(*amount, PLATFORM_DECIMALS)
                    )
                }
            }
            Self::Unconfirmed {
                step: ContributionStep::Approval,
                tx_hash,
                amount,
                ..
            } => format!(
                "Your token approval ({tx_hash:?}) was submitted but not confirmed. Check your wallet before retrying; the campaign may be approved to spend {} tokens.",
                format_units(*amount, PLATFORM_DECIMALS)
            ),
            Self::Unconfirmed {
                step: ContributionStep::Contribution,
                tx_hash,
                ..
            } => format!(
                "Your contribution ({tx_hash:?}) was submitted but not confirmed. Check your wallet before contributing again."
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRequest {
    pub campaign: Address,
    pub ticker: String,
    /// Decimal amount as typed by the user.
    pub amount: String,
    pub requires_fdc: bool,
}

/// Sessions available to one attempt. Both are owned elsewhere.
#[derive(Clone, Copy)]
pub struct ContributorContext<'a> {
    pub wallet: &'a dyn Wallet,
    pub identity: Option<&'a IdentitySession>,
    /// On-chain attestation status of the wallet account, when known.
    pub attested: bool,
}

impl ContributorContext<'_> {
    pub fn is_verified(&self) -> bool {
        self.attested || self.identity.is_some_and(|i| i.verified)
    }
}

/// The two signed steps of a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStep {
    Approval,
    Contribution,
}

/// Progress of a contribution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ContributionPhase {
    Approving,
    AwaitingApproval { tx_hash: H256 },
    Contributing,
    AwaitingConfirmation { tx_hash: H256 },
    Completed { tx_hash: H256 },
    Failed { message: String },
}

/// Whether the contribute action can be offered, and what to show if not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributeGate {
    pub enabled: bool,
    pub notice: Option<String>,
    pub blocked_by: Option<ContributionError>,
}

impl ContributeGate {
    fn open() -> Self {
        Self {
            enabled: true,
            notice: None,
            blocked_by: None,
        }
    }

    fn blocked(err: ContributionError) -> Self {
        Self {
            enabled: false,
            notice: Some(err.user_message()),
            blocked_by: Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReceipt {
    pub campaign: Address,
    pub ticker: String,
    pub amount: U256,
    pub approval: TxReceipt,
    pub contribution: TxReceipt,
}

impl ContributionReceipt {
    pub fn notice(&self) -> Notice {
        Notice::success("Contribution Successful").with_description(format!(
            "You contributed {} {}.",
            format_units(self.amount, PLATFORM_DECIMALS),
            self.ticker
        ))
    }
}

/// Checked inputs, ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedContribution {
    pub account: Address,
    pub campaign: Address,
    pub ticker: String,
    pub token: Address,
    pub amount: U256,
}

impl PreparedContribution {
    fn unconfirmed(
        &self,
        step: ContributionStep,
        tx_hash: H256,
        source: LedgerError,
    ) -> ContributionError {
        ContributionError::Unconfirmed {
            step,
            tx_hash,
            source,
            spender: self.campaign,
            amount: self.amount,
        }
    }
}

pub fn contribute_call(campaign: Address, token: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        campaign,
        "contribute",
        &[ParamType::Address, ParamType::Uint(256)],
        &[Token::Address(token), Token::Uint(amount)],
    )
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct ContributionSequencer {
    ledger: Arc<dyn Ledger>,
    tokens: TokenTable,
    require_identity: bool,
    revoke_on_failure: bool,
    in_flight: Mutex<()>,
    observer: Option<mpsc::UnboundedSender<ContributionPhase>>,
}

impl ContributionSequencer {
    pub fn new(ledger: Arc<dyn Ledger>, tokens: TokenTable) -> Self {
        Self {
            ledger,
            tokens,
            require_identity: true,
            revoke_on_failure: false,
            in_flight: Mutex::new(()),
            observer: None,
        }
    }

    pub fn from_config(ledger: Arc<dyn Ledger>, config: &StarterConfig) -> Result<Self, TokenError> {
        Ok(Self::new(ledger, TokenTable::from_config(config)?)
            .require_identity(config.require_identity)
            .revoke_on_failure(config.revoke_allowance_on_failure))
    }

    pub fn require_identity(mut self, required: bool) -> Self {
        self.require_identity = required;
        self
    }

    pub fn revoke_on_failure(mut self, revoke: bool) -> Self {
        self.revoke_on_failure = revoke;
        self
    }

    /// Publish phases to `observer`. A dropped receiver is ignored.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<ContributionPhase>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit(&self, phase: ContributionPhase) {
        if let Some(tx) = &self.observer {
            let _ = tx.send(phase);
        }
    }

    /// Run every precondition in order, without touching the wallet's
    /// signing surface.
    pub fn prepare(
        &self,
        ctx: &ContributorContext<'_>,
        request: &ContributionRequest,
    ) -> Result<PreparedContribution, ContributionError> {
        let account = ctx.wallet.account().ok_or(ContributionError::NotConnected)?;
        if self.require_identity && ctx.identity.is_none() {
            return Err(ContributionError::IdentityRequired);
        }
        if request.requires_fdc && !ctx.is_verified() {
            return Err(ContributionError::VerificationRequired);
        }
        let token = self.tokens.resolve(&request.ticker)?;
        let amount = parse_positive_amount(&request.amount, PLATFORM_DECIMALS)?;
        Ok(PreparedContribution {
            account,
            campaign: request.campaign,
            ticker: request.ticker.clone(),
            token,
            amount,
        })
    }

    /// Gate for the contribute button, driven by the same checks.
    pub fn gate(&self, ctx: &ContributorContext<'_>, request: &ContributionRequest) -> ContributeGate {
        match self.prepare(ctx, request) {
            Ok(_) => ContributeGate::open(),
            Err(e) => ContributeGate::blocked(e),
        }
    }

    /// Approve, then contribute. Attempts never interleave: a call made
    /// while another is running fails with [`ContributionError::InProgress`].
    pub async fn contribute(
        &self,
        ctx: &ContributorContext<'_>,
        request: &ContributionRequest,
    ) -> Result<ContributionReceipt, ContributionError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ContributionError::InProgress)?;

        let prepared = match self.prepare(ctx, request) {
            Ok(p) => p,
            Err(e) => {
                debug!(ticker = %request.ticker, error = %e, "contribution precondition failed");
                return Err(e);
            }
        };

        let result = self.run(ctx.wallet, &prepared).await;
        match &result {
            Ok(receipt) => self.emit(ContributionPhase::Completed {
                tx_hash: receipt.contribution.tx_hash,
            }),
            Err(e) => self.emit(ContributionPhase::Failed {
                message: e.user_message(),
            }),
        }
        result
    }

    async fn run(
        &self,
        wallet: &dyn Wallet,
        p: &PreparedContribution,
    ) -> Result<ContributionReceipt, ContributionError> {
        info!(
            campaign = ?p.campaign,
            ticker = %p.ticker,
            amount = %format_units(p.amount, PLATFORM_DECIMALS),
            "starting contribution"
        );

        self.emit(ContributionPhase::Approving);
        let approval = match self
            .submit(wallet, &erc20_approve(p.token, p.campaign, p.amount), |tx_hash| {
                ContributionPhase::AwaitingApproval { tx_hash }
            })
            .await
        {
            Ok(r) => r,
            Err(SubmitError::Unconfirmed { tx_hash, source }) => {
                warn!(?tx_hash, error = %source, "approval unconfirmed, contribution skipped");
                return Err(p.unconfirmed(ContributionStep::Approval, tx_hash, source));
            }
            Err(SubmitError::Ledger(e)) => {
                warn!(ticker = %p.ticker, error = %e, "approval failed, contribution skipped");
                return Err(ContributionError::Approval(e));
            }
        };

        self.emit(ContributionPhase::Contributing);
        let contribution = match self
            .submit(wallet, &contribute_call(p.campaign, p.token, p.amount), |tx_hash| {
                ContributionPhase::AwaitingConfirmation { tx_hash }
            })
            .await
        {
            Ok(r) => r,
            Err(SubmitError::Unconfirmed { tx_hash, source }) => {
                error!(?tx_hash, error = %source, "contribution unconfirmed");
                return Err(p.unconfirmed(ContributionStep::Contribution, tx_hash, source));
            }
            Err(SubmitError::Ledger(source)) => {
                error!(campaign = ?p.campaign, error = %source, "contribution failed after approval");
                let revoked = self.revoke_on_failure && self.revoke(wallet, p).await;
                return Err(ContributionError::LeftoverAllowance {
                    source,
                    token: p.token,
                    spender: p.campaign,
                    amount: p.amount,
                    revoked,
                });
            }
        };

        info!(tx = ?contribution.tx_hash, "contribution confirmed");
        Ok(ContributionReceipt {
            campaign: p.campaign,
            ticker: p.ticker.clone(),
            amount: p.amount,
            approval,
            contribution,
        })
    }

    async fn submit(
        &self,
        wallet: &dyn Wallet,
        call: &ContractCall,
        waiting: impl FnOnce(H256) -> ContributionPhase + Send,
    ) -> Result<TxReceipt, SubmitError> {
        submit_and_confirm(self.ledger.as_ref(), wallet, call, |tx_hash| {
            self.emit(waiting(tx_hash))
        })
        .await
    }

    async fn revoke(&self, wallet: &dyn Wallet, p: &PreparedContribution) -> bool {
        let call = erc20_approve(p.token, p.campaign, U256::zero());
        match submit_and_confirm(self.ledger.as_ref(), wallet, &call, |_| {}).await {
            Ok(r) => {
                info!(tx = ?r.tx_hash, "leftover allowance revoked");
                true
            }
            Err(e) => {
                warn!(error = %e, "allowance revocation failed");
                false
            }
        }
    }
}
