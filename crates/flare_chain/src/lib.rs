pub mod abi;
pub mod aggregator;
pub mod balances;
pub mod chain;
pub mod contribution;
pub mod create;
pub mod dashboard;
pub mod explore;
pub mod fdc;
pub mod fields;
pub mod ledger;
pub mod price_feed;
pub mod rpc;
pub mod rpc_config;
pub mod tokens;
pub mod types;
pub mod units;

pub use abi::ContractCall;
pub use aggregator::{CampaignDetailQuery, CampaignField, CampaignReader, FieldReads};
pub use balances::{TokenBalance, WalletBalances, wallet_balances};
pub use chain::{Chain, ChainConfig};
pub use contribution::{
    ContributeGate, ContributionError, ContributionPhase, ContributionReceipt,
    ContributionRequest, ContributionSequencer, ContributionStep, ContributorContext,
};
pub use create::{CampaignCreator, CampaignDraft, CreateError, FieldError, MilestoneDraft};
pub use dashboard::{Dashboard, OwnedCampaign, load_dashboard};
pub use explore::{ExploreFilter, SortBy};
pub use fdc::FdcVerifier;
pub use fields::{FieldResult, Lookup};
pub use ledger::{CallOutcome, Ledger, LedgerError, SubmitError, TxReceipt, Wallet};
pub use price_feed::{PriceFeed, PriceFeedBook, PriceFeedSource};
pub use rpc::{JsonRpcLedger, JsonRpcWallet, RpcTransport};
pub use rpc_config::{RpcConfigStore, RpcEndpoint};
pub use tokens::{AssetToken, TokenError, TokenTable};
pub use types::{
    AcceptedAsset, Campaign, CampaignStatus, Contribution, Creator, Milestone, MilestoneStatus,
    RefundStatus,
};
