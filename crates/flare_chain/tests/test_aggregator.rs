mod common;

use std::sync::Arc;

use ethers_core::abi::Token;
use ethers_core::types::{Address, U256};

use common::{Journal, MockLedger, MockWallet};
use flare_chain::dashboard::build_dashboard;
use flare_chain::types::{DEFAULT_CATEGORY, PLACEHOLDER_IMAGE};
use flare_chain::{
    CampaignDetailQuery, CampaignReader, ExploreFilter, FdcVerifier, LedgerError, Lookup, TokenTable,
    load_dashboard,
};
use flare_core::{NoticeCenter, StarterConfig};

fn factory() -> Address {
    Address::repeat_byte(0xfa)
}

fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn eth(v: u64) -> Token {
    Token::Uint(U256::exp10(18) * v)
}

fn seed_campaign(ledger: &MockLedger, at: Address, title: &str, creator: Address) {
    ledger.respond_tokens(at, "title", &[Token::String(title.into())]);
    ledger.respond_tokens(at, "imageUrl", &[Token::String(format!("https://img/{title}"))]);
    ledger.respond_tokens(at, "category", &[Token::String("Gaming".into())]);
    ledger.respond_tokens(at, "currentFundingUSD", &[eth(10)]);
    ledger.respond_tokens(at, "fundingGoalUSD", &[eth(100)]);
    ledger.respond_tokens(at, "deadline", &[Token::Uint(U256::from(4_102_444_800u64))]);
    ledger.respond_tokens(at, "creator", &[Token::Address(creator)]);
}

fn reader(ledger: &Arc<MockLedger>) -> CampaignReader {
    CampaignReader::new(ledger.clone(), factory())
}

#[tokio::test]
async fn test_list_is_one_batch_with_named_fields() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    seed_campaign(&ledger, addr(1), "Alpha", addr(0xa1));
    seed_campaign(&ledger, addr(2), "Beta", addr(0xa2));
    ledger.respond_tokens(addr(2), "requiresFdc", &[Token::Bool(true)]);

    let campaigns = reader(&ledger).list(&[addr(1), addr(2)]).await.unwrap();
    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0].title, "Alpha");
    assert_eq!(campaigns[1].title, "Beta");
    assert_eq!(campaigns[1].image_url, "https://img/Beta");
    assert_eq!(campaigns[0].funding_goal, 100.0);
    assert!(!campaigns[0].requires_fdc);
    assert!(campaigns[1].requires_fdc);

    let verified_only = ExploreFilter {
        requires_fdc: true,
        ..Default::default()
    };
    let filtered = verified_only.apply(&campaigns);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].title, "Beta");

    let batches = ledger.batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 16);
}

#[tokio::test]
async fn test_partial_failures_stay_within_their_campaign() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    seed_campaign(&ledger, addr(1), "Alpha", addr(0xa1));
    // Second campaign: title readable, everything else fails.
    ledger.respond_tokens(addr(2), "title", &[Token::String("Beta".into())]);
    // Third campaign: title fails, rest succeeds.
    seed_campaign(&ledger, addr(3), "Gamma", addr(0xa3));
    ledger.respond(addr(3), "title", Err("execution reverted".into()));
    seed_campaign(&ledger, addr(4), "Delta", addr(0xa4));
    ledger.respond(addr(4), "category", Err("execution reverted".into()));

    let campaigns = reader(&ledger)
        .list(&[addr(1), addr(2), addr(3), addr(4)])
        .await
        .unwrap();

    let titles: Vec<_> = campaigns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Beta", "Delta"]);

    let beta = &campaigns[1];
    assert_eq!(beta.id, addr(2));
    assert_eq!(beta.image_url, PLACEHOLDER_IMAGE);
    assert_eq!(beta.category, DEFAULT_CATEGORY);
    assert_eq!(beta.funding_goal, 0.0);

    let delta = &campaigns[2];
    assert_eq!(delta.id, addr(4));
    assert_eq!(delta.category, DEFAULT_CATEGORY);
    assert_eq!(delta.image_url, "https://img/Delta");
    assert_eq!(delta.current_funding, 10.0);
}

#[tokio::test]
async fn test_deployed_campaigns_feed_the_list() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    ledger.respond_tokens(
        factory(),
        "getDeployedCampaigns",
        &[Token::Array(vec![Token::Address(addr(1)), Token::Address(addr(2))])],
    );
    seed_campaign(&ledger, addr(1), "Alpha", addr(0xa1));

    let r = reader(&ledger);
    assert_eq!(r.deployed_campaigns().await.unwrap(), vec![addr(1), addr(2)]);
    let campaigns = r.list_deployed().await.unwrap();
    assert_eq!(campaigns.len(), 1);
}

#[tokio::test]
async fn test_detail_query_states() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    seed_campaign(&ledger, addr(1), "Alpha", addr(0xa1));
    ledger.respond_tokens(addr(1), "description", &[Token::String("A long story".into())]);
    ledger.respond_tokens(addr(1), "requiresFdc", &[Token::Bool(true)]);
    ledger.respond_tokens(
        addr(1),
        "getDetails",
        &[
            Token::Address(addr(0xa1)),
            Token::String("Alpha".into()),
            eth(100),
            eth(10),
            Token::Array(vec![Token::String("F-BTC".into()), Token::String("F-XRP".into())]),
        ],
    );
    let r = reader(&ledger);
    let notices = NoticeCenter::new();

    let mut found = CampaignDetailQuery::new(addr(1));
    assert!(found.state().is_loading());
    let campaign = found.refresh(&r, &notices).await.found().cloned().unwrap();
    assert_eq!(campaign.description, "A long story");
    assert!(campaign.requires_fdc);
    assert!(campaign.accepts("F-XRP"));

    let mut missing = CampaignDetailQuery::new(addr(9));
    assert_eq!(missing.refresh(&r, &notices).await, &Lookup::NotFound);
    assert!(notices.is_empty());

    ledger.set_transport_down(true);
    let mut offline = CampaignDetailQuery::new(addr(1));
    assert!(offline.refresh(&r, &notices).await.is_loading());
    assert_eq!(notices.len(), 1);
    assert_eq!(notices.drain()[0].title, "Network Error");
}

#[tokio::test]
async fn test_dashboard_requires_wallet() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    let tokens = TokenTable::from_config(&StarterConfig::default()).unwrap();
    let err = load_dashboard(&reader(&ledger), ledger.as_ref(), &tokens, None)
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotConnected);
}

#[tokio::test]
async fn test_dashboard_reads_contributions_per_configured_token() {
    let ledger = Arc::new(MockLedger::new(Journal::default()));
    let me = addr(0xee);
    seed_campaign(&ledger, addr(1), "Mine", me);
    seed_campaign(&ledger, addr(2), "Theirs", addr(0xa2));
    ledger.respond_tokens(addr(2), "contributions", &[eth(3)]);
    let tokens = TokenTable::from_config(&StarterConfig::default()).unwrap();

    let d = build_dashboard(ledger.as_ref(), &tokens, me, &[addr(1), addr(2)])
        .await
        .unwrap();
    assert_eq!(d.my_campaigns.len(), 1);
    assert_eq!(d.my_campaigns[0].id, addr(1));
    // The mock answers every token the same way, so each configured ticker
    // shows up once for the second campaign.
    assert_eq!(d.contributions.len(), 3);
    assert_eq!(d.total_donated(), 9.0);

    let batches = ledger.batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2 * (4 + 3));
}

#[tokio::test]
async fn test_fdc_verification_round_trip() {
    let journal = Journal::default();
    let ledger = Arc::new(MockLedger::new(journal.clone()));
    let verifier = addr(0xfd);
    let fdc = FdcVerifier::new(ledger.clone(), verifier);

    ledger.respond_tokens(verifier, "checkVerification", &[Token::Bool(false)]);
    assert!(!fdc.is_verified(addr(0xaa)).await.unwrap());

    let wallet = MockWallet::connected(journal.clone(), addr(0xaa));
    let receipt = fdc.verify_me(&wallet).await.unwrap();
    assert!(receipt.success);
    assert_eq!(wallet.sent_functions(), vec!["verifyMe"]);

    let offline = MockWallet::disconnected(journal);
    assert_eq!(fdc.verify_me(&offline).await.unwrap_err(), LedgerError::NotConnected);
}
