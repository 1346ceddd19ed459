//! Integration tests for the visa crowdfunding flow.
//!
//! Each test boots its own chain from the default genesis: the deployer,
//! creator, contributor and alice accounts start with 10,000 ETH each, the
//! token is deployed with a 1,000,000 VISAT cap, and the ledger is wired in
//! as the only minter.

use visa_contracts::{Chain, ChainError, Event, LedgerError, TokenError};
use visa_protocol::amount::ether;
use visa_protocol::config::{GenesisConfig, DEFAULT_GENESIS_BALANCE};
use visa_protocol::{Address, ManualClock};

const DAY: u64 = 24 * 60 * 60;

struct Accounts {
    deployer: Address,
    creator: Address,
    contributor: Address,
    alice: Address,
}

/// Helper: deploys a fresh chain with a controllable clock.
fn setup() -> (Chain<ManualClock>, ManualClock, Accounts) {
    let clock = ManualClock::new(1_750_000_000);
    let chain = Chain::deploy(&GenesisConfig::default(), clock.clone()).expect("deploy");
    let accounts = Accounts {
        deployer: Address::from_label("deployer"),
        creator: Address::from_label("creator"),
        contributor: Address::from_label("contributor"),
        alice: Address::from_label("alice"),
    };
    (chain, clock, accounts)
}

// ---------------------------------------------------------------------------
// Acceptance Scenarios
// ---------------------------------------------------------------------------

#[test]
fn deploys_token_and_ledger_and_links_them() {
    let (chain, _, _) = setup();
    assert_eq!(chain.token().minter(), Some(chain.ledger().address()));
    assert_eq!(chain.token().total_supply(), 0);
    assert_eq!(chain.campaign_count(), 0);
}

#[test]
fn creates_a_visa_campaign() {
    let (mut chain, _, acc) = setup();
    let id = chain
        .create_campaign(acc.creator, "Japan", ether(5), 7 * DAY)
        .unwrap();
    assert_eq!(id, 0);

    let campaign = chain.get_campaign(0).unwrap();
    assert_eq!(campaign.country, "Japan");
    assert_eq!(campaign.goal, ether(5));
    assert_eq!(campaign.creator, acc.creator);
    assert_eq!(campaign.deadline, chain.now() + 7 * DAY);
    assert!(!campaign.finalized);
}

#[test]
fn buying_a_visa_mints_visat() {
    let (mut chain, _, acc) = setup();
    chain
        .create_campaign(acc.creator, "Germany", ether(1), 7 * DAY)
        .unwrap();

    let reward = chain.contribute(acc.contributor, 0, ether(1)).unwrap();

    assert_eq!(chain.contributions(0, &acc.contributor), ether(1));
    // 100 VISAT per ETH
    assert_eq!(chain.balance_of(&acc.contributor), ether(100));
    assert_eq!(reward, ether(100));
}

#[test]
fn contributor_becomes_visa_holder() {
    let (mut chain, _, acc) = setup();
    chain
        .create_campaign(acc.creator, "Canada", ether(1), 7 * DAY)
        .unwrap();
    assert!(!chain.has_visa(0, &acc.contributor));

    chain
        .contribute(acc.contributor, 0, ether(1) / 2)
        .unwrap();
    assert!(chain.has_visa(0, &acc.contributor));

    chain
        .contribute(acc.contributor, 0, ether(1) / 2)
        .unwrap();
    assert!(chain.has_visa(0, &acc.contributor));
    assert!(!chain.has_visa(0, &acc.alice));
}

#[test]
fn creator_finalizes_and_receives_eth() {
    let (mut chain, clock, acc) = setup();
    chain
        .create_campaign(acc.creator, "Australia", ether(1), 1)
        .unwrap();
    chain.contribute(acc.contributor, 0, ether(1)).unwrap();

    // move time forward
    clock.advance(2);

    let before = chain.native_balance(&acc.creator);
    let paid = chain.finalize_campaign(acc.creator, 0).unwrap();
    let after = chain.native_balance(&acc.creator);

    assert_eq!(paid, ether(1));
    assert_eq!(after - before, ether(1));
    assert_eq!(chain.get_campaign(0).unwrap().raised, ether(1));
    assert!(chain.get_campaign(0).unwrap().finalized);
}

#[test]
fn non_creator_cannot_finalize() {
    let (mut chain, clock, acc) = setup();
    chain
        .create_campaign(acc.creator, "France", ether(1), 1)
        .unwrap();
    clock.advance(2);

    let err = chain.finalize_campaign(acc.contributor, 0).unwrap_err();
    assert_eq!(
        err,
        ChainError::Ledger(LedgerError::Unauthorized {
            id: 0,
            caller: acc.contributor
        })
    );
    assert!(!chain.get_campaign(0).unwrap().finalized);
}

// ---------------------------------------------------------------------------
// Lifecycle Rules
// ---------------------------------------------------------------------------

#[test]
fn finalize_only_once() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Mexico", ether(1), 60).unwrap();
    chain.contribute(acc.contributor, 0, ether(3)).unwrap();
    clock.advance(60);

    chain.finalize_campaign(acc.creator, 0).unwrap();
    let balance = chain.native_balance(&acc.creator);

    let err = chain.finalize_campaign(acc.creator, 0).unwrap_err();
    assert_eq!(err, ChainError::Ledger(LedgerError::AlreadyFinalized(0)));
    assert_eq!(chain.native_balance(&acc.creator), balance);
}

#[test]
fn finalize_before_deadline_is_refused() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Mexico", ether(1), 60).unwrap();
    clock.advance(59);

    let err = chain.finalize_campaign(acc.creator, 0).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Ledger(LedgerError::DeadlineNotReached { .. })
    ));

    clock.advance(1);
    chain.finalize_campaign(acc.creator, 0).unwrap();
}

#[test]
fn underfunded_campaign_still_pays_creator() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Iceland", ether(50), 10).unwrap();
    chain.contribute(acc.alice, 0, ether(2)).unwrap();
    clock.advance(10);

    let before = chain.native_balance(&acc.creator);
    chain.finalize_campaign(acc.creator, 0).unwrap();
    assert_eq!(chain.native_balance(&acc.creator) - before, ether(2));
}

#[test]
fn late_contribution_rejected_and_refunded() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Egypt", ether(1), 30).unwrap();
    clock.advance(30);

    let err = chain.contribute(acc.contributor, 0, ether(1)).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Ledger(LedgerError::DeadlinePassed { .. })
    ));
    assert_eq!(chain.native_balance(&acc.contributor), DEFAULT_GENESIS_BALANCE);
    assert_eq!(chain.balance_of(&acc.contributor), 0);
    assert!(!chain.has_visa(0, &acc.contributor));
}

#[test]
fn contribution_to_finalized_campaign_is_closed() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Egypt", ether(1), 30).unwrap();
    clock.advance(30);
    chain.finalize_campaign(acc.creator, 0).unwrap();

    let err = chain.contribute(acc.contributor, 0, ether(1)).unwrap_err();
    assert_eq!(err, ChainError::Ledger(LedgerError::CampaignClosed(0)));
}

#[test]
fn zero_value_contribution_rejected() {
    let (mut chain, _, acc) = setup();
    chain.create_campaign(acc.creator, "Egypt", ether(1), 30).unwrap();
    let err = chain.contribute(acc.contributor, 0, 0).unwrap_err();
    assert_eq!(err, ChainError::Ledger(LedgerError::ZeroAmount));
}

#[test]
fn unknown_campaign_not_found() {
    let (mut chain, _, acc) = setup();
    assert_eq!(
        chain.contribute(acc.contributor, 4, ether(1)).unwrap_err(),
        ChainError::Ledger(LedgerError::NotFound(4))
    );
    assert_eq!(
        chain.finalize_campaign(acc.creator, 4).unwrap_err(),
        ChainError::Ledger(LedgerError::NotFound(4))
    );
    assert!(chain.get_campaign(4).is_err());
}

#[test]
fn rejecting_creator_blocks_payout_without_finalizing() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Oman", ether(1), 5).unwrap();
    chain.contribute(acc.contributor, 0, ether(1)).unwrap();
    clock.advance(5);
    chain.set_rejects_deposits(acc.creator, true);

    let err = chain.finalize_campaign(acc.creator, 0).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Ledger(LedgerError::TransferFailed { id: 0, .. })
    ));
    assert!(!chain.get_campaign(0).unwrap().finalized);
    assert_eq!(chain.native_balance(&chain.ledger().address()), ether(1));

    chain.set_rejects_deposits(acc.creator, false);
    chain.finalize_campaign(acc.creator, 0).unwrap();
    assert_eq!(chain.native_balance(&chain.ledger().address()), 0);
}

// ---------------------------------------------------------------------------
// Token Rules
// ---------------------------------------------------------------------------

#[test]
fn minter_cannot_be_reregistered() {
    let (mut chain, _, acc) = setup();
    let err = chain.register_minter(acc.deployer, acc.alice).unwrap_err();
    assert_eq!(
        err,
        ChainError::Token(TokenError::AlreadyConfigured(chain.ledger().address()))
    );
}

#[test]
fn only_contributions_mint() {
    let (mut chain, _, acc) = setup();
    let err = chain.mint(acc.deployer, acc.deployer, ether(1)).unwrap_err();
    assert_eq!(err, ChainError::Token(TokenError::Unauthorized(acc.deployer)));

    chain.create_campaign(acc.creator, "Iceland", ether(1), DAY).unwrap();
    chain.contribute(acc.alice, 0, ether(1)).unwrap();
    assert_eq!(chain.balance_of(&acc.alice), ether(100));
    assert_eq!(chain.token().total_supply(), ether(100));
}

#[test]
fn supply_cap_rejects_contribution_atomically() {
    let clock = ManualClock::new(1_750_000_000);
    let config = GenesisConfig {
        token_supply_cap: ether(150),
        ..GenesisConfig::default()
    };
    let mut chain = Chain::deploy(&config, clock).unwrap();
    let creator = Address::from_label("creator");
    let contributor = Address::from_label("contributor");
    chain.create_campaign(creator, "Fiji", ether(10), 3600).unwrap();

    chain.contribute(contributor, 0, ether(1)).unwrap();
    let err = chain.contribute(contributor, 0, ether(1)).unwrap_err();

    assert!(matches!(
        err,
        ChainError::Ledger(LedgerError::RewardMint(TokenError::SupplyExceeded { .. }))
    ));
    assert_eq!(chain.get_campaign(0).unwrap().raised, ether(1));
    assert_eq!(chain.contributions(0, &contributor), ether(1));
    assert_eq!(chain.native_balance(&contributor), DEFAULT_GENESIS_BALANCE - ether(1));
    assert_eq!(chain.token().total_supply(), ether(100));
}

#[test]
fn visat_transfers_between_holders() {
    let (mut chain, _, acc) = setup();
    chain.create_campaign(acc.creator, "Chile", ether(1), 3600).unwrap();
    chain.contribute(acc.contributor, 0, ether(1)).unwrap();

    chain
        .transfer(acc.contributor, acc.alice, ether(40))
        .unwrap();
    assert_eq!(chain.balance_of(&acc.contributor), ether(60));
    assert_eq!(chain.balance_of(&acc.alice), ether(40));

    assert_eq!(
        chain.transfer(acc.contributor, Address::ZERO, 1).unwrap_err(),
        ChainError::Token(TokenError::InvalidRecipient)
    );
    assert!(matches!(
        chain.transfer(acc.alice, acc.creator, ether(41)).unwrap_err(),
        ChainError::Token(TokenError::InsufficientBalance { .. })
    ));
}

#[test]
fn delegated_transfer_uses_allowance() {
    let (mut chain, _, acc) = setup();
    chain.create_campaign(acc.creator, "Chile", ether(1), 3600).unwrap();
    chain.contribute(acc.contributor, 0, ether(1)).unwrap();

    chain.approve(acc.contributor, acc.alice, ether(10)).unwrap();
    chain
        .transfer_from(acc.alice, acc.contributor, acc.creator, ether(10))
        .unwrap();
    assert_eq!(chain.balance_of(&acc.creator), ether(10));
    assert_eq!(chain.token().allowance(&acc.contributor, &acc.alice), 0);
}

// ---------------------------------------------------------------------------
// Host Rules
// ---------------------------------------------------------------------------

#[test]
fn contract_addresses_cannot_call() {
    let (mut chain, clock, acc) = setup();
    let ledger = chain.ledger().address();
    let token = chain.token().address();
    chain.create_campaign(acc.creator, "Norway", ether(5), DAY).unwrap();
    chain.create_campaign(acc.creator, "Sweden", ether(5), DAY).unwrap();
    chain.contribute(acc.contributor, 1, ether(5)).unwrap();
    let receipts = chain.receipts().len();

    // The ledger's own account is already funded, so a self-deposit would
    // otherwise count money that never arrived.
    let err = chain.contribute(ledger, 0, ether(5)).unwrap_err();
    assert_eq!(err, ChainError::ContractCaller(ledger));
    let err = chain.mint(ledger, acc.contributor, ether(1_000)).unwrap_err();
    assert_eq!(err, ChainError::ContractCaller(ledger));
    let err = chain.transfer(token, acc.alice, 1).unwrap_err();
    assert_eq!(err, ChainError::ContractCaller(token));
    assert!(chain.create_campaign(ledger, "Nowhere", 1, 1).is_err());

    assert_eq!(chain.receipts().len(), receipts);
    assert_eq!(chain.get_campaign(0).unwrap().raised, 0);
    assert_eq!(chain.balance_of(&acc.contributor), ether(500));
    assert_eq!(chain.ledger().outstanding(), ether(5));
    assert_eq!(chain.native_balance(&ledger), ether(5));

    clock.advance(DAY);
    assert_eq!(chain.finalize_campaign(acc.creator, 1).unwrap(), ether(5));
    assert_eq!(chain.finalize_campaign(acc.creator, 0).unwrap(), 0);
    assert_eq!(chain.native_balance(&ledger), 0);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn committed_operations_announce_events() {
    let (mut chain, clock, acc) = setup();
    let deadline = chain.now() + 100;
    chain.create_campaign(acc.creator, "Japan", ether(5), 100).unwrap();
    chain.contribute(acc.contributor, 0, ether(2)).unwrap();
    chain.transfer(acc.contributor, acc.alice, ether(1)).unwrap();
    clock.advance(100);
    chain.finalize_campaign(acc.creator, 0).unwrap();

    let events: Vec<Event> = chain.events().cloned().collect();
    assert_eq!(
        events,
        vec![
            Event::CampaignCreated {
                id: 0,
                country: "Japan".into(),
                goal: ether(5),
                deadline,
                creator: acc.creator,
            },
            Event::VisaPurchased {
                id: 0,
                contributor: acc.contributor,
                eth_amount: ether(2),
                reward: ether(200),
            },
            Event::Transfer {
                from: acc.contributor,
                to: acc.alice,
                amount: ether(1),
            },
            Event::CampaignFinalized { id: 0 },
        ]
    );
}

#[test]
fn rejected_operations_announce_nothing() {
    let (mut chain, clock, acc) = setup();
    chain.create_campaign(acc.creator, "Japan", ether(5), 100).unwrap();
    let count = chain.events().count();

    let _ = chain.contribute(acc.contributor, 0, 0);
    let _ = chain.finalize_campaign(acc.alice, 0);
    clock.advance(100);
    let _ = chain.contribute(acc.contributor, 0, ether(1));

    assert_eq!(chain.events().count(), count);
}
