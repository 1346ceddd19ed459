//! Property tests for the ledger's conservation invariants.
//!
//! Random sequences of contributions (some valid, some not) are replayed
//! against a fresh chain, and after every step the books must balance:
//! base currency is neither created nor destroyed, VISAT supply equals
//! the sum of rewards, and per-address totals add up to `raised`.

use proptest::prelude::*;

use visa_contracts::Chain;
use visa_protocol::amount::WEI_PER_ETH;
use visa_protocol::config::{GenesisConfig, EXCHANGE_RATE};
use visa_protocol::{Address, Amount, ManualClock};

const LABELS: [&str; 3] = ["contributor", "alice", "deployer"];

#[derive(Debug, Clone)]
enum Step {
    Contribute { who: usize, campaign: u64, value: Amount },
    Advance(u64),
    Finalize { campaign: u64 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (0..LABELS.len(), 0u64..3, 0u128..=5 * WEI_PER_ETH)
            .prop_map(|(who, campaign, value)| Step::Contribute { who, campaign, value }),
        1 => (1u64..50).prop_map(Step::Advance),
        1 => (0u64..3).prop_map(|campaign| Step::Finalize { campaign }),
    ]
}

fn setup() -> (Chain<ManualClock>, ManualClock, Address) {
    let clock = ManualClock::new(1_000_000);
    let mut chain = Chain::deploy(&GenesisConfig::default(), clock.clone()).unwrap();
    let creator = Address::from_label("creator");
    for (country, duration) in [("Japan", 40), ("Germany", 80), ("Canada", 120)] {
        chain
            .create_campaign(creator, country, 3 * WEI_PER_ETH, duration)
            .unwrap();
    }
    (chain, clock, creator)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn books_always_balance(steps in prop::collection::vec(step(), 1..40)) {
        let (mut chain, clock, creator) = setup();
        let total_native = chain.native().total();
        let mut minted: Amount = 0;

        for step in steps {
            match step {
                Step::Contribute { who, campaign, value } => {
                    let addr = Address::from_label(LABELS[who]);
                    let token_before = chain.balance_of(&addr);
                    let raised_before = chain.get_campaign(campaign).unwrap().raised;
                    if let Ok(reward) = chain.contribute(addr, campaign, value) {
                        prop_assert_eq!(reward, value * EXCHANGE_RATE);
                        prop_assert_eq!(chain.balance_of(&addr), token_before + reward);
                        prop_assert_eq!(chain.get_campaign(campaign).unwrap().raised, raised_before + value);
                        prop_assert!(chain.has_visa(campaign, &addr));
                        minted += reward;
                    } else {
                        prop_assert_eq!(chain.balance_of(&addr), token_before);
                        prop_assert_eq!(chain.get_campaign(campaign).unwrap().raised, raised_before);
                    }
                }
                Step::Advance(secs) => {
                    clock.advance(secs);
                }
                Step::Finalize { campaign } => {
                    let raised = chain.get_campaign(campaign).unwrap().raised;
                    let before = chain.native_balance(&creator);
                    if chain.finalize_campaign(creator, campaign).is_ok() {
                        prop_assert_eq!(chain.native_balance(&creator), before + raised);
                        prop_assert_eq!(chain.get_campaign(campaign).unwrap().raised, raised);
                        prop_assert!(chain.finalize_campaign(creator, campaign).is_err());
                    }
                }
            }

            // Base currency is conserved across every account.
            prop_assert_eq!(chain.native().total(), total_native);
            // The ledger holds exactly what it has not yet paid out.
            prop_assert_eq!(
                chain.native_balance(&chain.ledger().address()),
                chain.ledger().outstanding()
            );
            // Supply is the sum of rewards and stays under the cap.
            prop_assert_eq!(chain.token().total_supply(), minted);
            prop_assert!(chain.token().total_supply() <= chain.token().cap());

            for campaign in chain.ledger().campaigns() {
                let per_address: Amount = chain
                    .ledger()
                    .contributors(campaign.id)
                    .iter()
                    .map(|(_, v)| *v)
                    .sum();
                prop_assert_eq!(per_address, campaign.raised);
                for (addr, _) in chain.ledger().contributors(campaign.id) {
                    prop_assert!(chain.has_visa(campaign.id, &addr));
                }
            }
        }
    }

    #[test]
    fn ids_are_sequential(count in 1usize..20) {
        let clock = ManualClock::new(0);
        let mut chain = Chain::deploy(&GenesisConfig::default(), clock).unwrap();
        let creator = Address::from_label("creator");
        for expected in 0..count as u64 {
            let id = chain.create_campaign(creator, "Nepal", 1, 10).unwrap();
            prop_assert_eq!(id, expected);
            let stored = chain.get_campaign(id).unwrap();
            prop_assert_eq!(stored.creator, creator);
            prop_assert_eq!(stored.goal, 1);
        }
    }

    #[test]
    fn strangers_never_finalize(label in "[a-z]{1,12}", advance in 0u64..200) {
        prop_assume!(label != "creator");
        let (mut chain, clock, _) = setup();
        clock.advance(advance);
        let stranger = Address::from_label(&label);
        prop_assert!(chain.finalize_campaign(stranger, 0).is_err());
        prop_assert!(!chain.get_campaign(0).unwrap().finalized);
    }
}
