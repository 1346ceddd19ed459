//! # Protocol Configuration & Constants
//!
//! Every magic number in VISA lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Compile-time constants cover the things that are never up for debate
//! (the exchange rate, decimals). [`GenesisConfig`] covers the things a
//! deployment chooses: the token cap, the starting clock, who starts with
//! money.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::{Amount, WEI_PER_ETH};
use crate::clock::Timestamp;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the ledger rules.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Reward Token
// ---------------------------------------------------------------------------

/// Human-readable reward token name.
pub const TOKEN_NAME: &str = "Visa Token";

/// Reward token ticker.
pub const TOKEN_SYMBOL: &str = "VISAT";

/// Decimal places for both VISAT and the base currency.
pub const TOKEN_DECIMALS: u8 = 18;

/// VISAT units minted per wei contributed. 1 ETH buys 100 VISAT.
/// Fixed forever: there is no governance over this number.
pub const EXCHANGE_RATE: Amount = 100;

/// Default supply ceiling in whole tokens (before decimal scaling).
pub const DEFAULT_SUPPLY_CAP_TOKENS: Amount = 1_000_000;

/// Default supply ceiling in the smallest unit.
pub const DEFAULT_SUPPLY_CAP: Amount = DEFAULT_SUPPLY_CAP_TOKENS * WEI_PER_ETH;

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Base-currency balance handed to every named genesis account, in wei.
/// 10,000 ETH, same as a local development chain.
pub const DEFAULT_GENESIS_BALANCE: Amount = 10_000 * WEI_PER_ETH;

/// Labels of the accounts pre-funded by [`GenesisConfig::default`].
/// Addresses are derived from these with [`Address::from_label`].
pub const DEFAULT_GENESIS_ACCOUNTS: [&str; 4] = ["deployer", "creator", "contributor", "alice"];

/// A single pre-funded account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Optional human label. Kept for display only.
    #[serde(default)]
    pub label: Option<String>,
    /// The account address.
    pub address: Address,
    /// Starting base-currency balance in wei.
    #[serde(with = "crate::amount::serde_decimal")]
    pub balance: Amount,
}

/// Deployment parameters for a fresh chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Reward token supply ceiling in the smallest unit.
    #[serde(with = "crate::amount::serde_decimal")]
    pub token_supply_cap: Amount,
    /// Clock value at genesis (unix seconds). `None` means "use whatever the
    /// clock says".
    #[serde(default)]
    pub genesis_time: Option<Timestamp>,
    /// Label of the account that deploys both contracts.
    pub deployer: String,
    /// Accounts funded with base currency at genesis.
    pub accounts: Vec<GenesisAccount>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            token_supply_cap: DEFAULT_SUPPLY_CAP,
            genesis_time: None,
            deployer: DEFAULT_GENESIS_ACCOUNTS[0].to_string(),
            accounts: DEFAULT_GENESIS_ACCOUNTS
                .iter()
                .map(|label| GenesisAccount {
                    label: Some(label.to_string()),
                    address: Address::from_label(label),
                    balance: DEFAULT_GENESIS_BALANCE,
                })
                .collect(),
        }
    }
}

impl GenesisConfig {
    /// Parses a genesis config from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Address of the deploying account.
    pub fn deployer_address(&self) -> Address {
        Address::from_label(&self.deployer)
    }
}
