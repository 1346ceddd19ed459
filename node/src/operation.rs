//! # Operations
//!
//! One enum for everything the node can do to a chain. The `call`
//! subcommands build an [`Operation`] from flags; scenario files
//! deserialize a list of them from JSON. Both go through [`execute`].

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use visa_contracts::{CampaignId, Chain};
use visa_protocol::amount::{parse_units, serde_decimal};
use visa_protocol::config::TOKEN_DECIMALS;
use visa_protocol::{Amount, Timestamp};

use crate::metrics::LedgerMetrics;
use crate::state::{resolve_account, NodeClock};

/// A single step against the chain. Accounts are labels or `0x` addresses.
/// Amounts are whole-unit decimal strings (`"1.5"` is 1.5 ETH or VISAT).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    RegisterMinter {
        from: String,
        minter: String,
    },
    Mint {
        from: String,
        to: String,
        #[serde(deserialize_with = "units")]
        amount: Amount,
    },
    Transfer {
        from: String,
        to: String,
        #[serde(deserialize_with = "units")]
        amount: Amount,
    },
    Approve {
        from: String,
        spender: String,
        #[serde(deserialize_with = "units")]
        amount: Amount,
    },
    TransferFrom {
        from: String,
        owner: String,
        to: String,
        #[serde(deserialize_with = "units")]
        amount: Amount,
    },
    CreateCampaign {
        from: String,
        country: String,
        #[serde(deserialize_with = "units")]
        goal: Amount,
        /// Seconds from now until the deadline.
        duration: u64,
    },
    Contribute {
        from: String,
        campaign: CampaignId,
        #[serde(deserialize_with = "units")]
        value: Amount,
    },
    Finalize {
        from: String,
        campaign: CampaignId,
    },
    AdvanceTime {
        seconds: u64,
    },
    /// Credits base currency outside of any transaction.
    Fund {
        account: String,
        #[serde(deserialize_with = "units")]
        amount: Amount,
    },
    /// Makes an account refuse incoming base currency.
    RejectDeposits {
        account: String,
        #[serde(default = "yes")]
        rejects: bool,
    },
}

fn yes() -> bool {
    true
}

/// Accepts `"1.5"` or a bare integer number of whole units.
fn units<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Units {
        Text(String),
        Whole(u64),
    }

    let text = match Units::deserialize(deserializer)? {
        Units::Text(text) => text,
        Units::Whole(whole) => whole.to_string(),
    };
    parse_units(&text, TOKEN_DECIMALS).map_err(serde::de::Error::custom)
}

impl Operation {
    /// Name used for receipts and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RegisterMinter { .. } => "register_minter",
            Operation::Mint { .. } => "mint",
            Operation::Transfer { .. } => "transfer",
            Operation::Approve { .. } => "approve",
            Operation::TransferFrom { .. } => "transfer_from",
            Operation::CreateCampaign { .. } => "create_campaign",
            Operation::Contribute { .. } => "contribute",
            Operation::Finalize { .. } => "finalize_campaign",
            Operation::AdvanceTime { .. } => "advance_time",
            Operation::Fund { .. } => "fund",
            Operation::RejectDeposits { .. } => "reject_deposits",
        }
    }
}

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    CampaignCreated {
        id: CampaignId,
    },
    Reward {
        #[serde(with = "serde_decimal")]
        amount: Amount,
    },
    Payout {
        #[serde(with = "serde_decimal")]
        amount: Amount,
    },
    Time {
        now: Timestamp,
    },
}

/// Applies `op` to the chain and records it in `metrics`.
pub fn execute(
    chain: &mut Chain<NodeClock>,
    op: &Operation,
    metrics: Option<&LedgerMetrics>,
) -> Result<Outcome> {
    let result = apply(chain, op);

    if let Some(metrics) = metrics {
        metrics.observe(op.name(), &result);
        match (op, &result) {
            (Operation::Contribute { value, .. }, Ok(_)) => metrics.record_contribution(*value),
            (Operation::Finalize { .. }, Ok(_)) => metrics.campaigns_finalized_total.inc(),
            _ => {}
        }
    }
    result
}

fn apply(chain: &mut Chain<NodeClock>, op: &Operation) -> Result<Outcome> {
    let outcome = match op {
        Operation::RegisterMinter { from, minter } => {
            chain.register_minter(resolve_account(from)?, resolve_account(minter)?)?;
            Outcome::Done
        }
        Operation::Mint { from, to, amount } => {
            chain.mint(resolve_account(from)?, resolve_account(to)?, *amount)?;
            Outcome::Done
        }
        Operation::Transfer { from, to, amount } => {
            chain.transfer(resolve_account(from)?, resolve_account(to)?, *amount)?;
            Outcome::Done
        }
        Operation::Approve {
            from,
            spender,
            amount,
        } => {
            chain.approve(resolve_account(from)?, resolve_account(spender)?, *amount)?;
            Outcome::Done
        }
        Operation::TransferFrom {
            from,
            owner,
            to,
            amount,
        } => {
            chain.transfer_from(
                resolve_account(from)?,
                resolve_account(owner)?,
                resolve_account(to)?,
                *amount,
            )?;
            Outcome::Done
        }
        Operation::CreateCampaign {
            from,
            country,
            goal,
            duration,
        } => {
            let id = chain.create_campaign(resolve_account(from)?, country, *goal, *duration)?;
            Outcome::CampaignCreated { id }
        }
        Operation::Contribute {
            from,
            campaign,
            value,
        } => {
            let amount = chain.contribute(resolve_account(from)?, *campaign, *value)?;
            Outcome::Reward { amount }
        }
        Operation::Finalize { from, campaign } => {
            let amount = chain.finalize_campaign(resolve_account(from)?, *campaign)?;
            Outcome::Payout { amount }
        }
        Operation::AdvanceTime { seconds } => {
            let now = chain.clock().advance(*seconds)?;
            Outcome::Time { now }
        }
        Operation::Fund { account, amount } => {
            chain
                .fund(resolve_account(account)?, *amount)
                .context("funding failed")?;
            Outcome::Done
        }
        Operation::RejectDeposits { account, rejects } => {
            chain.set_rejects_deposits(resolve_account(account)?, *rejects);
            Outcome::Done
        }
    };
    Ok(outcome)
}
