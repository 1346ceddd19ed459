//! Read-only views over a chain, rendered as JSON.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use visa_contracts::{Campaign, CampaignStatus, Chain};
use visa_protocol::amount::format_units;
use visa_protocol::config::TOKEN_DECIMALS;
use visa_protocol::Clock;

use crate::cli::QueryCommand;
use crate::state::resolve_account;

/// A campaign plus the facts derived from it at the current time.
#[derive(Debug, Serialize)]
pub struct CampaignView<'a> {
    #[serde(flatten)]
    pub campaign: &'a Campaign,
    pub status: CampaignStatus,
    pub expired: bool,
    pub goal_reached: bool,
    pub deadline_utc: Option<String>,
    pub contributors: usize,
}

impl<'a> CampaignView<'a> {
    pub fn new<C: Clock>(chain: &'a Chain<C>, campaign: &'a Campaign) -> Self {
        Self {
            campaign,
            status: campaign.status(),
            expired: campaign.is_expired(chain.now()),
            goal_reached: campaign.goal_reached(),
            deadline_utc: campaign.deadline_utc().map(|d| d.to_rfc3339()),
            contributors: chain.ledger().contributors(campaign.id).len(),
        }
    }
}

/// Every campaign, oldest first.
pub fn campaigns<C: Clock>(chain: &Chain<C>) -> Vec<CampaignView<'_>> {
    chain
        .ledger()
        .campaigns()
        .map(|c| CampaignView::new(chain, c))
        .collect()
}

/// Runs a query and returns its JSON rendering.
pub fn run<C: Clock>(chain: &Chain<C>, query: &QueryCommand) -> Result<Value> {
    let value = match query {
        QueryCommand::Campaign { id } => {
            let campaign = chain.get_campaign(*id)?;
            serde_json::to_value(CampaignView::new(chain, campaign))?
        }
        QueryCommand::Campaigns => serde_json::to_value(campaigns(chain))?,
        QueryCommand::Balance { account } => {
            let address = resolve_account(account)?;
            json!({
                "account": address,
                "eth": format_units(chain.native_balance(&address), TOKEN_DECIMALS),
                "visat": format_units(chain.balance_of(&address), TOKEN_DECIMALS),
            })
        }
        QueryCommand::Visa { campaign, account } => {
            let address = resolve_account(account)?;
            json!({
                "campaign": campaign,
                "account": address,
                "has_visa": chain.has_visa(*campaign, &address),
            })
        }
        QueryCommand::Contribution { campaign, account } => {
            let address = resolve_account(account)?;
            json!({
                "campaign": campaign,
                "account": address,
                "eth": format_units(chain.contributions(*campaign, &address), TOKEN_DECIMALS),
            })
        }
        QueryCommand::Token => {
            let token = chain.token();
            json!({
                "address": token.address(),
                "name": token.name(),
                "symbol": token.symbol(),
                "decimals": token.decimals(),
                "cap": format_units(token.cap(), token.decimals()),
                "total_supply": format_units(token.total_supply(), token.decimals()),
                "holders": token.holder_count(),
                "minter": token.minter(),
            })
        }
        QueryCommand::Events { last } => {
            let receipts = chain.receipts();
            let skip = last.map_or(0, |n| receipts.len().saturating_sub(n));
            serde_json::to_value(&receipts[skip..])?
        }
    };
    Ok(value)
}
