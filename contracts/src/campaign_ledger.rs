//! # Campaign Ledger Contract
//!
//! Tracks visa crowdfunding campaigns. The lifecycle of a campaign is
//! deliberately short:
//!
//! 1. **Create** — anyone opens a campaign with a country label, a goal and
//!    a duration. The caller becomes the creator.
//! 2. **Contribute** — until the deadline, contributors attach base
//!    currency. Each contribution is recorded, marks the contributor as a
//!    visa holder, and mints `amount * EXCHANGE_RATE` VISAT to them.
//! 3. **Finalize** — once the deadline has passed, the creator (and only
//!    the creator) closes the campaign and receives everything raised.
//!    This happens exactly once.
//!
//! Goal attainment gates nothing. A campaign that misses its goal still
//! pays out; a contribution that hits the goal exactly does not close the
//! campaign early. There is no refund path.
//!
//! The attached value of a contribution is deposited into the ledger's
//! account by the host before [`CampaignLedger::contribute`] runs. The
//! ledger only does the bookkeeping and, on finalize, asks the host's
//! [`NativeLedger`] to pay the creator.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use visa_protocol::amount::{format_units, serde_decimal};
use visa_protocol::config::{EXCHANGE_RATE, TOKEN_DECIMALS};
use visa_protocol::{Address, Amount, NativeError, NativeLedger, Timestamp};

use crate::events::{Event, EventLog};
use crate::reward_token::{RewardToken, TokenError};

/// Sequential campaign identifier, starting at 0.
pub type CampaignId = u64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during campaign ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Creation arguments were malformed.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// No campaign with this id exists.
    #[error("campaign not found: {0}")]
    NotFound(CampaignId),

    /// Only the creator may finalize.
    #[error("unauthorized: {caller} is not the creator of campaign {id}")]
    Unauthorized {
        /// The campaign being finalized.
        id: CampaignId,
        /// Who tried.
        caller: Address,
    },

    /// The campaign has already been finalized.
    #[error("campaign {0} is already finalized")]
    AlreadyFinalized(CampaignId),

    /// Contributions are closed because the campaign was finalized.
    #[error("campaign {0} is closed")]
    CampaignClosed(CampaignId),

    /// The contribution window has ended.
    #[error("campaign {id} deadline {deadline} has passed (now {now})")]
    DeadlinePassed {
        id: CampaignId,
        deadline: Timestamp,
        now: Timestamp,
    },

    /// Finalize was attempted before the deadline.
    #[error("campaign {id} is still open until {deadline} (now {now})")]
    DeadlineNotReached {
        id: CampaignId,
        deadline: Timestamp,
        now: Timestamp,
    },

    /// A contribution carried no value.
    #[error("contribution must carry a non-zero amount")]
    ZeroAmount,

    /// Minting the reward failed, so the contribution was rejected.
    #[error("reward mint failed: {0}")]
    RewardMint(#[from] TokenError),

    /// The payout to the creator could not be delivered.
    #[error("payout for campaign {id} failed: {reason}")]
    TransferFailed {
        id: CampaignId,
        reason: NativeError,
    },

    /// A running total overflowed.
    #[error("arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a campaign is in its (two-step) life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// Accepting contributions until the deadline; awaiting finalize after.
    Open,
    /// Paid out. Terminal.
    Finalized,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Open => write!(f, "Open"),
            CampaignStatus::Finalized => write!(f, "Finalized"),
        }
    }
}

/// A single crowdfunding campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Sequential identifier.
    pub id: CampaignId,
    /// Display label for the destination country.
    pub country: String,
    /// Target amount in wei.
    #[serde(with = "serde_decimal")]
    pub goal: Amount,
    /// Contributions are accepted while `now < deadline`.
    pub deadline: Timestamp,
    /// Total wei contributed so far.
    #[serde(with = "serde_decimal")]
    pub raised: Amount,
    /// The campaign owner and sole finalizer.
    pub creator: Address,
    /// Set once, when the creator is paid.
    pub finalized: bool,
    /// When the campaign was opened.
    pub created_at: Timestamp,
}

impl Campaign {
    /// Current lifecycle status.
    pub fn status(&self) -> CampaignStatus {
        if self.finalized {
            CampaignStatus::Finalized
        } else {
            CampaignStatus::Open
        }
    }

    /// Returns `true` once the contribution window has closed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.deadline
    }

    /// Returns `true` if `raised` has reached `goal`. Informational only.
    pub fn goal_reached(&self) -> bool {
        self.raised >= self.goal
    }

    /// The deadline as a UTC datetime, for display.
    pub fn deadline_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.deadline)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// The campaign ledger contract state.
///
/// Campaigns live in an arena indexed by id. Contribution totals and visa
/// flags are keyed by campaign, then by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLedger {
    /// Address this ledger is deployed at. Holds contributed funds.
    address: Address,
    /// Address of the reward token this ledger mints through.
    reward_token: Address,
    campaigns: Vec<Campaign>,
    /// Cumulative wei per contributor per campaign.
    contributions: BTreeMap<CampaignId, BTreeMap<Address, Amount>>,
    /// Contributors flagged as visa holders per campaign.
    visa_holders: BTreeMap<CampaignId, BTreeSet<Address>>,
    #[serde(skip)]
    events: EventLog,
}

impl CampaignLedger {
    /// Deploys an empty ledger at `address`, wired to the token at
    /// `reward_token`. The token must register `address` as its minter
    /// before any contribution can succeed.
    pub fn new(address: Address, reward_token: Address) -> Self {
        Self {
            address,
            reward_token,
            campaigns: Vec::new(),
            contributions: BTreeMap::new(),
            visa_holders: BTreeMap::new(),
            events: EventLog::default(),
        }
    }

    /// Opens a new campaign and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidParameters`] if `country` is empty,
    /// `goal` is zero, `duration_secs` is zero, or the deadline would
    /// overflow.
    pub fn create_campaign(
        &mut self,
        caller: Address,
        country: &str,
        goal: Amount,
        duration_secs: u64,
        now: Timestamp,
    ) -> Result<CampaignId, LedgerError> {
        if country.is_empty() {
            return Err(LedgerError::InvalidParameters("country must not be empty".into()));
        }
        if goal == 0 {
            return Err(LedgerError::InvalidParameters("goal must be greater than zero".into()));
        }
        if duration_secs == 0 {
            return Err(LedgerError::InvalidParameters(
                "duration must be greater than zero".into(),
            ));
        }
        let deadline = now
            .checked_add(duration_secs)
            .ok_or_else(|| LedgerError::InvalidParameters("deadline overflows".into()))?;

        let id = self.campaigns.len() as CampaignId;
        self.campaigns.push(Campaign {
            id,
            country: country.to_string(),
            goal,
            deadline,
            raised: 0,
            creator: caller,
            finalized: false,
            created_at: now,
        });

        tracing::info!(
            id,
            country,
            goal = %format_units(goal, TOKEN_DECIMALS),
            deadline,
            creator = %caller,
            "campaign created"
        );
        self.events.emit(Event::CampaignCreated {
            id,
            country: country.to_string(),
            goal,
            deadline,
            creator: caller,
        });
        Ok(id)
    }

    /// Records a contribution of `value` wei from `caller` and mints the
    /// reward. Returns the number of VISAT units minted.
    ///
    /// The host must already have moved `value` into this ledger's account.
    /// If the mint fails, nothing in the ledger changes and the error is
    /// returned so the host can undo the deposit.
    ///
    /// # Errors
    ///
    /// In order of precedence: [`LedgerError::NotFound`],
    /// [`LedgerError::CampaignClosed`], [`LedgerError::DeadlinePassed`],
    /// [`LedgerError::ZeroAmount`], then [`LedgerError::RewardMint`] or
    /// [`LedgerError::Overflow`].
    pub fn contribute(
        &mut self,
        caller: Address,
        value: Amount,
        campaign_id: CampaignId,
        now: Timestamp,
        token: &mut RewardToken,
    ) -> Result<Amount, LedgerError> {
        let campaign = self.campaign(campaign_id)?;
        if campaign.finalized {
            return Err(LedgerError::CampaignClosed(campaign_id));
        }
        if campaign.is_expired(now) {
            return Err(LedgerError::DeadlinePassed {
                id: campaign_id,
                deadline: campaign.deadline,
                now,
            });
        }
        if value == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        // Every total is computed before the mint so that a failure at any
        // point leaves the ledger untouched.
        let reward = value.checked_mul(EXCHANGE_RATE).ok_or(LedgerError::Overflow)?;
        let raised = campaign.raised.checked_add(value).ok_or(LedgerError::Overflow)?;
        let contributed = self
            .contributions(campaign_id, &caller)
            .checked_add(value)
            .ok_or(LedgerError::Overflow)?;

        token.mint(&self.address, &caller, reward)?;

        self.campaigns[campaign_id as usize].raised = raised;
        self.contributions
            .entry(campaign_id)
            .or_default()
            .insert(caller, contributed);
        let first_visa = self.visa_holders.entry(campaign_id).or_default().insert(caller);

        tracing::info!(
            id = campaign_id,
            contributor = %caller,
            amount = %format_units(value, TOKEN_DECIMALS),
            reward = %format_units(reward, TOKEN_DECIMALS),
            raised = %format_units(raised, TOKEN_DECIMALS),
            first_visa,
            "visa purchased"
        );
        self.events.emit(Event::VisaPurchased {
            id: campaign_id,
            contributor: caller,
            eth_amount: value,
            reward,
        });
        Ok(reward)
    }

    /// Closes the campaign and pays everything raised to the creator.
    ///
    /// Allowed once `now >= deadline`, whether or not the goal was met.
    /// The payout happens before the campaign is marked finalized; if it
    /// fails, the campaign stays open and can be finalized again later.
    ///
    /// # Errors
    ///
    /// In order of precedence: [`LedgerError::NotFound`],
    /// [`LedgerError::Unauthorized`], [`LedgerError::AlreadyFinalized`],
    /// [`LedgerError::DeadlineNotReached`], [`LedgerError::TransferFailed`].
    pub fn finalize_campaign(
        &mut self,
        caller: Address,
        campaign_id: CampaignId,
        now: Timestamp,
        bank: &mut NativeLedger,
    ) -> Result<Amount, LedgerError> {
        let campaign = self.campaign(campaign_id)?;
        if campaign.creator != caller {
            return Err(LedgerError::Unauthorized {
                id: campaign_id,
                caller,
            });
        }
        if campaign.finalized {
            return Err(LedgerError::AlreadyFinalized(campaign_id));
        }
        if !campaign.is_expired(now) {
            return Err(LedgerError::DeadlineNotReached {
                id: campaign_id,
                deadline: campaign.deadline,
                now,
            });
        }

        let payout = campaign.raised;
        let creator = campaign.creator;
        bank.transfer(&self.address, &creator, payout)
            .map_err(|reason| LedgerError::TransferFailed {
                id: campaign_id,
                reason,
            })?;

        self.campaigns[campaign_id as usize].finalized = true;

        tracing::info!(
            id = campaign_id,
            creator = %creator,
            payout = %format_units(payout, TOKEN_DECIMALS),
            goal_reached = payout >= self.campaigns[campaign_id as usize].goal,
            "campaign finalized"
        );
        self.events.emit(Event::CampaignFinalized { id: campaign_id });
        Ok(payout)
    }

    /// Returns the campaign with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown id.
    pub fn campaign(&self, campaign_id: CampaignId) -> Result<&Campaign, LedgerError> {
        usize::try_from(campaign_id)
            .ok()
            .and_then(|idx| self.campaigns.get(idx))
            .ok_or(LedgerError::NotFound(campaign_id))
    }

    /// Whether `account` has ever contributed to the campaign.
    pub fn has_visa(&self, campaign_id: CampaignId, account: &Address) -> bool {
        self.visa_holders
            .get(&campaign_id)
            .map(|holders| holders.contains(account))
            .unwrap_or(false)
    }

    /// Cumulative wei `account` has contributed to the campaign, or 0.
    pub fn contributions(&self, campaign_id: CampaignId, account: &Address) -> Amount {
        self.contributions
            .get(&campaign_id)
            .and_then(|c| c.get(account))
            .copied()
            .unwrap_or(0)
    }

    /// Every contributor to a campaign with their cumulative amount.
    pub fn contributors(&self, campaign_id: CampaignId) -> Vec<(Address, Amount)> {
        self.contributions
            .get(&campaign_id)
            .map(|c| c.iter().map(|(a, v)| (*a, *v)).collect())
            .unwrap_or_default()
    }

    /// Number of campaigns ever created.
    pub fn campaign_count(&self) -> u64 {
        self.campaigns.len() as u64
    }

    /// All campaigns in id order.
    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter()
    }

    /// Sum of `raised` over campaigns not yet paid out. This is what the
    /// ledger's native account must hold.
    pub fn outstanding(&self) -> Amount {
        self.campaigns
            .iter()
            .filter(|c| !c.finalized)
            .map(|c| c.raised)
            .sum()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    /// Drains events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}
