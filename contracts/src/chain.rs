//! # Chain Host
//!
//! The contracts are passive: they never look at the clock, never move
//! base currency on their own, and have no idea who is calling unless told.
//! [`Chain`] is the environment that tells them. It owns the native
//! balances, both contracts, and a clock, and it runs every operation as a
//! single transaction:
//!
//! 1. Snapshot the whole state.
//! 2. Apply the attached value (if any), then run the handler.
//! 3. On success, drain the contracts' event buffers into a [`Receipt`].
//! 4. On failure, restore the snapshot. Nothing leaks: no deposit, no
//!    half-minted reward, no event.
//!
//! Operations are serialized by `&mut self`. There is no concurrency to
//! speak of.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use visa_protocol::config::GenesisConfig;
use visa_protocol::{Address, Amount, Clock, NativeError, NativeLedger, Timestamp};

use crate::campaign_ledger::{Campaign, CampaignId, CampaignLedger, LedgerError};
use crate::events::Event;
use crate::reward_token::{RewardToken, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Any failure surfaced by the host. Wraps the component errors unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Moving base currency failed (e.g. the caller cannot cover the
    /// attached value).
    #[error(transparent)]
    Native(#[from] NativeError),

    /// The reward token rejected the operation.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The campaign ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Contracts never originate transactions; only accounts do.
    #[error("contract address {0} cannot be the caller of a transaction")]
    ContractCaller(Address),
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Record of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique transaction id.
    pub tx_id: Uuid,
    /// Operation name, e.g. `"contribute"`.
    pub operation: String,
    /// Who invoked it.
    pub caller: Address,
    /// Clock value when it ran.
    pub timestamp: Timestamp,
    /// Events emitted, in order.
    pub events: Vec<Event>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything a transaction can touch. Cloned for rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainState {
    /// Account that deployed both contracts.
    pub deployer: Address,
    /// Base-currency balances.
    pub native: NativeLedger,
    /// The VISAT token.
    pub token: RewardToken,
    /// The campaign ledger.
    pub ledger: CampaignLedger,
}

/// Serializable chain contents: state plus the committed receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub state: ChainState,
    #[serde(default)]
    pub receipts: Vec<Receipt>,
}

/// The host environment for the VISA contracts.
pub struct Chain<C: Clock> {
    clock: C,
    state: ChainState,
    receipts: Vec<Receipt>,
}

impl<C: Clock> Chain<C> {
    /// Boots a chain from genesis.
    ///
    /// Funds the genesis accounts, deploys the token, deploys the ledger
    /// pointed at the token, then registers the ledger as the token's only
    /// minter. The last step is an ordinary transaction issued by the
    /// deployer and shows up as the first receipt.
    pub fn deploy(config: &GenesisConfig, clock: C) -> Result<Self, ChainError> {
        let deployer = config.deployer_address();

        let mut native = NativeLedger::new();
        for account in &config.accounts {
            native.credit(account.address, account.balance)?;
        }

        let token_address = Address::contract(&deployer, 0);
        let ledger_address = Address::contract(&deployer, 1);
        let token = RewardToken::new(token_address, config.token_supply_cap);
        let ledger = CampaignLedger::new(ledger_address, token_address);

        tracing::info!(
            deployer = %deployer,
            token = %token_address,
            ledger = %ledger_address,
            accounts = config.accounts.len(),
            "contracts deployed"
        );

        let mut chain = Self {
            clock,
            state: ChainState {
                deployer,
                native,
                token,
                ledger,
            },
            receipts: Vec::new(),
        };
        chain.register_minter(deployer, ledger_address)?;
        Ok(chain)
    }

    /// Rebuilds a chain from a snapshot.
    pub fn restore(snapshot: ChainSnapshot, clock: C) -> Self {
        Self {
            clock,
            state: snapshot.state,
            receipts: snapshot.receipts,
        }
    }

    /// Captures the full chain contents.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            state: self.state.clone(),
            receipts: self.receipts.clone(),
        }
    }

    /// Runs `handler` as one all-or-nothing transaction. Callers equal to
    /// either contract's address are refused before anything runs.
    fn transact<T>(
        &mut self,
        operation: &str,
        caller: Address,
        handler: impl FnOnce(&mut ChainState, Timestamp) -> Result<T, ChainError>,
    ) -> Result<T, ChainError> {
        if caller == self.state.ledger.address() || caller == self.state.token.address() {
            tracing::warn!(operation, caller = %caller, "transaction from contract address refused");
            return Err(ChainError::ContractCaller(caller));
        }

        let now = self.clock.now();
        let snapshot = self.state.clone();

        match handler(&mut self.state, now) {
            Ok(value) => {
                let mut events = self.state.token.take_events();
                events.extend(self.state.ledger.take_events());
                let receipt = Receipt {
                    tx_id: Uuid::new_v4(),
                    operation: operation.to_string(),
                    caller,
                    timestamp: now,
                    events,
                };
                tracing::info!(
                    tx = %receipt.tx_id,
                    operation,
                    caller = %caller,
                    events = receipt.events.len(),
                    "transaction committed"
                );
                self.receipts.push(receipt);
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                tracing::warn!(operation, caller = %caller, error = %err, "transaction reverted");
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Token entry points
    // -----------------------------------------------------------------------

    /// Registers the token's minter. Fails once a minter is set.
    pub fn register_minter(&mut self, caller: Address, minter: Address) -> Result<(), ChainError> {
        self.transact("register_minter", caller, |s, _| {
            Ok(s.token.register_minter(&caller, minter)?)
        })
    }

    /// Direct mint call. Only succeeds when `caller` is the registered
    /// minter, which after [`deploy`](Self::deploy) is the ledger itself.
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), ChainError> {
        self.transact("mint", caller, |s, _| Ok(s.token.mint(&caller, &to, amount)?))
    }

    /// Transfers VISAT from `caller` to `to`.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), ChainError> {
        self.transact("transfer", caller, |s, _| {
            Ok(s.token.transfer(&caller, &to, amount)?)
        })
    }

    /// Sets `spender`'s allowance over `caller`'s VISAT.
    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<(), ChainError> {
        self.transact("approve", caller, |s, _| {
            Ok(s.token.approve(&caller, &spender, amount)?)
        })
    }

    /// Moves VISAT from `from` to `to` against `caller`'s allowance.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), ChainError> {
        self.transact("transfer_from", caller, |s, _| {
            Ok(s.token.transfer_from(&caller, &from, &to, amount)?)
        })
    }

    // -----------------------------------------------------------------------
    // Ledger entry points
    // -----------------------------------------------------------------------

    /// Opens a campaign owned by `caller`.
    pub fn create_campaign(
        &mut self,
        caller: Address,
        country: &str,
        goal: Amount,
        duration_secs: u64,
    ) -> Result<CampaignId, ChainError> {
        self.transact("create_campaign", caller, |s, now| {
            Ok(s.ledger.create_campaign(caller, country, goal, duration_secs, now)?)
        })
    }

    /// Contributes `value` wei from `caller` to a campaign ("buy a visa").
    /// Returns the VISAT reward minted.
    ///
    /// The value is moved into the ledger's account before the handler
    /// runs; any failure afterwards returns it.
    pub fn contribute(
        &mut self,
        caller: Address,
        campaign_id: CampaignId,
        value: Amount,
    ) -> Result<Amount, ChainError> {
        self.transact("contribute", caller, |s, now| {
            let ledger_address = s.ledger.address();
            s.native.transfer(&caller, &ledger_address, value)?;
            Ok(s.ledger
                .contribute(caller, value, campaign_id, now, &mut s.token)?)
        })
    }

    /// Closes a campaign and pays its creator. Returns the amount paid.
    pub fn finalize_campaign(&mut self, caller: Address, campaign_id: CampaignId) -> Result<Amount, ChainError> {
        self.transact("finalize_campaign", caller, |s, now| {
            Ok(s.ledger
                .finalize_campaign(caller, campaign_id, now, &mut s.native)?)
        })
    }

    // -----------------------------------------------------------------------
    // Host controls
    // -----------------------------------------------------------------------

    /// Credits base currency to an account outside of any transaction.
    pub fn fund(&mut self, account: Address, amount: Amount) -> Result<(), ChainError> {
        self.state.native.credit(account, amount)?;
        tracing::debug!(account = %account, amount = %amount, "account funded");
        Ok(())
    }

    /// Makes an account refuse (or accept again) incoming base currency.
    pub fn set_rejects_deposits(&mut self, account: Address, rejects: bool) {
        self.state.native.set_rejects_deposits(account, rejects);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Campaign record by id.
    pub fn get_campaign(&self, campaign_id: CampaignId) -> Result<&Campaign, LedgerError> {
        self.state.ledger.campaign(campaign_id)
    }

    pub fn has_visa(&self, campaign_id: CampaignId, account: &Address) -> bool {
        self.state.ledger.has_visa(campaign_id, account)
    }

    pub fn contributions(&self, campaign_id: CampaignId, account: &Address) -> Amount {
        self.state.ledger.contributions(campaign_id, account)
    }

    pub fn campaign_count(&self) -> u64 {
        self.state.ledger.campaign_count()
    }

    /// VISAT balance.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.token.balance_of(account)
    }

    /// Base-currency balance.
    pub fn native_balance(&self, account: &Address) -> Amount {
        self.state.native.balance_of(account)
    }

    pub fn token(&self) -> &RewardToken {
        &self.state.token
    }

    pub fn ledger(&self) -> &CampaignLedger {
        &self.state.ledger
    }

    pub fn native(&self) -> &NativeLedger {
        &self.state.native
    }

    pub fn deployer(&self) -> Address {
        self.state.deployer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Every committed receipt, oldest first.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Every committed event, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.receipts.iter().flat_map(|r| r.events.iter())
    }
}
