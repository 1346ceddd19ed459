//! # VISAT Reward Token
//!
//! A fungible balance ledger with a hard supply ceiling. Holders can
//! transfer and delegate spending; new supply can only be created by one
//! registered minter, which in practice is the campaign ledger.
//!
//! ## Security Model
//!
//! - **Mint gating**: the minter slot starts empty and can be filled
//!   exactly once. Until then nobody can mint. Afterwards only that address
//!   can.
//! - **Supply ceiling**: `total_supply` never exceeds `cap`, and always
//!   equals the sum of all balances.
//! - **No lost tokens**: the zero address is refused as a recipient.
//! - **Validate, then mutate**: every failure path returns before the first
//!   balance is touched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use visa_protocol::amount::{format_units, serde_decimal};
use visa_protocol::config::{TOKEN_DECIMALS, TOKEN_NAME, TOKEN_SYMBOL};
use visa_protocol::{Address, Amount};

use crate::events::{Event, EventLog};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during reward token operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A minter has already been registered.
    #[error("already configured: minter is {0}")]
    AlreadyConfigured(Address),

    /// The caller is not the registered minter (or no minter is set).
    #[error("unauthorized: {0} is not the registered minter")]
    Unauthorized(Address),

    /// Minting zero tokens is meaningless.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The recipient is the zero address.
    #[error("invalid recipient: the zero address cannot receive tokens")]
    InvalidRecipient,

    /// The sender holds fewer tokens than requested.
    #[error("insufficient balance: account has {balance}, tried to move {required}")]
    InsufficientBalance {
        /// Current balance of the sender.
        balance: Amount,
        /// Amount the caller tried to move.
        required: Amount,
    },

    /// The spender's allowance does not cover the transfer.
    #[error("insufficient allowance: allowed {allowance}, tried to move {required}")]
    InsufficientAllowance {
        /// Remaining allowance.
        allowance: Amount,
        /// Amount the spender tried to move.
        required: Amount,
    },

    /// Minting would push total supply over the cap.
    #[error("supply exceeded: minting {requested} on top of {total_supply} would exceed cap {cap}")]
    SupplyExceeded {
        /// The fixed ceiling.
        cap: Amount,
        /// Supply before the mint.
        total_supply: Amount,
        /// The amount that was attempted.
        requested: Amount,
    },

    /// A balance computation overflowed.
    #[error("arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The VISAT token contract state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardToken {
    /// Address this token is deployed at.
    address: Address,
    /// Human-readable name.
    name: String,
    /// Ticker symbol.
    symbol: String,
    /// Decimal places.
    decimals: u8,
    /// Supply ceiling, fixed at construction.
    #[serde(with = "serde_decimal")]
    cap: Amount,
    /// Current total supply. Always equals the sum of `balances`.
    #[serde(with = "serde_decimal")]
    total_supply: Amount,
    /// Holder balances. Absent means zero.
    balances: BTreeMap<Address, Amount>,
    /// `owner -> (spender -> remaining allowance)`.
    #[serde(default)]
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    /// The single address allowed to mint, once set.
    minter: Option<Address>,
    #[serde(skip)]
    events: EventLog,
}

impl RewardToken {
    /// Deploys a fresh token at `address` with the given supply ceiling.
    /// No minter is registered and nobody holds anything.
    pub fn new(address: Address, cap: Amount) -> Self {
        Self {
            address,
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            cap,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            minter: None,
            events: EventLog::default(),
        }
    }

    /// Registers the one address that may mint.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::AlreadyConfigured`] if a minter is already set.
    pub fn register_minter(&mut self, caller: &Address, minter: Address) -> Result<(), TokenError> {
        if let Some(existing) = self.minter {
            return Err(TokenError::AlreadyConfigured(existing));
        }
        self.minter = Some(minter);
        tracing::info!(token = %self.address, caller = %caller, minter = %minter, "minter registered");
        Ok(())
    }

    /// Creates `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Unauthorized`] if `caller` is not the registered minter.
    /// - [`TokenError::ZeroAmount`] if `amount` is zero.
    /// - [`TokenError::InvalidRecipient`] if `to` is the zero address.
    /// - [`TokenError::SupplyExceeded`] if the cap would be crossed.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if self.minter.as_ref() != Some(caller) {
            return Err(TokenError::Unauthorized(*caller));
        }
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }

        let supply_exceeded = TokenError::SupplyExceeded {
            cap: self.cap,
            total_supply: self.total_supply,
            requested: amount,
        };
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| supply_exceeded.clone())?;
        if new_supply > self.cap {
            return Err(supply_exceeded);
        }
        // Balance <= total_supply <= cap, so this cannot overflow once the
        // supply check has passed.
        let new_balance = self.balance_of(to) + amount;

        self.total_supply = new_supply;
        self.balances.insert(*to, new_balance);

        tracing::debug!(
            to = %to,
            amount = %format_units(amount, self.decimals),
            total_supply = %format_units(self.total_supply, self.decimals),
            "VISAT minted"
        );
        Ok(())
    }

    /// Moves `amount` of the caller's tokens to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidRecipient`] if `to` is the zero address.
    /// - [`TokenError::InsufficientBalance`] if the caller holds less than `amount`.
    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(caller, to, amount)
    }

    /// Sets `spender`'s allowance over the caller's tokens to `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidRecipient`] if `spender` is the zero address.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        self.events.emit(Event::Approval {
            owner: *owner,
            spender: *spender,
            amount,
        });
        Ok(())
    }

    /// Moves `amount` from `from` to `to` using the caller's allowance.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientAllowance`] if the allowance is too small.
    /// - Anything [`transfer`](Self::transfer) can return.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                allowance,
                required: amount,
            });
        }

        self.move_balance(from, to, amount)?;
        self.allowances
            .entry(*from)
            .or_default()
            .insert(*spender, allowance - amount);
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                balance,
                required: amount,
            });
        }

        if from != to {
            let credited = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or(TokenError::Overflow)?;
            self.balances.insert(*from, balance - amount);
            self.balances.insert(*to, credited);
        }

        self.events.emit(Event::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Returns the balance of `account`, or 0.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// The registered minter, if any.
    pub fn minter(&self) -> Option<Address> {
        self.minter
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Number of addresses with a recorded balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Drains events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}
