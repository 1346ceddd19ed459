//! # Native Currency Balances
//!
//! The base currency (ETH) is not owned by any contract. It belongs to the
//! host environment, which moves it on a contract's behalf: attaching value
//! to a call deposits into the contract's account, and a payout moves it
//! back out.
//!
//! Some recipients cannot accept funds (think of a contract without a
//! payable fallback). [`NativeLedger::set_rejects_deposits`] marks such an
//! account so that any transfer to it fails with [`NativeError::Rejected`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::amount::Amount;

/// Errors from native currency movement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The sending account cannot cover the transfer.
    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// The account being debited.
        account: Address,
        /// Its current balance.
        balance: Amount,
        /// The amount that was requested.
        required: Amount,
    },

    /// The recipient refuses incoming transfers.
    #[error("recipient {0} does not accept funds")]
    Rejected(Address),

    /// Crediting would overflow the recipient's balance.
    #[error("balance overflow crediting {0}")]
    Overflow(Address),
}

/// Base-currency balances for every account the host knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: BTreeMap<Address, Amount>,
    #[serde(default)]
    rejecting: BTreeSet<Address>,
}

impl NativeLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the balance of `account`, or 0.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances.
    pub fn total(&self) -> Amount {
        self.balances.values().sum()
    }

    /// Creates funds out of thin air. Only genesis and test fixtures call this.
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<(), NativeError> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(NativeError::Overflow(account))?;
        Ok(())
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Fails without touching either balance if the recipient rejects
    /// deposits, the sender is short, or the credit would overflow.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), NativeError> {
        if self.rejecting.contains(to) {
            return Err(NativeError::Rejected(*to));
        }

        let balance = self.balance_of(from);
        if balance < amount {
            return Err(NativeError::InsufficientFunds {
                account: *from,
                balance,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(NativeError::Overflow(*to))?;

        self.balances.insert(*from, balance - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }

    /// Marks (or unmarks) `account` as unable to receive funds.
    pub fn set_rejects_deposits(&mut self, account: Address, rejects: bool) {
        if rejects {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    /// Returns `true` if transfers to `account` will be refused.
    pub fn rejects_deposits(&self, account: &Address) -> bool {
        self.rejecting.contains(account)
    }
}
