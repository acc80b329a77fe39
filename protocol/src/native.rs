//! # Native Currency Ledger
//!
//! The host's base unit of value. Contracts don't hold native balances in
//! their own state; they ask the host to move value through the
//! [`NativeTransfer`] capability, and the host keeps the books.
//!
//! [`NativeLedger`] is the devnet implementation: one counter per account,
//! plus a set of accounts that refuse incoming payments (the equivalent of a
//! contract without a receive hook). Every [`send`](NativeTransfer::send) is
//! validated in full before anything is written, so a failed payment leaves
//! both sides untouched.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::amount::{self, Amount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while moving native currency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// The paying account does not hold enough.
    #[error("insufficient native funds in {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The paying account.
        account: Address,
        /// Its current balance.
        available: Amount,
        /// The amount it tried to pay.
        requested: Amount,
    },

    /// The recipient refuses native payments.
    #[error("recipient {0} rejected the native payment")]
    Rejected(Address),

    /// Crediting the recipient would exceed `u128::MAX`.
    #[error("native balance overflow for {0}")]
    Overflow(Address),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The host's native-currency payment mechanism, as seen by a contract.
pub trait NativeTransfer {
    /// Current native balance of `account`. Unknown accounts hold zero.
    fn native_balance(&self, account: &Address) -> Amount;

    /// Moves `amount` from `from` to `to`, atomically.
    ///
    /// # Errors
    ///
    /// Fails without side effects if `from` is short, `to` rejects payments,
    /// or `to` would overflow.
    fn send(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), NativeError>;
}

// ---------------------------------------------------------------------------
// NativeLedger
// ---------------------------------------------------------------------------

/// In-memory native balances for the devnet host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    #[serde(with = "amount::string_map")]
    balances: HashMap<Address, Amount>,
    #[serde(default)]
    rejecting: HashSet<Address>,
}

impl NativeLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `amount` into `account`. Genesis and test fixtures only.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::Overflow`] if the balance would exceed `u128::MAX`.
    pub fn fund(&mut self, account: Address, amount: Amount) -> Result<Amount, NativeError> {
        let current = self.native_balance(&account);
        let updated = current
            .checked_add(amount)
            .ok_or(NativeError::Overflow(account))?;
        self.balances.insert(account, updated);
        tracing::debug!(%account, amount = %amount, balance = %updated, "native account funded");
        Ok(updated)
    }

    /// Marks `account` as refusing (or accepting again) incoming payments.
    pub fn set_rejects_payments(&mut self, account: Address, rejects: bool) {
        if rejects {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    /// Returns `true` if `account` currently refuses payments.
    pub fn rejects_payments(&self, account: &Address) -> bool {
        self.rejecting.contains(account)
    }

    /// Sum of every balance in the ledger. Payments never change it.
    pub fn total_supply(&self) -> Amount {
        self.balances
            .values()
            .fold(0, |acc: Amount, b| acc.saturating_add(*b))
    }
}

impl NativeTransfer for NativeLedger {
    fn native_balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn send(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), NativeError> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(NativeError::InsufficientFunds {
                account: *from,
                available,
                requested: amount,
            });
        }
        if self.rejecting.contains(to) {
            return Err(NativeError::Rejected(*to));
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let credited = self
            .native_balance(to)
            .checked_add(amount)
            .ok_or(NativeError::Overflow(*to))?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        tracing::trace!(%from, %to, amount = %amount, "native payment");
        Ok(())
    }
}
