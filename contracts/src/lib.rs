//! # Custody Vault Contracts
//!
//! On-chain logic for a custodial balance ledger. The vault holds native
//! currency and fungible tokens on behalf of a single owner:
//!
//! - **Vault**: the accounting state machine, with one native counter, one
//!   counter per asset, and the deposit / transfer / withdraw operations
//!   that move value in and out.
//! - **Ownable**: the single-owner guard every privileged operation goes
//!   through.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow: `checked_add` on every
//!    credit, and debits are bounded by the counter before they happen.
//! 2. Every operation is atomic: compute the new counter, make the external
//!    call, and commit only if the call succeeded.
//! 3. The vault's own counters are authoritative. It never asks a token
//!    contract what it holds before deciding whether a debit is allowed.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod ownable;
pub mod vault;

pub use ownable::{Ownable, OwnableError};
pub use vault::{EventRecord, Vault, VaultConfig, VaultError, VaultEvent};
