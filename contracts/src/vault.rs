//! # Vault Contract
//!
//! A custodial ledger holding native currency and fungible tokens for a
//! single owner. The vault keeps two kinds of counters:
//!
//! - **native balance**: how much native currency it holds in custody;
//! - **token balances**: one counter per asset, created on first deposit,
//!   zero when absent.
//!
//! ## Who can do what
//!
//! | Operation                   | Caller | Direction |
//! |-----------------------------|--------|-----------|
//! | `deposit_native`            | anyone | in        |
//! | `transfer_native_from_user` | anyone | in        |
//! | `deposit_token`             | owner  | in        |
//! | `transfer_token_from_user`  | owner  | in        |
//! | `transfer_native_to_user`   | owner  | out       |
//! | `transfer_token_to_user`    | owner  | out       |
//! | `withdraw_native`           | owner  | out       |
//! | `withdraw_token`            | owner  | out       |
//!
//! Every outbound operation is bounded by the vault's own counter, never by
//! what the token contract reports. Inbound token operations only pull from
//! holders who approved the vault beforehand.
//!
//! ## Atomicity
//!
//! Each operation checks against the state at the start of the call,
//! computes the new counter, performs the external transfer, and commits the
//! counter only once that transfer succeeded. A failed call leaves the
//! counters and the event journal exactly as they were.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vault_protocol::amount::{self, Amount};
use vault_protocol::{
    Address, AssetId, AssetTransfer, CallContext, Chain, NativeError, NativeTransfer, TokenError,
};

use crate::ownable::{Ownable, OwnableError};

const INVALID_TRANSFER_AMOUNT: &str = "Invalid transfer amount";
const ZERO_INBOUND_TRANSFER: &str = "Transfer amount smaller than 0";
const INVALID_WITHDRAWAL_AMOUNT: &str = "Invalid withdrawal amount";
const ZERO_WITHDRAWAL: &str = "Withdraw amount smaller than 0";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The ownership guard rejected the call.
    #[error(transparent)]
    Ownership(#[from] OwnableError),

    /// Zero amount, or a native debit larger than the native counter.
    #[error("{reason}: requested {requested}, available {available}")]
    InvalidAmount {
        /// Which rule rejected the amount.
        reason: &'static str,
        /// The amount the caller asked for.
        requested: Amount,
        /// The counter it was checked against.
        available: Amount,
    },

    /// A token debit larger than the asset's counter.
    #[error("Insufficient balance: requested {requested} of {asset}, vault holds {available}")]
    InsufficientBalance {
        /// The asset being debited.
        asset: AssetId,
        /// The amount the caller asked for.
        requested: Amount,
        /// The vault's counter for that asset.
        available: Amount,
    },

    /// The token contract refused the pull or push.
    #[error("external transfer failed: {0}")]
    ExternalTransfer(#[from] TokenError),

    /// The host refused the native payment.
    #[error("native payment failed: {0}")]
    NativePayment(#[from] NativeError),

    /// A credit would push a counter past `u128::MAX`.
    #[error("counter overflow: crediting {amount} to {}", counter_label(.asset))]
    Overflow {
        /// `None` for the native counter.
        asset: Option<AssetId>,
        /// The credit that did not fit.
        amount: Amount,
    },

    /// Native value was attached to an operation that does not accept it.
    #[error("operation is not payable: {value} attached")]
    NonPayable {
        /// The attached value.
        value: Amount,
    },
}

impl VaultError {
    /// Short, stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::Ownership(OwnableError::Unauthorized(_)) => "unauthorized",
            VaultError::Ownership(OwnableError::InvalidOwner(_)) => "invalid_owner",
            VaultError::InvalidAmount { .. } => "invalid_amount",
            VaultError::InsufficientBalance { .. } => "insufficient_balance",
            VaultError::ExternalTransfer(_) => "external_transfer_failure",
            VaultError::NativePayment(_) => "native_payment_failure",
            VaultError::Overflow { .. } => "overflow",
            VaultError::NonPayable { .. } => "non_payable",
        }
    }

    /// Returns `true` if the caller was not the owner.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, VaultError::Ownership(OwnableError::Unauthorized(_)))
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Native currency entered custody.
    NativeDeposited {
        from: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    /// Tokens entered custody, pulled from `from`.
    TokenDeposited {
        asset: AssetId,
        from: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    /// Native currency left custody.
    NativeSent {
        to: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    /// Tokens left custody.
    TokenSent {
        asset: AssetId,
        to: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    /// The owner changed. `new` is zero after renouncement.
    OwnershipTransferred { previous: Address, new: Address },
}

/// A journaled [`VaultEvent`] with its position and commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic per-vault sequence number, starting at 0.
    pub sequence: u64,
    /// When the operation committed.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub event: VaultEvent,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Constructor arguments.
///
/// The token-service reference is configuration only; no operation
/// depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Owner of the vault. Defaults to the deployer.
    #[serde(default)]
    pub owner: Option<Address>,
    /// Token service the deployment was wired to, if any.
    #[serde(default)]
    pub token_service: Option<Address>,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The custody ledger.
///
/// Operations take the [`CallContext`] of the invocation and the host
/// capability they need. The vault is not `Sync`-safe by itself; callers
/// serialize access (see the node's devnet mutex).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    ownable: Ownable,
    #[serde(default)]
    token_service: Option<Address>,
    #[serde(with = "amount::as_string")]
    balance: Amount,
    #[serde(with = "amount::string_map")]
    balances: HashMap<AssetId, Amount>,
    #[serde(default)]
    events: Vec<EventRecord>,
    #[serde(default)]
    next_sequence: u64,
}

impl Vault {
    /// Creates a vault at `address`, owned by `owner`, with empty counters.
    ///
    /// # Errors
    ///
    /// Returns [`OwnableError::InvalidOwner`] (wrapped) for a zero owner.
    pub fn new(
        address: Address,
        owner: Address,
        token_service: Option<Address>,
    ) -> Result<Self, VaultError> {
        Ok(Self {
            address,
            ownable: Ownable::new(owner)?,
            token_service,
            balance: 0,
            balances: HashMap::new(),
            events: Vec::new(),
            next_sequence: 0,
        })
    }

    /// Deploys a vault on `chain` from `deployer`.
    ///
    /// The address is derived from the deployer's next contract nonce, and
    /// the owner defaults to the deployer. A rejected config does not
    /// consume a nonce.
    pub fn deploy(
        chain: &mut Chain,
        deployer: Address,
        config: VaultConfig,
    ) -> Result<Self, VaultError> {
        let owner = config.owner.unwrap_or(deployer);
        if owner.is_zero() {
            return Err(OwnableError::InvalidOwner(owner).into());
        }
        let address = chain.next_contract_address(&deployer);
        let vault = Self::new(address, owner, config.token_service)?;

        tracing::info!(
            vault = %address,
            %deployer,
            %owner,
            token_service = ?config.token_service.map(|a| a.to_hex()),
            "vault deployed"
        );
        Ok(vault)
    }

    // -- Read surface -------------------------------------------------------

    /// Address of the vault contract.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner (zero once renounced).
    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    /// Token service the vault was deployed with, if any.
    pub fn token_service(&self) -> Option<Address> {
        self.token_service
    }

    /// Native currency in custody.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Tokens of `asset` in custody. Zero for assets never deposited.
    pub fn balances(&self, asset: &AssetId) -> Amount {
        self.balances.get(asset).copied().unwrap_or(0)
    }

    /// Every asset the vault has ever tracked, with its counter.
    pub fn tracked_assets(&self) -> impl Iterator<Item = (AssetId, Amount)> + '_ {
        self.balances.iter().map(|(a, b)| (*a, *b))
    }

    /// Number of assets with a counter entry.
    pub fn tracked_asset_count(&self) -> usize {
        self.balances.len()
    }

    /// The event journal, oldest first.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Drains the event journal. Sequence numbers keep counting.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    // -- Native currency ----------------------------------------------------

    /// Funds the vault with the value attached to the call. Anyone may call;
    /// a zero-value deposit is accepted and changes nothing.
    ///
    /// Returns the new native balance.
    pub fn deposit_native<N: NativeTransfer>(
        &mut self,
        ctx: &CallContext,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        traced("deposit_native", ctx, || self.receive_native(ctx, native))
    }

    /// Funds the vault with the value attached to the call, rejecting empty
    /// calls. Anyone may call.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] if no value is attached.
    pub fn transfer_native_from_user<N: NativeTransfer>(
        &mut self,
        ctx: &CallContext,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        traced("transfer_native_from_user", ctx, || {
            if ctx.value == 0 {
                return Err(VaultError::InvalidAmount {
                    reason: ZERO_INBOUND_TRANSFER,
                    requested: 0,
                    available: self.balance,
                });
            }
            self.receive_native(ctx, native)
        })
    }

    /// Pays `amount` of native currency from custody to `to`. Owner only.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] if `amount` is zero or exceeds the
    /// native balance; [`VaultError::NativePayment`] if the payment fails.
    pub fn transfer_native_to_user<N: NativeTransfer>(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: Amount,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        traced("transfer_native_to_user", ctx, || {
            self.guard_owner(ctx)?;
            self.send_native(to, amount, INVALID_TRANSFER_AMOUNT, native)
        })
    }

    /// Pays `amount` of native currency from custody to the owner. Owner only.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] if `amount` is zero or exceeds the
    /// native balance.
    pub fn withdraw_native<N: NativeTransfer>(
        &mut self,
        ctx: &CallContext,
        amount: Amount,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        traced("withdraw_native", ctx, || {
            self.guard_owner(ctx)?;
            let owner = self.owner();
            self.send_native(owner, amount, INVALID_WITHDRAWAL_AMOUNT, native)
        })
    }

    // -- Tokens -------------------------------------------------------------

    /// Pulls `amount` of `asset` from the owner into custody. Owner only;
    /// the owner must have approved the vault beforehand.
    ///
    /// Returns the new counter for `asset`.
    pub fn deposit_token<A: AssetTransfer>(
        &mut self,
        ctx: &CallContext,
        asset: AssetId,
        amount: Amount,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        traced("deposit_token", ctx, || {
            self.guard_owner(ctx)?;
            self.pull_token(ctx.caller, asset, amount, assets)
        })
    }

    /// Pulls `amount` of `asset` from `from` into custody. Owner only;
    /// `from` must have approved the vault beforehand.
    pub fn transfer_token_from_user<A: AssetTransfer>(
        &mut self,
        ctx: &CallContext,
        from: Address,
        asset: AssetId,
        amount: Amount,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        traced("transfer_token_from_user", ctx, || {
            self.guard_owner(ctx)?;
            self.pull_token(from, asset, amount, assets)
        })
    }

    /// Pushes `amount` of `asset` from custody to `to`. Owner only.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidAmount`] for zero, [`VaultError::InsufficientBalance`]
    /// if `amount` exceeds the counter, [`VaultError::ExternalTransfer`] if
    /// the token contract refuses.
    pub fn transfer_token_to_user<A: AssetTransfer>(
        &mut self,
        ctx: &CallContext,
        to: Address,
        asset: AssetId,
        amount: Amount,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        traced("transfer_token_to_user", ctx, || {
            self.guard_owner(ctx)?;
            self.push_token(to, asset, amount, INVALID_TRANSFER_AMOUNT, assets)
        })
    }

    /// Pushes `amount` of `asset` from custody to the owner. Owner only.
    pub fn withdraw_token<A: AssetTransfer>(
        &mut self,
        ctx: &CallContext,
        asset: AssetId,
        amount: Amount,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        traced("withdraw_token", ctx, || {
            self.guard_owner(ctx)?;
            let owner = self.owner();
            self.push_token(owner, asset, amount, ZERO_WITHDRAWAL, assets)
        })
    }

    // -- Ownership ----------------------------------------------------------

    /// Hands the vault to `new_owner`. Owner only. Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<Address, VaultError> {
        traced("transfer_ownership", ctx, || {
            self.guard_owner(ctx)?;
            let previous = self.ownable.transfer_ownership(&ctx.caller, new_owner)?;
            self.record(VaultEvent::OwnershipTransferred {
                previous,
                new: new_owner,
            });
            Ok(previous)
        })
    }

    /// Leaves the vault ownerless. Every owner-gated operation fails
    /// afterwards, so whatever is in custody stays there.
    pub fn renounce_ownership(&mut self, ctx: &CallContext) -> Result<Address, VaultError> {
        traced("renounce_ownership", ctx, || {
            self.guard_owner(ctx)?;
            let previous = self.ownable.renounce_ownership(&ctx.caller)?;
            self.record(VaultEvent::OwnershipTransferred {
                previous,
                new: Address::ZERO,
            });
            Ok(previous)
        })
    }

    // -- Internals ----------------------------------------------------------

    /// Owner first, so a stranger always sees `Unauthorized`.
    fn guard_owner(&self, ctx: &CallContext) -> Result<(), VaultError> {
        self.ownable.check_owner(&ctx.caller)?;
        ensure_not_payable(ctx)
    }

    /// Moves the attached value into custody and credits the native counter.
    fn receive_native<N: NativeTransfer>(
        &mut self,
        ctx: &CallContext,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        let updated = self
            .balance
            .checked_add(ctx.value)
            .ok_or(VaultError::Overflow {
                asset: None,
                amount: ctx.value,
            })?;

        native.send(&ctx.caller, &self.address, ctx.value)?;

        self.balance = updated;
        self.record(VaultEvent::NativeDeposited {
            from: ctx.caller,
            amount: ctx.value,
        });
        Ok(updated)
    }

    fn send_native<N: NativeTransfer>(
        &mut self,
        to: Address,
        amount: Amount,
        reason: &'static str,
        native: &mut N,
    ) -> Result<Amount, VaultError> {
        if amount == 0 || amount > self.balance {
            return Err(VaultError::InvalidAmount {
                reason,
                requested: amount,
                available: self.balance,
            });
        }
        let remaining = self.balance - amount;

        native.send(&self.address, &to, amount)?;

        self.balance = remaining;
        self.record(VaultEvent::NativeSent { to, amount });
        Ok(remaining)
    }

    fn pull_token<A: AssetTransfer>(
        &mut self,
        from: Address,
        asset: AssetId,
        amount: Amount,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        let updated = self
            .balances(&asset)
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                asset: Some(asset),
                amount,
            })?;

        assets.transfer_from(&asset, &self.address, &from, &self.address, amount)?;

        self.balances.insert(asset, updated);
        self.record(VaultEvent::TokenDeposited {
            asset,
            from,
            amount,
        });
        Ok(updated)
    }

    fn push_token<A: AssetTransfer>(
        &mut self,
        to: Address,
        asset: AssetId,
        amount: Amount,
        zero_reason: &'static str,
        assets: &mut A,
    ) -> Result<Amount, VaultError> {
        let available = self.balances(&asset);
        if amount == 0 {
            return Err(VaultError::InvalidAmount {
                reason: zero_reason,
                requested: amount,
                available,
            });
        }
        if amount > available {
            return Err(VaultError::InsufficientBalance {
                asset,
                requested: amount,
                available,
            });
        }
        let remaining = available - amount;

        assets.transfer(&asset, &self.address, &to, amount)?;

        self.balances.insert(asset, remaining);
        self.record(VaultEvent::TokenSent { asset, to, amount });
        Ok(remaining)
    }

    fn record(&mut self, event: VaultEvent) {
        self.events.push(EventRecord {
            sequence: self.next_sequence,
            timestamp: Utc::now(),
            event,
        });
        self.next_sequence += 1;
    }
}

/// Names the counter an error refers to.
fn counter_label(asset: &Option<AssetId>) -> String {
    match asset {
        Some(asset) => asset.to_hex(),
        None => "native balance".to_string(),
    }
}

fn ensure_not_payable(ctx: &CallContext) -> Result<(), VaultError> {
    if ctx.carries_value() {
        return Err(VaultError::NonPayable { value: ctx.value });
    }
    Ok(())
}

/// Runs one vault operation and logs how it ended.
fn traced<T: std::fmt::Debug>(
    op: &'static str,
    ctx: &CallContext,
    f: impl FnOnce() -> Result<T, VaultError>,
) -> Result<T, VaultError> {
    let result = f();
    match &result {
        Ok(outcome) => {
            tracing::debug!(op, caller = %ctx.caller, value = %ctx.value, ?outcome, "vault call applied")
        }
        Err(e) => {
            tracing::warn!(op, caller = %ctx.caller, kind = e.kind(), error = %e, "vault call rejected")
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_protocol::config::ONE_NATIVE;

    struct Fixture {
        chain: Chain,
        vault: Vault,
        owner: Address,
        user: Address,
        token: AssetId,
    }

    fn fixture() -> Fixture {
        let mut chain = Chain::new();
        let owner = Address::from_label("owner");
        let user = Address::from_label("user");
        chain.fund(owner, 100 * ONE_NATIVE).unwrap();
        chain.fund(user, 100 * ONE_NATIVE).unwrap();

        let vault = Vault::deploy(&mut chain, owner, VaultConfig::default()).unwrap();
        let token = chain
            .tokens_mut()
            .create_token(owner, "Mock Token A", "MCKA", 6, 1_000)
            .unwrap();
        chain
            .tokens_mut()
            .approve(&token, &owner, &vault.address(), 1_000)
            .unwrap();

        Fixture {
            chain,
            vault,
            owner,
            user,
            token,
        }
    }

    #[test]
    fn deploy_defaults_owner_to_deployer() {
        let f = fixture();
        assert_eq!(f.vault.owner(), f.owner);
        assert_eq!(f.vault.address(), Address::contract(&f.owner, 0));
        assert_eq!(f.vault.balance(), 0);
        assert_eq!(f.vault.token_service(), None);
    }

    #[test]
    fn deploy_with_explicit_owner_and_service() {
        let mut chain = Chain::new();
        let deployer = Address::from_label("deployer");
        let owner = Address::from_label("owner");
        let service = chain.tokens().address();
        let vault = Vault::deploy(
            &mut chain,
            deployer,
            VaultConfig {
                owner: Some(owner),
                token_service: Some(service),
            },
        )
        .unwrap();
        assert_eq!(vault.owner(), owner);
        assert_eq!(vault.token_service(), Some(service));
    }

    #[test]
    fn deploy_with_zero_owner_consumes_no_nonce() {
        let mut chain = Chain::new();
        let deployer = Address::from_label("deployer");
        let err = Vault::deploy(
            &mut chain,
            deployer,
            VaultConfig {
                owner: Some(Address::ZERO),
                token_service: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_owner");
        assert_eq!(chain.nonce(&deployer), 0);
    }

    #[test]
    fn zero_value_native_deposit_is_accepted() {
        let mut f = fixture();
        let ctx = CallContext::new(f.user);
        assert_eq!(f.vault.deposit_native(&ctx, f.chain.native_mut()).unwrap(), 0);
        assert_eq!(f.vault.balance(), 0);
    }

    #[test]
    fn native_deposit_moves_host_funds() {
        let mut f = fixture();
        let ctx = CallContext::with_value(f.user, ONE_NATIVE);
        f.vault.deposit_native(&ctx, f.chain.native_mut()).unwrap();
        assert_eq!(f.vault.balance(), ONE_NATIVE);
        assert_eq!(f.chain.native_balance(&f.vault.address()), ONE_NATIVE);
        assert_eq!(f.chain.native_balance(&f.user), 99 * ONE_NATIVE);
    }

    #[test]
    fn native_deposit_beyond_caller_funds_fails_cleanly() {
        let mut f = fixture();
        let ctx = CallContext::with_value(f.user, 101 * ONE_NATIVE);
        let err = f.vault.deposit_native(&ctx, f.chain.native_mut()).unwrap_err();
        assert_eq!(err.kind(), "native_payment_failure");
        assert_eq!(f.vault.balance(), 0);
        assert!(f.vault.events().is_empty());
    }

    #[test]
    fn empty_inbound_transfer_rejected() {
        let mut f = fixture();
        let err = f
            .vault
            .transfer_native_from_user(&CallContext::new(f.user), f.chain.native_mut())
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InvalidAmount {
                reason: ZERO_INBOUND_TRANSFER,
                ..
            }
        ));
    }

    #[test]
    fn owner_ops_are_not_payable() {
        let mut f = fixture();
        let ctx = CallContext::with_value(f.owner, 1);
        let err = f
            .vault
            .withdraw_native(&ctx, 1, f.chain.native_mut())
            .unwrap_err();
        assert_eq!(err, VaultError::NonPayable { value: 1 });
    }

    #[test]
    fn rejected_native_payment_rolls_back_counter() {
        let mut f = fixture();
        f.vault
            .deposit_native(&CallContext::with_value(f.owner, 10), f.chain.native_mut())
            .unwrap();
        f.chain.native_mut().set_rejects_payments(f.user, true);

        let err = f
            .vault
            .transfer_native_to_user(&CallContext::new(f.owner), f.user, 5, f.chain.native_mut())
            .unwrap_err();
        assert!(matches!(err, VaultError::NativePayment(NativeError::Rejected(_))));
        assert_eq!(f.vault.balance(), 10);
        assert_eq!(f.chain.native_balance(&f.vault.address()), 10);
        assert_eq!(f.vault.events().len(), 1);
    }

    #[test]
    fn token_deposit_without_allowance_rolls_back() {
        let mut f = fixture();
        let err = f
            .vault
            .deposit_token(&CallContext::new(f.owner), f.token, 1_001, f.chain.tokens_mut())
            .unwrap_err();
        assert!(matches!(err, VaultError::ExternalTransfer(_)));
        assert_eq!(f.vault.balances(&f.token), 0);
        assert_eq!(f.vault.tracked_asset_count(), 0);
    }

    #[test]
    fn zero_token_push_rejected_with_reason() {
        let mut f = fixture();
        let owner = CallContext::new(f.owner);
        f.vault
            .deposit_token(&owner, f.token, 1_000, f.chain.tokens_mut())
            .unwrap();

        let err = f
            .vault
            .withdraw_token(&owner, f.token, 0, f.chain.tokens_mut())
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidAmount { reason: ZERO_WITHDRAWAL, .. }));

        let err = f
            .vault
            .transfer_token_to_user(&owner, f.user, f.token, 0, f.chain.tokens_mut())
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidAmount { reason: INVALID_TRANSFER_AMOUNT, .. }));
    }

    #[test]
    fn push_to_zero_address_fails_at_token_service() {
        let mut f = fixture();
        let owner = CallContext::new(f.owner);
        f.vault
            .deposit_token(&owner, f.token, 1_000, f.chain.tokens_mut())
            .unwrap();
        let err = f
            .vault
            .transfer_token_to_user(&owner, Address::ZERO, f.token, 1, f.chain.tokens_mut())
            .unwrap_err();
        assert_eq!(
            err,
            VaultError::ExternalTransfer(TokenError::InvalidReceiver(Address::ZERO))
        );
        assert_eq!(f.vault.balances(&f.token), 1_000);
    }

    #[test]
    fn native_counter_overflow_detected_before_payment() {
        let mut f = fixture();
        f.vault.balance = Amount::MAX;
        let err = f
            .vault
            .deposit_native(&CallContext::with_value(f.user, 1), f.chain.native_mut())
            .unwrap_err();
        assert_eq!(err, VaultError::Overflow { asset: None, amount: 1 });
        assert_eq!(f.chain.native_balance(&f.user), 100 * ONE_NATIVE);
    }

    #[test]
    fn overflow_message_names_the_counter() {
        let native = VaultError::Overflow { asset: None, amount: 7 };
        assert_eq!(
            native.to_string(),
            "counter overflow: crediting 7 to native balance"
        );

        let token = Address::from_label("token");
        let err = VaultError::Overflow { asset: Some(token), amount: 7 };
        assert_eq!(
            err.to_string(),
            format!("counter overflow: crediting 7 to {}", token.to_hex())
        );
    }

    #[test]
    fn events_are_sequenced_and_drainable() {
        let mut f = fixture();
        let owner = CallContext::new(f.owner);
        f.vault
            .deposit_native(&CallContext::with_value(f.user, 3), f.chain.native_mut())
            .unwrap();
        f.vault
            .deposit_token(&owner, f.token, 10, f.chain.tokens_mut())
            .unwrap();
        f.vault.transfer_ownership(&owner, f.user).unwrap();

        let events = f.vault.take_events();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(
            events[2].event,
            VaultEvent::OwnershipTransferred {
                previous: f.owner,
                new: f.user,
            }
        );
        assert!(f.vault.events().is_empty());

        f.vault
            .deposit_native(&CallContext::with_value(f.user, 1), f.chain.native_mut())
            .unwrap();
        assert_eq!(f.vault.events()[0].sequence, 3);
    }

    #[test]
    fn event_json_is_flat_and_tagged() {
        let record = EventRecord {
            sequence: 7,
            timestamp: Utc::now(),
            event: VaultEvent::NativeSent {
                to: Address::from_label("user"),
                amount: 5,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "native_sent");
        assert_eq!(json["amount"], "5");
        assert_eq!(json["sequence"], 7);
        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn vault_state_serializes() {
        let mut f = fixture();
        f.vault
            .deposit_token(&CallContext::new(f.owner), f.token, 1_000, f.chain.tokens_mut())
            .unwrap();
        let json = serde_json::to_string(&f.vault).unwrap();
        let restored: Vault = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.balances(&f.token), 1_000);
        assert_eq!(restored.owner(), f.owner);
    }

    #[test]
    fn error_kinds_are_stable() {
        let unauthorized = VaultError::from(OwnableError::Unauthorized(Address::ZERO));
        assert_eq!(unauthorized.kind(), "unauthorized");
        assert!(unauthorized.is_unauthorized());
        assert_eq!(
            VaultError::NonPayable { value: 1 }.kind(),
            "non_payable"
        );
    }
}
