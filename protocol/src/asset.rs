//! # Asset Transfer Capability
//!
//! The vault never owns token logic. It holds custody by asking an external
//! fungible-token contract to move balances on its behalf, using the three
//! calls every ERC-20-style token exposes. [`AssetTransfer`] is that
//! interface; [`crate::token::TokenService`] is the devnet implementation.
//!
//! `approve` is deliberately absent: the vault only ever spends allowances
//! that holders granted to it beforehand.

use crate::address::Address;
use crate::amount::Amount;
use crate::token::TokenError;

/// Identifier of a fungible asset: the address of its token contract.
pub type AssetId = Address;

/// Fungible-asset transfers as seen by a contract holding custody.
///
/// `caller` is always the identity invoking the token contract (the vault,
/// when the vault is the one calling). Implementations must be
/// all-or-nothing: an `Err` means no balance or allowance changed.
pub trait AssetTransfer {
    /// Balance of `holder` as reported by the token contract itself.
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> Result<Amount, TokenError>;

    /// Pushes `amount` from `caller`'s own balance to `to`.
    fn transfer(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Pulls `amount` from `from` to `to`, spending the allowance `from`
    /// granted to `caller`.
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}
