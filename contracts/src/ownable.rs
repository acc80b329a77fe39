//! # Ownable Guard
//!
//! Single-owner access control. The owner is fixed at construction and can
//! only change through [`Ownable::transfer_ownership`] or be given up for
//! good with [`Ownable::renounce_ownership`]. Contracts call
//! [`Ownable::check_owner`] at the top of every privileged operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vault_protocol::Address;

/// Errors raised by the ownership guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnableError {
    /// The caller is not the owner.
    #[error("unauthorized account: {0}")]
    Unauthorized(Address),

    /// The zero address cannot own anything.
    #[error("invalid owner: {0}")]
    InvalidOwner(Address),
}

/// The owner of a contract, or the zero address once ownership is renounced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    /// Sets the initial owner.
    ///
    /// # Errors
    ///
    /// Returns [`OwnableError::InvalidOwner`] for the zero address.
    pub fn new(initial_owner: Address) -> Result<Self, OwnableError> {
        if initial_owner.is_zero() {
            return Err(OwnableError::InvalidOwner(initial_owner));
        }
        Ok(Self {
            owner: initial_owner,
        })
    }

    /// The current owner. Zero after renouncement.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Returns `true` once ownership has been renounced.
    pub fn is_renounced(&self) -> bool {
        self.owner.is_zero()
    }

    /// Fails with [`OwnableError::Unauthorized`] unless `caller` is the owner.
    pub fn check_owner(&self, caller: &Address) -> Result<(), OwnableError> {
        if self.owner.is_zero() || *caller != self.owner {
            return Err(OwnableError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Hands ownership to `new_owner` and returns the previous owner.
    ///
    /// # Errors
    ///
    /// [`OwnableError::Unauthorized`] if `caller` is not the owner,
    /// [`OwnableError::InvalidOwner`] if `new_owner` is zero.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, OwnableError> {
        self.check_owner(caller)?;
        if new_owner.is_zero() {
            return Err(OwnableError::InvalidOwner(new_owner));
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Leaves the contract without an owner. Irreversible.
    pub fn renounce_ownership(&mut self, caller: &Address) -> Result<Address, OwnableError> {
        self.check_owner(caller)?;
        Ok(std::mem::replace(&mut self.owner, Address::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn zero_owner_rejected() {
        assert_eq!(
            Ownable::new(Address::ZERO),
            Err(OwnableError::InvalidOwner(Address::ZERO))
        );
    }

    #[test]
    fn only_owner_passes_the_guard() {
        let guard = Ownable::new(addr("owner")).unwrap();
        assert!(guard.check_owner(&addr("owner")).is_ok());
        assert_eq!(
            guard.check_owner(&addr("mallory")),
            Err(OwnableError::Unauthorized(addr("mallory")))
        );
    }

    #[test]
    fn transfer_moves_the_guard() {
        let mut guard = Ownable::new(addr("owner")).unwrap();
        let previous = guard
            .transfer_ownership(&addr("owner"), addr("heir"))
            .unwrap();
        assert_eq!(previous, addr("owner"));
        assert_eq!(guard.owner(), addr("heir"));
        assert!(guard.check_owner(&addr("owner")).is_err());
        assert!(guard.check_owner(&addr("heir")).is_ok());
    }

    #[test]
    fn transfer_by_stranger_rejected() {
        let mut guard = Ownable::new(addr("owner")).unwrap();
        assert_eq!(
            guard.transfer_ownership(&addr("mallory"), addr("mallory")),
            Err(OwnableError::Unauthorized(addr("mallory")))
        );
        assert_eq!(guard.owner(), addr("owner"));
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut guard = Ownable::new(addr("owner")).unwrap();
        assert_eq!(
            guard.transfer_ownership(&addr("owner"), Address::ZERO),
            Err(OwnableError::InvalidOwner(Address::ZERO))
        );
        assert_eq!(guard.owner(), addr("owner"));
    }

    #[test]
    fn renounce_locks_everyone_out() {
        let mut guard = Ownable::new(addr("owner")).unwrap();
        guard.renounce_ownership(&addr("owner")).unwrap();
        assert!(guard.is_renounced());
        assert!(guard.check_owner(&addr("owner")).is_err());
        // Not even a caller claiming the zero address.
        assert!(guard.check_owner(&Address::ZERO).is_err());
    }
}
