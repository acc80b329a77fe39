//! # Devnet Chain
//!
//! The smallest host that can run the vault: a native ledger, a token
//! service, and per-deployer nonces for contract addresses. It does not
//! order transactions or produce blocks; callers serialize access to it
//! (the node keeps it behind a mutex).

use std::collections::HashMap;

use crate::address::Address;
use crate::amount::Amount;
use crate::native::{NativeError, NativeLedger, NativeTransfer};
use crate::token::TokenService;

/// Native ledger, token service, and deployment nonces for one devnet.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    native: NativeLedger,
    tokens: TokenService,
    nonces: HashMap<Address, u64>,
}

impl Chain {
    /// Creates an empty chain with the token service at its well-known address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to native balances.
    pub fn native(&self) -> &NativeLedger {
        &self.native
    }

    /// The native payment capability.
    pub fn native_mut(&mut self) -> &mut NativeLedger {
        &mut self.native
    }

    /// Read access to the token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// The asset transfer capability.
    pub fn tokens_mut(&mut self) -> &mut TokenService {
        &mut self.tokens
    }

    /// Credits `amount` of native currency to `account`.
    pub fn fund(&mut self, account: Address, amount: Amount) -> Result<Amount, NativeError> {
        self.native.fund(account, amount)
    }

    /// Native balance of `account`.
    pub fn native_balance(&self, account: &Address) -> Amount {
        self.native.native_balance(account)
    }

    /// Reserves the next contract address for `deployer` and bumps its nonce.
    pub fn next_contract_address(&mut self, deployer: &Address) -> Address {
        let nonce = self.nonces.entry(*deployer).or_insert(0);
        let address = Address::contract(deployer, *nonce);
        *nonce += 1;
        address
    }

    /// How many contracts `deployer` has created.
    pub fn nonce(&self, deployer: &Address) -> u64 {
        self.nonces.get(deployer).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetTransfer;

    #[test]
    fn contract_addresses_advance_per_deployer() {
        let mut chain = Chain::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        let a0 = chain.next_contract_address(&alice);
        let a1 = chain.next_contract_address(&alice);
        let b0 = chain.next_contract_address(&bob);

        assert_eq!(a0, Address::contract(&alice, 0));
        assert_eq!(a1, Address::contract(&alice, 1));
        assert_eq!(b0, Address::contract(&bob, 0));
        assert_eq!(chain.nonce(&alice), 2);
        assert_eq!(chain.nonce(&bob), 1);
    }

    #[test]
    fn fund_and_tokens_are_reachable() {
        let mut chain = Chain::new();
        let alice = Address::from_label("alice");
        chain.fund(alice, 500).unwrap();
        assert_eq!(chain.native_balance(&alice), 500);

        let id = chain
            .tokens_mut()
            .create_token(alice, "T", "TOK", 6, 10)
            .unwrap();
        assert_eq!(chain.tokens().balance_of(&id, &alice).unwrap(), 10);
    }
}
