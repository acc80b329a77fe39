//! # Token Service
//!
//! An in-memory fungible-token registry standing in for the host's token
//! service. Any account can create a token; the creator becomes its issuer
//! and receives the initial supply. Holders grant allowances with
//! [`approve`](TokenService::approve), and contracts spend them through the
//! [`AssetTransfer`] capability.
//!
//! ## Semantics
//!
//! - **Asset ids** are derived from the service address and a creation
//!   nonce, so the same sequence of `create_token` calls always yields the
//!   same ids.
//! - **Allowances** are overwritten by `approve`, decremented by
//!   `transfer_from`, and never decremented when set to
//!   [`UNLIMITED_ALLOWANCE`].
//! - **Atomicity**: every mutation validates balances, allowances, and the
//!   receiver before touching state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::amount::{self, Amount};
use crate::asset::{AssetId, AssetTransfer};
use crate::config::{TOKEN_SERVICE_ADDRESS, UNLIMITED_ALLOWANCE};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by the token service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No token is registered under this id.
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// No token is registered under this symbol.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// A token with this symbol already exists.
    #[error("duplicate symbol: a token with symbol '{0}' already exists")]
    DuplicateSymbol(String),

    /// The spender's allowance does not cover the pull.
    #[error("insufficient allowance on {asset}: {spender} may spend {allowance}, requested {requested}")]
    InsufficientAllowance {
        /// The token being pulled.
        asset: AssetId,
        /// The account spending the allowance.
        spender: Address,
        /// Allowance currently granted.
        allowance: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// The source account does not hold enough.
    #[error("insufficient balance on {asset}: {holder} holds {balance}, requested {requested}")]
    InsufficientBalance {
        /// The token being moved.
        asset: AssetId,
        /// The account being debited.
        holder: Address,
        /// Its current balance.
        balance: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Tokens cannot be sent to the zero address.
    #[error("invalid receiver: {0}")]
    InvalidReceiver(Address),

    /// Only the issuer may mint.
    #[error("unauthorized mint on {asset} by {caller}")]
    UnauthorizedMint {
        /// The token.
        asset: AssetId,
        /// Who tried.
        caller: Address,
    },

    /// Supply or a balance would exceed `u128::MAX`.
    #[error("supply overflow on {0}")]
    Overflow(AssetId),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply of a registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token contract address.
    pub asset_id: AssetId,
    /// Human-readable name (e.g., "Mock Token A").
    pub name: String,
    /// Upper-cased ticker, unique across the service.
    pub symbol: String,
    /// Display precision.
    pub decimals: u8,
    /// Account that created the token and may mint more.
    pub issuer: Address,
    /// Current total supply.
    #[serde(with = "amount::as_string")]
    pub total_supply: Amount,
    /// When the token was created.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TokenLedger {
    info: TokenInfo,
    balances: HashMap<Address, Amount>,
    /// `(holder, spender) -> allowance`
    allowances: HashMap<(Address, Address), Amount>,
}

impl TokenLedger {
    fn balance(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, holder: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*holder, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Validates and applies a balance move. Nothing is written on error.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let asset = self.info.asset_id;
        if to.is_zero() {
            return Err(TokenError::InvalidReceiver(*to));
        }
        let balance = self.balance(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                asset,
                holder: *from,
                balance,
                requested: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow(asset))?;

        self.balances.insert(*from, balance - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TokenService
// ---------------------------------------------------------------------------

/// The devnet token service: every registered token and its books.
#[derive(Debug, Clone)]
pub struct TokenService {
    address: Address,
    nonce: u64,
    tokens: HashMap<AssetId, TokenLedger>,
    /// Upper-cased symbol -> asset id.
    symbol_index: HashMap<String, AssetId>,
}

impl TokenService {
    /// Creates an empty service at [`TOKEN_SERVICE_ADDRESS`].
    pub fn new() -> Self {
        Self {
            address: TOKEN_SERVICE_ADDRESS,
            nonce: 0,
            tokens: HashMap::new(),
            symbol_index: HashMap::new(),
        }
    }

    /// Address of the service itself.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Registers a new token, mints `initial_supply` to `issuer`, and
    /// returns the token's asset id.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::DuplicateSymbol`] if the symbol is taken
    /// (case-insensitive), or [`TokenError::InvalidReceiver`] for a zero issuer.
    pub fn create_token(
        &mut self,
        issuer: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
        initial_supply: Amount,
    ) -> Result<AssetId, TokenError> {
        if issuer.is_zero() {
            return Err(TokenError::InvalidReceiver(issuer));
        }
        let symbol_upper = symbol.to_uppercase();
        if self.symbol_index.contains_key(&symbol_upper) {
            return Err(TokenError::DuplicateSymbol(symbol.to_string()));
        }

        let asset_id = Address::contract(&self.address, self.nonce);
        self.nonce += 1;

        let mut balances = HashMap::new();
        if initial_supply > 0 {
            balances.insert(issuer, initial_supply);
        }
        let ledger = TokenLedger {
            info: TokenInfo {
                asset_id,
                name: name.to_string(),
                symbol: symbol_upper.clone(),
                decimals,
                issuer,
                total_supply: initial_supply,
                created_at: Utc::now(),
            },
            balances,
            allowances: HashMap::new(),
        };

        self.tokens.insert(asset_id, ledger);
        self.symbol_index.insert(symbol_upper.clone(), asset_id);
        tracing::info!(%asset_id, symbol = %symbol_upper, %issuer, supply = %initial_supply, "token created");
        Ok(asset_id)
    }

    /// Mints `amount` of `asset` to `to`. Issuer only.
    pub fn mint(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        let ledger = self.ledger_mut(asset)?;
        if ledger.info.issuer != *caller {
            return Err(TokenError::UnauthorizedMint {
                asset: *asset,
                caller: *caller,
            });
        }
        if to.is_zero() {
            return Err(TokenError::InvalidReceiver(*to));
        }
        let supply = ledger
            .info
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow(*asset))?;
        let balance = ledger
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow(*asset))?;

        ledger.info.total_supply = supply;
        ledger.balances.insert(*to, balance);
        Ok(supply)
    }

    /// Sets the allowance `holder` grants `spender`, replacing any previous value.
    pub fn approve(
        &mut self,
        asset: &AssetId,
        holder: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let ledger = self.ledger_mut(asset)?;
        ledger.allowances.insert((*holder, *spender), amount);
        tracing::debug!(%asset, %holder, %spender, amount = %amount, "allowance set");
        Ok(())
    }

    /// Allowance `holder` currently grants `spender`. Zero for unknown assets.
    pub fn allowance(&self, asset: &AssetId, holder: &Address, spender: &Address) -> Amount {
        self.tokens
            .get(asset)
            .map(|l| l.allowance(holder, spender))
            .unwrap_or(0)
    }

    /// Metadata for `asset`, or `None` if it was never created.
    pub fn token_info(&self, asset: &AssetId) -> Option<&TokenInfo> {
        self.tokens.get(asset).map(|l| &l.info)
    }

    /// Looks up an asset id by symbol (case-insensitive).
    pub fn asset_by_symbol(&self, symbol: &str) -> Option<AssetId> {
        self.symbol_index.get(&symbol.to_uppercase()).copied()
    }

    /// Number of registered tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn ledger(&self, asset: &AssetId) -> Result<&TokenLedger, TokenError> {
        self.tokens
            .get(asset)
            .ok_or(TokenError::UnknownAsset(*asset))
    }

    fn ledger_mut(&mut self, asset: &AssetId) -> Result<&mut TokenLedger, TokenError> {
        self.tokens
            .get_mut(asset)
            .ok_or(TokenError::UnknownAsset(*asset))
    }
}

impl Default for TokenService {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetTransfer for TokenService {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> Result<Amount, TokenError> {
        Ok(self.ledger(asset)?.balance(holder))
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.ledger_mut(asset)?.move_balance(caller, to, amount)?;
        tracing::trace!(%asset, from = %caller, %to, amount = %amount, "token transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let ledger = self.ledger_mut(asset)?;
        let allowance = ledger.allowance(from, caller);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                asset: *asset,
                spender: *caller,
                allowance,
                requested: amount,
            });
        }

        ledger.move_balance(from, to, amount)?;
        if allowance != UNLIMITED_ALLOWANCE {
            ledger.allowances.insert((*from, *caller), allowance - amount);
        }
        tracing::trace!(%asset, spender = %caller, %from, %to, amount = %amount, "token pull");
        Ok(())
    }
}
