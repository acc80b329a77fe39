//! # Devnet
//!
//! Owns the simulated chain and the deployed vault, and turns decoded
//! JSON-RPC calls into vault or token-service operations.
//!
//! Every call names its caller in the `from` parameter; there are no
//! signatures on a devnet. Amounts travel as decimal strings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use vault_contracts::{EventRecord, Vault, VaultConfig, VaultError};
use vault_protocol::amount::{self, Amount};
use vault_protocol::{Address, AssetId, AssetTransfer, CallContext, Chain, TokenError};

use crate::genesis::GenesisConfig;

/// A state-changing or read-only call against the devnet.
///
/// Decoded from `{"method": ..., "params": {...}}`; params are named, never
/// positional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", content = "params", deny_unknown_fields)]
pub enum VaultCall {
    #[serde(rename = "vault_depositNative")]
    DepositNative {
        from: Address,
        #[serde(with = "amount::as_string", default)]
        value: Amount,
    },
    #[serde(rename = "vault_transferNativeFromUser")]
    TransferNativeFromUser {
        from: Address,
        #[serde(with = "amount::as_string", default)]
        value: Amount,
    },
    #[serde(rename = "vault_transferNativeToUser")]
    TransferNativeToUser {
        from: Address,
        to: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_withdrawNative")]
    WithdrawNative {
        from: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_depositToken")]
    DepositToken {
        from: Address,
        asset: AssetId,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_transferTokenFromUser")]
    TransferTokenFromUser {
        from: Address,
        user: Address,
        asset: AssetId,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_transferTokenToUser")]
    TransferTokenToUser {
        from: Address,
        to: Address,
        asset: AssetId,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_withdrawToken")]
    WithdrawToken {
        from: Address,
        asset: AssetId,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "vault_transferOwnership")]
    TransferOwnership { from: Address, new_owner: Address },
    #[serde(rename = "vault_renounceOwnership")]
    RenounceOwnership { from: Address },
    #[serde(rename = "vault_balance")]
    Balance,
    #[serde(rename = "vault_balances")]
    Balances { asset: AssetId },
    #[serde(rename = "vault_owner")]
    Owner,
    #[serde(rename = "token_approve")]
    TokenApprove {
        from: Address,
        asset: AssetId,
        spender: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "token_mint")]
    TokenMint {
        from: Address,
        asset: AssetId,
        to: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    #[serde(rename = "token_lookup")]
    TokenLookup { symbol: String },
    #[serde(rename = "token_balanceOf")]
    TokenBalanceOf { asset: AssetId, holder: Address },
    #[serde(rename = "token_allowance")]
    TokenAllowance {
        asset: AssetId,
        holder: Address,
        spender: Address,
    },
}

impl VaultCall {
    /// Every method name the devnet understands.
    pub const METHODS: &'static [&'static str] = &[
        "vault_depositNative",
        "vault_transferNativeFromUser",
        "vault_transferNativeToUser",
        "vault_withdrawNative",
        "vault_depositToken",
        "vault_transferTokenFromUser",
        "vault_transferTokenToUser",
        "vault_withdrawToken",
        "vault_transferOwnership",
        "vault_renounceOwnership",
        "vault_balance",
        "vault_balances",
        "vault_owner",
        "token_approve",
        "token_mint",
        "token_lookup",
        "token_balanceOf",
        "token_allowance",
    ];

    /// Decodes a call from a JSON-RPC method name and its params.
    pub fn decode(method: &str, params: Option<Value>) -> Result<Self, DecodeError> {
        if !Self::METHODS.contains(&method) {
            return Err(DecodeError::UnknownMethod(method.to_string()));
        }
        let mut envelope = serde_json::Map::new();
        envelope.insert("method".into(), Value::String(method.to_string()));
        if let Some(params) = params.filter(|p| !p.is_null()) {
            envelope.insert("params".into(), params);
        }
        serde_json::from_value(Value::Object(envelope))
            .map_err(|e| DecodeError::InvalidParams(e.to_string()))
    }

    /// Returns `true` for calls that cannot change state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            VaultCall::Balance
                | VaultCall::Balances { .. }
                | VaultCall::Owner
                | VaultCall::TokenLookup { .. }
                | VaultCall::TokenBalanceOf { .. }
                | VaultCall::TokenAllowance { .. }
        )
    }
}

/// Why a JSON-RPC request did not decode into a [`VaultCall`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("method not found: {0}")]
    UnknownMethod(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

/// Why an executed call failed.
#[derive(Debug, Error)]
pub enum CallError {
    /// The vault rejected the call.
    #[error(transparent)]
    Vault(#[from] VaultError),
    /// A direct token-service call failed.
    #[error("token service: {0}")]
    Token(#[from] TokenError),
}

impl CallError {
    /// Short, stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::Vault(e) => e.kind(),
            CallError::Token(_) => "token_service",
        }
    }
}

/// What `deploy` reports and `/status` partly mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    pub vault: Address,
    pub deployer: Address,
    pub owner: Address,
    pub token_service: Option<Address>,
    pub tokens: Vec<DeployedToken>,
}

/// A token created at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedToken {
    pub symbol: String,
    pub asset: AssetId,
    pub decimals: u8,
}

/// The simulated chain plus the vault deployed on it.
#[derive(Debug)]
pub struct Devnet {
    chain: Chain,
    vault: Vault,
    deployer: Address,
    tokens: Vec<DeployedToken>,
}

impl Devnet {
    /// Applies `genesis`: funds accounts, creates tokens, deploys the vault
    /// and grants the vault the configured allowances.
    pub fn from_genesis(genesis: &GenesisConfig) -> Result<Self> {
        genesis.validate()?;
        let mut chain = Chain::new();

        for account in &genesis.accounts {
            chain
                .fund(account.address, account.native)
                .with_context(|| format!("failed to fund {}", account.address))?;
            if account.rejects_payments {
                chain.native_mut().set_rejects_payments(account.address, true);
            }
        }

        let mut tokens = Vec::with_capacity(genesis.tokens.len());
        for token in &genesis.tokens {
            let asset = chain
                .tokens_mut()
                .create_token(
                    token.issuer,
                    &token.name,
                    &token.symbol,
                    token.decimals,
                    token.supply,
                )
                .with_context(|| format!("failed to create token {}", token.symbol))?;
            tokens.push(DeployedToken {
                symbol: token.symbol.to_uppercase(),
                asset,
                decimals: token.decimals,
            });
        }

        let token_service = match genesis.vault.token_service {
            Some(service) => Some(service),
            None if genesis.with_token_service => Some(chain.tokens().address()),
            None => None,
        };
        let vault = Vault::deploy(
            &mut chain,
            genesis.deployer,
            VaultConfig {
                owner: genesis.vault.owner,
                token_service,
            },
        )
        .context("failed to deploy vault")?;

        for (token, deployed) in genesis.tokens.iter().zip(&tokens) {
            if token.approve_vault > 0 {
                chain
                    .tokens_mut()
                    .approve(
                        &deployed.asset,
                        &token.issuer,
                        &vault.address(),
                        token.approve_vault,
                    )
                    .with_context(|| format!("failed to approve vault for {}", token.symbol))?;
            }
        }

        tracing::info!(
            vault = %vault.address(),
            owner = %vault.owner(),
            accounts = genesis.accounts.len(),
            tokens = tokens.len(),
            "devnet provisioned"
        );

        Ok(Self {
            chain,
            vault,
            deployer: genesis.deployer,
            tokens,
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Event journal of the vault.
    pub fn events(&self) -> &[EventRecord] {
        self.vault.events()
    }

    pub fn summary(&self) -> DeploymentSummary {
        DeploymentSummary {
            vault: self.vault.address(),
            deployer: self.deployer,
            owner: self.vault.owner(),
            token_service: self.vault.token_service(),
            tokens: self.tokens.clone(),
        }
    }

    /// Executes one call and renders its result as JSON.
    ///
    /// Mutating vault calls return the counter they touched (or the previous
    /// owner for ownership changes); reads return what they read.
    pub fn execute(&mut self, call: VaultCall) -> Result<Value, CallError> {
        let vault = &mut self.vault;
        let chain = &mut self.chain;

        let result = match call {
            VaultCall::DepositNative { from, value } => {
                let ctx = CallContext::with_value(from, value);
                balance_json(vault.deposit_native(&ctx, chain.native_mut())?)
            }
            VaultCall::TransferNativeFromUser { from, value } => {
                let ctx = CallContext::with_value(from, value);
                balance_json(vault.transfer_native_from_user(&ctx, chain.native_mut())?)
            }
            VaultCall::TransferNativeToUser { from, to, amount } => balance_json(
                vault.transfer_native_to_user(
                    &CallContext::new(from),
                    to,
                    amount,
                    chain.native_mut(),
                )?,
            ),
            VaultCall::WithdrawNative { from, amount } => balance_json(vault.withdraw_native(
                &CallContext::new(from),
                amount,
                chain.native_mut(),
            )?),
            VaultCall::DepositToken {
                from,
                asset,
                amount,
            } => balance_json(vault.deposit_token(
                &CallContext::new(from),
                asset,
                amount,
                chain.tokens_mut(),
            )?),
            VaultCall::TransferTokenFromUser {
                from,
                user,
                asset,
                amount,
            } => balance_json(vault.transfer_token_from_user(
                &CallContext::new(from),
                user,
                asset,
                amount,
                chain.tokens_mut(),
            )?),
            VaultCall::TransferTokenToUser {
                from,
                to,
                asset,
                amount,
            } => balance_json(vault.transfer_token_to_user(
                &CallContext::new(from),
                to,
                asset,
                amount,
                chain.tokens_mut(),
            )?),
            VaultCall::WithdrawToken {
                from,
                asset,
                amount,
            } => balance_json(vault.withdraw_token(
                &CallContext::new(from),
                asset,
                amount,
                chain.tokens_mut(),
            )?),
            VaultCall::TransferOwnership { from, new_owner } => {
                let previous = vault.transfer_ownership(&CallContext::new(from), new_owner)?;
                json!({ "previous": previous, "owner": new_owner })
            }
            VaultCall::RenounceOwnership { from } => {
                let previous = vault.renounce_ownership(&CallContext::new(from))?;
                json!({ "previous": previous, "owner": Address::ZERO })
            }
            VaultCall::Balance => balance_json(vault.balance()),
            VaultCall::Balances { asset } => balance_json(vault.balances(&asset)),
            VaultCall::Owner => json!({ "owner": vault.owner() }),
            VaultCall::TokenApprove {
                from,
                asset,
                spender,
                amount,
            } => {
                chain.tokens_mut().approve(&asset, &from, &spender, amount)?;
                json!({ "allowance": amount.to_string() })
            }
            VaultCall::TokenMint {
                from,
                asset,
                to,
                amount,
            } => {
                let supply = chain.tokens_mut().mint(&asset, &from, &to, amount)?;
                json!({ "total_supply": supply.to_string() })
            }
            VaultCall::TokenLookup { symbol } => {
                let asset = chain
                    .tokens()
                    .asset_by_symbol(&symbol)
                    .ok_or(TokenError::UnknownSymbol(symbol))?;
                json!(chain.tokens().token_info(&asset))
            }
            VaultCall::TokenBalanceOf { asset, holder } => {
                balance_json(chain.tokens().balance_of(&asset, &holder)?)
            }
            VaultCall::TokenAllowance {
                asset,
                holder,
                spender,
            } => {
                chain.tokens().token_info(&asset).ok_or(TokenError::UnknownAsset(asset))?;
                let allowance = chain.tokens().allowance(&asset, &holder, &spender);
                json!({ "allowance": allowance.to_string() })
            }
        };
        Ok(result)
    }
}

fn balance_json(balance: Amount) -> Value {
    json!({ "balance": balance.to_string() })
}
