//! # Genesis Configuration
//!
//! Describes the initial state of a devnet: which accounts hold native
//! currency, which tokens exist, who deploys the vault and how the vault is
//! configured. Loaded from a JSON file; every field except `deployer` has a
//! default.
//!
//! ```json
//! {
//!   "deployer": "0x…",
//!   "vault": { "owner": "0x…" },
//!   "with_token_service": true,
//!   "accounts": [{ "address": "0x…", "native": "10000000000000000000000" }],
//!   "tokens": [{
//!     "issuer": "0x…", "name": "Alpha", "symbol": "ALPHA",
//!     "supply": "1000000000", "approve_vault": "1000000000"
//!   }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use vault_contracts::VaultConfig;
use vault_protocol::amount::{self, Amount};
use vault_protocol::config::{
    DEFAULT_ACCOUNT_FUNDING, DEFAULT_DEPLOYER_LABEL, DEFAULT_TOKEN_DECIMALS,
};
use vault_protocol::Address;

/// Initial devnet state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisConfig {
    /// Account that deploys the vault. Also its owner unless
    /// `vault.owner` says otherwise.
    pub deployer: Address,

    /// Vault constructor arguments.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Wire the vault to the devnet's token service when `vault.token_service`
    /// is not set explicitly.
    #[serde(default)]
    pub with_token_service: bool,

    /// Native balances at genesis.
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,

    /// Tokens created at genesis, in order.
    #[serde(default)]
    pub tokens: Vec<GenesisToken>,
}

/// A funded account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAccount {
    pub address: Address,
    #[serde(with = "amount::as_string", default = "default_funding")]
    pub native: Amount,
    /// Simulates a contract whose receive hook reverts.
    #[serde(default)]
    pub rejects_payments: bool,
}

/// A token created at genesis, with its whole supply minted to `issuer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisToken {
    pub issuer: Address,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(with = "amount::as_string")]
    pub supply: Amount,
    /// Allowance the issuer grants the vault right after deployment. Zero
    /// leaves it unset.
    #[serde(with = "amount::as_string", default)]
    pub approve_vault: Amount,
}

fn default_funding() -> Amount {
    DEFAULT_ACCOUNT_FUNDING
}

fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

impl Default for GenesisConfig {
    /// One funded deployer that owns the vault. No tokens.
    fn default() -> Self {
        let deployer = Address::from_label(DEFAULT_DEPLOYER_LABEL);
        Self {
            deployer,
            vault: VaultConfig::default(),
            with_token_service: true,
            accounts: vec![GenesisAccount {
                address: deployer,
                native: DEFAULT_ACCOUNT_FUNDING,
                rejects_payments: false,
            }],
            tokens: Vec::new(),
        }
    }
}

impl GenesisConfig {
    /// Reads and validates a genesis file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read genesis file {}", path.display()))?;
        let genesis: GenesisConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse genesis file {}", path.display()))?;
        genesis.validate()?;
        Ok(genesis)
    }

    /// Loads `path` when given, the default genesis otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Rejects configurations the devnet could only half-apply.
    pub fn validate(&self) -> Result<()> {
        if self.deployer.is_zero() {
            bail!("genesis deployer must not be the zero address");
        }
        if self.vault.owner.is_some_and(|o| o.is_zero()) {
            bail!("genesis vault owner must not be the zero address");
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address) {
                bail!("account {} is listed twice in genesis", account.address);
            }
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            if token.symbol.trim().is_empty() {
                bail!("token {:?} has an empty symbol", token.name);
            }
            if !symbols.insert(token.symbol.to_uppercase()) {
                bail!("token symbol {} is listed twice in genesis", token.symbol);
            }
            if token.issuer.is_zero() {
                bail!("token {} has a zero issuer", token.symbol);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn default_funds_the_deployer() {
        let genesis = GenesisConfig::default();
        genesis.validate().unwrap();
        assert_eq!(genesis.accounts.len(), 1);
        assert_eq!(genesis.accounts[0].address, genesis.deployer);
        assert_eq!(genesis.accounts[0].native, DEFAULT_ACCOUNT_FUNDING);
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let json = format!(
            r#"{{
                "deployer": "{}",
                "accounts": [{{ "address": "{}" }}],
                "tokens": [{{ "issuer": "{}", "name": "Alpha", "symbol": "alpha", "supply": "1000" }}]
            }}"#,
            addr("deployer"),
            addr("alice"),
            addr("deployer"),
        );
        let genesis: GenesisConfig = serde_json::from_str(&json).unwrap();
        assert!(!genesis.with_token_service);
        assert_eq!(genesis.vault, VaultConfig::default());
        assert_eq!(genesis.accounts[0].native, DEFAULT_ACCOUNT_FUNDING);
        assert_eq!(genesis.tokens[0].decimals, DEFAULT_TOKEN_DECIMALS);
        assert_eq!(genesis.tokens[0].supply, 1000);
        assert_eq!(genesis.tokens[0].approve_vault, 0);
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let genesis = GenesisConfig::default();
        write!(file, "{}", serde_json::to_string_pretty(&genesis).unwrap()).unwrap();

        let loaded = GenesisConfig::load(file.path()).unwrap();
        assert_eq!(loaded, genesis);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GenesisConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read genesis file"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let json = format!(r#"{{ "deployer": "{}", "validators": [] }}"#, addr("d"));
        assert!(serde_json::from_str::<GenesisConfig>(&json).is_err());
    }

    #[test]
    fn misspelled_vault_field_rejected() {
        let json = format!(
            r#"{{ "deployer": "{}", "vault": {{ "ownr": "{}" }} }}"#,
            addr("d"),
            addr("alice"),
        );
        let err = serde_json::from_str::<GenesisConfig>(&json).unwrap_err();
        assert!(err.to_string().contains("ownr"));

        let json = format!(
            r#"{{ "deployer": "{}", "vault": {{ "owner": "{}" }} }}"#,
            addr("d"),
            addr("alice"),
        );
        let genesis: GenesisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(genesis.vault.owner, Some(addr("alice")));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let mut genesis = GenesisConfig::default();
        for symbol in ["usd", "USD"] {
            genesis.tokens.push(GenesisToken {
                issuer: genesis.deployer,
                name: symbol.into(),
                symbol: symbol.into(),
                decimals: 6,
                supply: 1,
                approve_vault: 0,
            });
        }
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn zero_owner_rejected() {
        let mut genesis = GenesisConfig::default();
        genesis.vault.owner = Some(Address::ZERO);
        assert!(genesis.validate().is_err());
    }
}
