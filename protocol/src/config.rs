//! # Protocol Configuration & Constants
//!
//! Every magic number the vault and its devnet host rely on lives here.
//! If you're hardcoding one of these somewhere else, move it here.

use crate::address::Address;
use crate::amount::Amount;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Version of the vault ledger semantics. Bump when an operation's
/// accept/reject rules change, not when the node gains an endpoint.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Denominations
// ---------------------------------------------------------------------------

/// Decimal places of the native currency. 18, so that EVM tooling that
/// speaks in wei renders devnet balances without surprises.
pub const NATIVE_DECIMALS: u8 = 18;

/// One whole native unit in the smallest denomination.
pub const ONE_NATIVE: Amount = 1_000_000_000_000_000_000;

/// Decimal places given to tokens created without an explicit precision.
/// Six, like most fiat-backed stablecoins.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Native funding every genesis account gets when the genesis file does not
/// say otherwise: 10 000 whole units.
pub const DEFAULT_ACCOUNT_FUNDING: Amount = 10_000 * ONE_NATIVE;

/// Allowance value that `transfer_from` never decrements.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

// ---------------------------------------------------------------------------
// Well-known Addresses
// ---------------------------------------------------------------------------

/// Fixed address of the token service, mirroring where token-service
/// precompiles conventionally live (0x…0167).
pub const TOKEN_SERVICE_ADDRESS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x67,
]);

/// Label hashed into the default deployer address when no genesis file is given.
pub const DEFAULT_DEPLOYER_LABEL: &str = "deployer";

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default port for the JSON-RPC and REST API.
pub const DEFAULT_API_PORT: u16 = 9751;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9752;
