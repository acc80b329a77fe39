// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Protocol Host Primitives
//!
//! Everything the custody vault needs from the world around it, and nothing
//! more. A real deployment gets these from the chain it runs on; the devnet
//! implementations here let the vault run, be tested, and be served without
//! one.
//!
//! ## Architecture
//!
//! - **address**: 20-byte identities and deterministic derivations.
//! - **amount**: `u128` amounts and their decimal-string wire form.
//! - **context**: who is calling, and how much value they attached.
//! - **native**: native-currency ledger and the payment capability.
//! - **asset**: the fungible-asset transfer capability the vault consumes.
//! - **token**: an in-memory token service implementing that capability.
//! - **chain**: the devnet host bundling all of the above.
//! - **config**: protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Every mutation is all-or-nothing. Validate first, then write.
//! 2. Checked arithmetic everywhere money moves.
//! 3. Capabilities are traits, so the vault never knows which host it is on.

pub mod address;
pub mod amount;
pub mod asset;
pub mod chain;
pub mod config;
pub mod context;
pub mod native;
pub mod token;

pub use address::{Address, AddressError};
pub use amount::Amount;
pub use asset::{AssetId, AssetTransfer};
pub use chain::Chain;
pub use context::CallContext;
pub use native::{NativeError, NativeLedger, NativeTransfer};
pub use token::{TokenError, TokenInfo, TokenService};
