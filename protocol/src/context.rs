//! # Call Context
//!
//! The host-provided facts about an invocation: who made the call and how
//! much native value was attached to it. Contracts read these; they never
//! construct them on behalf of someone else.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::{self, Amount};

/// Caller identity and attached native value for a single contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The account invoking the operation.
    pub caller: Address,
    /// Native value attached to the call, in the smallest denomination.
    #[serde(with = "amount::as_string", default)]
    pub value: Amount,
}

impl CallContext {
    /// A call from `caller` with no value attached.
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    /// A payable call from `caller` carrying `value`.
    pub fn with_value(caller: Address, value: Amount) -> Self {
        Self { caller, value }
    }

    /// Returns `true` if native value is attached.
    pub fn carries_value(&self) -> bool {
        self.value > 0
    }
}
