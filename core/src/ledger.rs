//! Ledger primitives shared by the host, the gateway boundary and contracts.
//!
//! These are value objects only. Balances, signatures and accounts live in the
//! host; a contract sees an [`Address`] for its caller and an [`Amount`] of
//! attached value, nothing more.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error type for [`Address`] parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid address: {0}")]
pub struct ParseAddressError(String);

/// A 20-byte account or contract address.
///
/// [`Address::ZERO`] is reserved: it never signs a transaction and a ticket
/// held by it is unsold.
///
/// # Examples
///
/// ```
/// use seatsale_core::ledger::Address;
///
/// let address = Address::from_low_u64(0x5ea7);
/// assert_eq!(
///     address.to_string(),
///     "0x0000000000000000000000000000000000005ea7"
/// );
///
/// let parsed: Address = "0x0000000000000000000000000000000000005ea7".parse().unwrap();
/// assert_eq!(parsed, address);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// The reserved null address
    pub const ZERO: Self = Self([0; 20]);

    /// Create an address from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an address whose low 8 bytes hold `value` (big-endian)
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the reserved null address
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ParseAddressError(format!("{s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

/// Ledger value in the smallest native unit.
///
/// Arithmetic is explicit: use [`Amount::checked_sub`] or
/// [`Amount::saturating_sub`] so no operation can silently go negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    /// No value
    pub const ZERO: Self = Self(0);

    /// Create an amount
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Subtracts two amounts (returns None if the result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Subtracts two amounts, flooring at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Unique identifier for a submitted transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(Uuid);

impl TxId {
    /// Creates a new random `TxId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is calling and how much value they attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// The calling account
    pub sender: Address,
    /// Value attached to the call
    pub value: Amount,
}

impl CallContext {
    /// Creates a new `CallContext`
    #[must_use]
    pub const fn new(sender: Address, value: Amount) -> Self {
        Self { sender, value }
    }

    /// A call carrying no value
    #[must_use]
    pub const fn from_sender(sender: Address) -> Self {
        Self {
            sender,
            value: Amount::ZERO,
        }
    }
}

/// Value a contract method hands back to its caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnValue {
    /// No value
    #[default]
    Unit,
    /// Boolean result
    Bool(bool),
}

impl ReturnValue {
    /// The boolean result, if any
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Unit => None,
        }
    }
}
