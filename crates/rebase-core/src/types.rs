//! Core ledger types: addresses, amounts, holder accounts.
//!
//! Token values are `u128` base units, rates are `u128` scaled by
//! [`PRECISION`](crate::constants::PRECISION), and timestamps are `u64` seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::MAX_QUANTITY;
use crate::error::AddressError;

/// Token amount in base units.
pub type Amount = u128;

/// Per-second interest rate scaled by [`PRECISION`](crate::constants::PRECISION).
pub type Rate = u128;

/// Seconds since the Unix epoch (or any monotonic origin).
pub type Timestamp = u64;

/// A 20-byte account identifier.
///
/// Displays and serializes as a `0x`-prefixed lowercase hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid mint or transfer target.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from a byte array.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Amount argument for burn and transfer.
///
/// `All` is resolved against the holder's balance after settlement, so it
/// always covers interest accrued up to the instant of the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// A fixed number of base units.
    Exact(Amount),
    /// The holder's entire settled balance.
    All,
}

impl Quantity {
    /// Resolve against a settled balance.
    pub fn resolve(self, settled_balance: Amount) -> Amount {
        match self {
            Self::Exact(amount) => amount,
            Self::All => settled_balance,
        }
    }
}

impl From<Amount> for Quantity {
    /// [`MAX_QUANTITY`] is the numeric "everything" sentinel.
    fn from(amount: Amount) -> Self {
        if amount == MAX_QUANTITY {
            Self::All
        } else {
            Self::Exact(amount)
        }
    }
}

/// Capability required by a gated ledger operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Mint and burn on behalf of any holder (vault, bridge pool).
    MintAndBurn,
    /// Lower the global interest rate, grant and revoke roles.
    Governance,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MintAndBurn => f.write_str("mint-and-burn"),
            Self::Governance => f.write_str("governance"),
        }
    }
}

/// Per-holder accrual record.
///
/// `principal` excludes interest accrued since `last_settled`. The
/// `assigned_rate` is captured when the holder first goes from empty to
/// non-empty and survives a burn to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderAccount {
    /// Materialized tokens.
    pub principal: Amount,
    /// Locked-in per-second rate.
    pub assigned_rate: Rate,
    /// Time of the most recent settlement.
    pub last_settled: Timestamp,
}

impl HolderAccount {
    /// Seconds elapsed since the last settlement. Zero if `now` is earlier.
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.last_settled)
    }
}
