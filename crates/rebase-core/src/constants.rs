//! Ledger constants. All token values are in base units (1 RBT = 10^18 units).

use crate::types::{Amount, Rate};

/// Fixed-point denominator shared by every rate and growth factor.
///
/// A growth factor equal to `PRECISION` means "1.0x": no interest accrued.
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// One whole token in base units.
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Number of decimal places of the token.
pub const DECIMALS: u8 = 18;

/// Human-readable token name.
pub const TOKEN_NAME: &str = "Rebase Token";

/// Ticker symbol.
pub const TOKEN_SYMBOL: &str = "RBT";

/// Global interest rate at construction: `5 * PRECISION / 10^8` per second.
///
/// # Examples
///
/// ```
/// use rebase_core::constants::{DEFAULT_INTEREST_RATE, PRECISION};
/// assert_eq!(DEFAULT_INTEREST_RATE, 50_000_000_000);
/// assert_eq!(DEFAULT_INTEREST_RATE, 5 * PRECISION / 100_000_000);
/// ```
pub const DEFAULT_INTEREST_RATE: Rate = 5 * PRECISION / 100_000_000;

/// Numeric "everything" sentinel accepted by burn and transfer.
///
/// Maps to [`Quantity::All`](crate::types::Quantity::All).
pub const MAX_QUANTITY: Amount = u128::MAX;

/// An allowance of this size is never consumed by `transfer_from`.
pub const INFINITE_ALLOWANCE: Amount = u128::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_matches_decimals() {
        assert_eq!(TOKEN, 10u128.pow(DECIMALS as u32));
    }

    #[test]
    fn precision_is_one_token() {
        assert_eq!(PRECISION, TOKEN);
    }

    #[test]
    fn default_rate_well_below_precision() {
        // Roughly 0.000005% per second.
        assert!(DEFAULT_INTEREST_RATE < PRECISION / 1_000_000);
        assert!(DEFAULT_INTEREST_RATE > 0);
    }
}
