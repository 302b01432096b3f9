//! Trait interfaces for the Rebase ledger.
//!
//! These traits define the seams between crates:
//! - [`AccrualCalculator`]: interest math (rebase-accrual implements)
//! - [`Clock`]: the time basis sampled once per ledger operation

use primitive_types::U256;

use crate::error::AccrualError;
use crate::types::{Amount, Rate, Timestamp};

/// Pure computation of growth factors and effective balances.
///
/// All math is integer fixed-point with
/// [`PRECISION`](crate::constants::PRECISION) as the denominator.
/// Implemented by the linear accrual engine (rebase-accrual).
pub trait AccrualCalculator: Send + Sync {
    /// Multiplicative growth factor after `elapsed` seconds at `rate`.
    ///
    /// Total: never fails. `PRECISION` means no growth.
    fn growth_factor(&self, rate: Rate, elapsed: u64) -> U256;

    /// Principal scaled by the growth factor, floored.
    ///
    /// Returns [`AccrualError::ArithmeticOverflow`] if the result is not
    /// representable as an [`Amount`].
    fn effective_balance(
        &self,
        principal: Amount,
        rate: Rate,
        elapsed: u64,
    ) -> Result<Amount, AccrualError>;

    /// Interest accrued but not yet materialized.
    ///
    /// Default implementation: `effective_balance(...) - principal`.
    fn accrued_interest(
        &self,
        principal: Amount,
        rate: Rate,
        elapsed: u64,
    ) -> Result<Amount, AccrualError> {
        let effective = self.effective_balance(principal, rate, elapsed)?;
        effective
            .checked_sub(principal)
            .ok_or(AccrualError::ArithmeticOverflow)
    }
}

/// Source of "now" for the ledger.
pub trait Clock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> Timestamp;
}
