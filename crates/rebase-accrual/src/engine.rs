//! Accrual engine implementing the [`AccrualCalculator`] trait.
//!
//! Interest grows linearly with elapsed time at the holder's assigned rate.
//! All arithmetic is integer-only with U256 intermediates so the
//! multiply-then-divide order never loses precision to an early division.

use primitive_types::U256;
use rebase_core::constants::PRECISION;
use rebase_core::error::AccrualError;
use rebase_core::traits::AccrualCalculator;
use rebase_core::types::{Amount, Rate};

/// The production accrual calculator.
///
/// Implements [`AccrualCalculator`] with:
/// - Linear growth factor `PRECISION + rate * elapsed`
/// - Floor division performed last
/// - Checked narrowing back to `u128`
#[derive(Debug, Clone, Default)]
pub struct LinearAccrual;

impl LinearAccrual {
    /// Create a new LinearAccrual.
    pub fn new() -> Self {
        Self
    }
}

/// Narrow a U256 to a `u128` amount, failing instead of truncating.
fn to_amount(value: U256) -> Result<Amount, AccrualError> {
    if value > U256::from(u128::MAX) {
        return Err(AccrualError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}

impl AccrualCalculator for LinearAccrual {
    fn growth_factor(&self, rate: Rate, elapsed: u64) -> U256 {
        // rate < 2^128 and elapsed < 2^64, so the product is below 2^192
        // and the sum cannot overflow 256 bits.
        U256::from(PRECISION) + U256::from(rate) * U256::from(elapsed)
    }

    fn effective_balance(
        &self,
        principal: Amount,
        rate: Rate,
        elapsed: u64,
    ) -> Result<Amount, AccrualError> {
        if principal == 0 {
            return Ok(0);
        }
        if rate == 0 || elapsed == 0 {
            return Ok(principal);
        }

        let factor = self.growth_factor(rate, elapsed);

        // effective = principal * factor / PRECISION
        let scaled = U256::from(principal)
            .checked_mul(factor)
            .ok_or(AccrualError::ArithmeticOverflow)?;

        to_amount(scaled / U256::from(PRECISION))
    }
}
