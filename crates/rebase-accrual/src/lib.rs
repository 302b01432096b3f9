//! # rebase-accrual: Linear interest accrual engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! A holder's effective balance grows linearly from its last settlement:
//! - **Growth factor**: `PRECISION + rate * elapsed`, no compounding between
//!   settlements. Compounding happens only when a mutation settles interest
//!   into principal.
//! - **Effective balance**: `principal * factor / PRECISION`, multiplied in
//!   256-bit and floored on the final division.
//! - **Overflow**: any result that does not fit a `u128` amount is an error,
//!   never a wrap.

pub mod engine;

pub use engine::LinearAccrual;
