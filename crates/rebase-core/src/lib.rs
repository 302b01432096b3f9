//! # rebase-core
//! Foundation types and traits for the Rebase interest-accruing ledger.

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
