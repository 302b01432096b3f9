//! Error types for the Rebase ledger.
use thiserror::Error;

use crate::types::{Address, Amount, Capability, Rate};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("interest rate can only decrease: current {current}, proposed {proposed}")] RateCanOnlyDecrease { current: Rate, proposed: Rate },
    #[error("{account} lacks the {capability} capability")] Unauthorized { account: Address, capability: Capability },
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("zero address is not a valid {0}")] ZeroAddress(&'static str),
    #[error("arithmetic overflow")] Overflow,
    #[error("external value release failed: {0}")] ExternalValueRelease(String),
}

impl From<AccrualError> for LedgerError {
    fn from(err: AccrualError) -> Self {
        match err {
            AccrualError::ArithmeticOverflow => LedgerError::Overflow,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length: expected 20 bytes, got {0}")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("load: {0}")] Load(String),
    #[error("invalid {field}: {reason}")] Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("I/O: {0}")] Io(String),
    #[error("format: {0}")] Format(String),
}

#[derive(Error, Debug)]
pub enum RebaseError {
    #[error(transparent)] Accrual(#[from] AccrualError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accrual_overflow_maps_to_ledger_overflow() {
        let err: LedgerError = AccrualError::ArithmeticOverflow.into();
        assert_eq!(err, LedgerError::Overflow);
    }

    #[test]
    fn unauthorized_message_names_capability() {
        let err = LedgerError::Unauthorized {
            account: Address::from_bytes([0xAB; 20]),
            capability: Capability::MintAndBurn,
        };
        let msg = err.to_string();
        assert!(msg.contains("mint-and-burn"), "{msg}");
        assert!(msg.contains("0xabab"), "{msg}");
    }

    #[test]
    fn umbrella_is_transparent() {
        let err: RebaseError = LedgerError::InsufficientBalance { have: 1, need: 2 }.into();
        assert_eq!(err.to_string(), "insufficient balance: have 1, need 2");
    }
}
