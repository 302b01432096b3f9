//! Cross-crate test suite for the Rebase ledger.
//!
//! Integration tests drive the ledger through the flows its collaborators
//! use (vault deposit and redeem, bridge burn and mint) and through
//! randomized operation sequences that try to break its invariants.

pub mod helpers;
