//! # rebase-ledger: Interest-accruing token ledger.
//!
//! Composes the core types and the accrual engine into a ledger:
//! - [`ledger::Ledger`]: balances, mint/burn, transfers, allowances, and
//!   governance, with settle-before-mutate and all-or-nothing operations
//! - [`access::AccessControl`]: owner plus mint-and-burn grantees
//! - [`service::LedgerService`]: mutex-guarded handle with an event channel
//! - [`state::LedgerSnapshot`]: JSON persistence
//! - [`config::LedgerConfig`]: layered configuration

pub mod access;
pub mod config;
pub mod events;
pub mod ledger;
pub mod service;
pub mod state;

pub use access::AccessControl;
pub use config::LedgerConfig;
pub use events::LedgerEvent;
pub use ledger::Ledger;
pub use service::LedgerService;
pub use state::{LedgerSnapshot, LedgerState};
