//! Shared helpers for scenario and adversarial tests.
//!
//! Includes minimal stand-ins for the two collaborators that drive the
//! ledger: a vault (deposit at a preserved rate, redeem then release) and a
//! bridge pool (burn locally, mint remotely at the carried rate).

use std::sync::Arc;

use rebase_core::clock::ManualClock;
use rebase_core::error::LedgerError;
use rebase_core::types::{Address, Amount, Quantity, Rate};
use rebase_ledger::Ledger;

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub const OWNER: Address = Address([0x01; 20]);
pub const VAULT: Address = Address([0x02; 20]);
pub const BRIDGE: Address = Address([0x03; 20]);

/// Ledger at time 0 with the vault and bridge holding mint-and-burn.
/// Setup events are drained.
pub fn setup() -> (Ledger, ManualClock) {
    let clock = ManualClock::new(0);
    let mut ledger = Ledger::new(OWNER, Arc::new(clock.clone()));
    ledger.grant_mint_and_burn_role(&OWNER, &VAULT).unwrap();
    ledger.grant_mint_and_burn_role(&OWNER, &BRIDGE).unwrap();
    ledger.drain_events();
    (ledger, clock)
}

/// Vault deposit: mint at the depositor's existing rate if it has one, so a
/// returning depositor keeps its original rate.
pub fn vault_deposit(ledger: &mut Ledger, depositor: &Address, amount: Amount) -> Result<(), LedgerError> {
    let preserved = ledger.holder(depositor).map(|h| h.assigned_rate);
    ledger.mint(&VAULT, depositor, amount, preserved)
}

/// Vault redeem: burn, then hand the burned amount to `release`. A release
/// failure rolls the burn back.
pub fn vault_redeem(
    ledger: &mut Ledger,
    holder: &Address,
    quantity: Quantity,
    release: impl FnOnce(Amount) -> Result<(), String>,
) -> Result<Amount, LedgerError> {
    ledger.atomically(|l| {
        let burned = l.burn(&VAULT, holder, quantity)?;
        release(burned).map_err(LedgerError::ExternalValueRelease)?;
        Ok(burned)
    })
}

/// Cross-ledger message produced by [`bridge_out`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeMessage {
    pub recipient: Address,
    pub amount: Amount,
    pub rate: Rate,
}

/// Burn `quantity` from `sender` and package it with the sender's rate.
pub fn bridge_out(
    ledger: &mut Ledger,
    sender: &Address,
    recipient: Address,
    quantity: Quantity,
) -> Result<BridgeMessage, LedgerError> {
    ledger.atomically(|l| {
        let rate = l.user_interest_rate(sender);
        let amount = l.burn(&BRIDGE, sender, quantity)?;
        Ok(BridgeMessage {
            recipient,
            amount,
            rate,
        })
    })
}

/// Mint an inbound message at the rate it carries.
pub fn bridge_in(ledger: &mut Ledger, message: &BridgeMessage) -> Result<(), LedgerError> {
    ledger.mint(&BRIDGE, &message.recipient, message.amount, Some(message.rate))
}
