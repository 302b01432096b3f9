//! Thread-safe ledger handle.
//!
//! [`LedgerService`] serializes every operation through one mutex, so each
//! operation sees one clock sample and no other operation interleaves with
//! it. Committed events are published on a broadcast channel while the lock
//! is still held, which keeps subscribers in commit order.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use rebase_core::error::{LedgerError, SnapshotError};
use rebase_core::traits::Clock;
use rebase_core::types::{Address, Amount, Quantity, Rate};

use crate::config::LedgerConfig;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::state::LedgerSnapshot;

/// Capacity of the event channel. Slow subscribers see `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared, cloneable handle to a single ledger.
#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<Mutex<Ledger>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl LedgerService {
    /// Wrap an existing ledger. Events already queued on it are discarded.
    pub fn new(mut ledger: Ledger) -> Self {
        ledger.drain_events();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            events,
        }
    }

    /// Build from configuration, restoring the snapshot at
    /// `config.snapshot_path` if one exists.
    pub fn from_config(config: &LedgerConfig, clock: Arc<dyn Clock>) -> Result<Self, SnapshotError> {
        let ledger = if config.snapshot_path.exists() {
            let snapshot = LedgerSnapshot::load(&config.snapshot_path)?;
            debug!(path = %config.snapshot_path.display(), "restoring ledger from snapshot");
            Ledger::restore(snapshot, clock)
        } else {
            Ledger::from_config(config, clock)
        };
        Ok(Self::new(ledger))
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Run `f` atomically under the lock and publish what it committed.
    pub fn execute<T, E>(&self, f: impl FnOnce(&mut Ledger) -> Result<T, E>) -> Result<T, E> {
        let mut ledger = self.ledger.lock();
        let result = ledger.atomically(f);
        for event in ledger.drain_events() {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
        result
    }

    /// Run a read-only closure under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        f(&self.ledger.lock())
    }

    pub fn balance_of(&self, holder: &Address) -> Result<Amount, LedgerError> {
        self.read(|l| l.balance_of(holder))
    }

    pub fn principal_balance_of(&self, holder: &Address) -> Amount {
        self.read(|l| l.principal_balance_of(holder))
    }

    pub fn user_interest_rate(&self, holder: &Address) -> Rate {
        self.read(|l| l.user_interest_rate(holder))
    }

    pub fn interest_rate(&self) -> Rate {
        self.read(|l| l.interest_rate())
    }

    pub fn mint(
        &self,
        caller: &Address,
        holder: &Address,
        amount: Amount,
        rate_override: Option<Rate>,
    ) -> Result<(), LedgerError> {
        self.execute(|l| l.mint(caller, holder, amount, rate_override))
    }

    pub fn burn(
        &self,
        caller: &Address,
        holder: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.execute(|l| l.burn(caller, holder, quantity))
    }

    pub fn transfer(
        &self,
        sender: &Address,
        recipient: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.execute(|l| l.transfer(sender, recipient, quantity))
    }

    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.execute(|l| l.transfer_from(spender, from, to, quantity))
    }

    pub fn approve(&self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.execute(|l| l.approve(owner, spender, amount))
    }

    pub fn set_interest_rate(&self, caller: &Address, rate: Rate) -> Result<(), LedgerError> {
        self.execute(|l| l.set_interest_rate(caller, rate))
    }

    pub fn grant_mint_and_burn_role(&self, caller: &Address, account: &Address) -> Result<(), LedgerError> {
        self.execute(|l| l.grant_mint_and_burn_role(caller, account))
    }

    /// Write the current state to `path`.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let snapshot = self.read(|l| l.snapshot());
        snapshot.save(path)
    }
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}
