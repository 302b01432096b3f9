//! The interest-accruing ledger.
//!
//! Balances are stored as principal plus a per-holder rate and settlement
//! time. Reads compute the effective balance without touching state. Every
//! mutation first settles the holders it touches, converting accrued interest
//! into principal at a single `now` sampled once for the whole operation.
//!
//! Mutations work on copies of the affected [`HolderAccount`]s and write them
//! back only after every check has passed, so a failed operation leaves no
//! trace. [`Ledger::atomically`] extends the same guarantee to a sequence of
//! operations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use rebase_accrual::LinearAccrual;
use rebase_core::clock::SystemClock;
use rebase_core::constants::{DEFAULT_INTEREST_RATE, INFINITE_ALLOWANCE};
use rebase_core::error::LedgerError;
use rebase_core::traits::{AccrualCalculator, Clock};
use rebase_core::types::{
    Address, Amount, Capability, HolderAccount, Quantity, Rate, Timestamp,
};

use crate::config::LedgerConfig;
use crate::events::LedgerEvent;
use crate::state::{LedgerSnapshot, LedgerState};

/// A holder brought current as of some `now`, not yet written back.
#[derive(Clone, Copy, Debug)]
struct Settled {
    account: HolderAccount,
    interest: Amount,
    /// Whether the address had a record before this operation.
    known: bool,
}

/// Interest-accruing token ledger.
pub struct Ledger {
    state: LedgerState,
    /// Committed events not yet drained by the caller.
    events: Vec<LedgerEvent>,
    accrual: Arc<dyn AccrualCalculator>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Ledger owned by `owner` at [`DEFAULT_INTEREST_RATE`], using the
    /// linear accrual engine and the given clock.
    pub fn new(owner: Address, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(
            LedgerState::new(owner, DEFAULT_INTEREST_RATE),
            Arc::new(LinearAccrual::new()),
            clock,
        )
    }

    /// Ledger on the wall clock with default settings.
    pub fn with_defaults(owner: Address) -> Self {
        Self::new(owner, Arc::new(SystemClock))
    }

    /// Assemble from explicit state, accrual engine, and clock.
    pub fn with_parts(
        state: LedgerState,
        accrual: Arc<dyn AccrualCalculator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state,
            events: Vec::new(),
            accrual,
            clock,
        }
    }

    /// Build from configuration: owner, initial rate, and pre-granted minters.
    pub fn from_config(config: &LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        let mut state = LedgerState::new(config.owner, config.initial_rate);
        for minter in &config.minters {
            state.access.grant_minter(*minter);
        }
        Self::with_parts(state, Arc::new(LinearAccrual::new()), clock)
    }

    /// Rebuild from a snapshot.
    pub fn restore(snapshot: LedgerSnapshot, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(snapshot.state, Arc::new(LinearAccrual::new()), clock)
    }

    /// Copy of the current state for persistence.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.state.clone())
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Time and settlement
    // ------------------------------------------------------------------

    /// The instant an operation runs at. Never earlier than any instant a
    /// committed operation already used, so `last_settled` cannot go back.
    fn now(&self) -> Timestamp {
        self.clock.now().max(self.state.last_seen)
    }

    /// Bring `holder` current as of `now` without writing anything.
    ///
    /// Unknown holders come back as an empty account stamped `now`, carrying
    /// the current global rate as a placeholder that first funding overwrites.
    fn settled(&self, holder: &Address, now: Timestamp) -> Result<Settled, LedgerError> {
        let Some(existing) = self.state.holders.get(holder).copied() else {
            return Ok(Settled {
                account: HolderAccount {
                    principal: 0,
                    assigned_rate: self.state.global_rate,
                    last_settled: now,
                },
                interest: 0,
                known: false,
            });
        };

        let effective = self.accrual.effective_balance(
            existing.principal,
            existing.assigned_rate,
            existing.elapsed(now),
        )?;
        let interest = effective
            .checked_sub(existing.principal)
            .ok_or(LedgerError::Overflow)?;

        Ok(Settled {
            account: HolderAccount {
                principal: effective,
                assigned_rate: existing.assigned_rate,
                last_settled: now.max(existing.last_settled),
            },
            interest,
            known: true,
        })
    }

    /// Write settled accounts and their events. Only called once every check
    /// of the operation has passed.
    fn commit(
        &mut self,
        now: Timestamp,
        accounts: &[(Address, Settled)],
        mut events: Vec<LedgerEvent>,
    ) {
        let mut settlement_events = Vec::new();
        for (holder, settled) in accounts {
            if settled.interest > 0 {
                debug!(%holder, interest = settled.interest, "settled accrued interest");
                settlement_events.push(LedgerEvent::InterestSettled {
                    holder: *holder,
                    amount: settled.interest,
                    at: now,
                });
            }
            self.state.holders.insert(*holder, settled.account);
        }
        self.state.last_seen = now;
        self.events.append(&mut settlement_events);
        self.events.append(&mut events);
    }

    /// Materialize `holder`'s accrued interest into principal.
    ///
    /// Idempotent within one instant. Unknown holders are left untouched.
    /// Returns the amount of interest materialized.
    pub fn settle(&mut self, holder: &Address) -> Result<Amount, LedgerError> {
        let now = self.now();
        let settled = self.settled(holder, now)?;
        if !settled.known {
            return Ok(0);
        }
        self.commit(now, &[(*holder, settled)], Vec::new());
        Ok(settled.interest)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Principal plus interest accrued up to now. Does not mutate.
    pub fn balance_of(&self, holder: &Address) -> Result<Amount, LedgerError> {
        self.balance_at(holder, self.now())
    }

    /// Effective balance as of `at`, for projections. Times before the last
    /// settlement count as zero elapsed.
    pub fn balance_at(&self, holder: &Address, at: Timestamp) -> Result<Amount, LedgerError> {
        match self.state.holders.get(holder) {
            Some(account) => Ok(self.accrual.effective_balance(
                account.principal,
                account.assigned_rate,
                account.elapsed(at),
            )?),
            None => Ok(0),
        }
    }

    /// Materialized principal, excluding unsettled interest.
    pub fn principal_balance_of(&self, holder: &Address) -> Amount {
        self.state
            .holders
            .get(holder)
            .map_or(0, |account| account.principal)
    }

    /// The holder's locked-in rate; zero for an address never funded.
    pub fn user_interest_rate(&self, holder: &Address) -> Rate {
        self.state
            .holders
            .get(holder)
            .map_or(0, |account| account.assigned_rate)
    }

    /// Full record for `holder`, if it has ever been funded.
    pub fn holder(&self, holder: &Address) -> Option<HolderAccount> {
        self.state.holders.get(holder).copied()
    }

    /// Current global rate.
    pub fn interest_rate(&self) -> Rate {
        self.state.global_rate
    }

    /// Sum of materialized principal across holders.
    pub fn principal_total_supply(&self) -> Result<Amount, LedgerError> {
        self.state
            .holders
            .values()
            .try_fold(0u128, |sum, account| {
                sum.checked_add(account.principal).ok_or(LedgerError::Overflow)
            })
    }

    /// Sum of effective balances across holders as of now.
    pub fn total_supply(&self) -> Result<Amount, LedgerError> {
        let now = self.now();
        self.state.holders.keys().try_fold(0u128, |sum, holder| {
            sum.checked_add(self.balance_at(holder, now)?)
                .ok_or(LedgerError::Overflow)
        })
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.state.access.owner()
    }

    /// Whether `account` may mint and burn.
    pub fn has_mint_and_burn_role(&self, account: &Address) -> bool {
        self.state.access.has(account, Capability::MintAndBurn)
    }

    /// Remaining amount `spender` may move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state
            .allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Mint and burn
    // ------------------------------------------------------------------

    /// Settle `holder`, then add `amount` to its principal.
    ///
    /// When the holder goes from empty to funded, its rate is set to
    /// `rate_override` if given (vault re-deposit, inbound bridge message)
    /// or to the current global rate. Funded holders keep their rate and
    /// the override is ignored.
    pub fn mint(
        &mut self,
        caller: &Address,
        holder: &Address,
        amount: Amount,
        rate_override: Option<Rate>,
    ) -> Result<(), LedgerError> {
        self.state.access.ensure(caller, Capability::MintAndBurn)?;
        if holder.is_zero() {
            return Err(LedgerError::ZeroAddress("mint recipient"));
        }

        let now = self.now();
        let mut settled = self.settled(holder, now)?;

        if settled.account.principal == 0 && amount > 0 {
            settled.account.assigned_rate = rate_override.unwrap_or(self.state.global_rate);
        }
        settled.account.principal = settled
            .account
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        // A zero mint to an unknown holder funds nothing and creates no record.
        let recorded = settled.known || amount > 0;
        let assigned_rate = if recorded { settled.account.assigned_rate } else { 0 };
        let accounts = if recorded { vec![(*holder, settled)] } else { Vec::new() };
        self.commit(
            now,
            &accounts,
            vec![LedgerEvent::Minted {
                holder: *holder,
                amount,
                assigned_rate,
            }],
        );
        info!(%holder, amount, assigned_rate, "minted");
        Ok(())
    }

    /// Settle `holder`, then remove `quantity` from its principal.
    ///
    /// [`Quantity::All`] resolves to the settled balance, so it burns accrued
    /// interest too and leaves principal at exactly zero. The holder's rate
    /// is kept. Returns the amount burned.
    pub fn burn(
        &mut self,
        caller: &Address,
        holder: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.state.access.ensure(caller, Capability::MintAndBurn)?;

        let now = self.now();
        let mut settled = self.settled(holder, now)?;
        let amount = quantity.resolve(settled.account.principal);

        settled.account.principal = settled
            .account
            .principal
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                have: settled.account.principal,
                need: amount,
            })?;

        // An unknown holder can only get here burning nothing; no record is created.
        let accounts = if settled.known { vec![(*holder, settled)] } else { Vec::new() };
        self.commit(
            now,
            &accounts,
            vec![LedgerEvent::Burned {
                holder: *holder,
                amount,
            }],
        );
        info!(%holder, amount, "burned");
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Transfers
    // ------------------------------------------------------------------

    /// Move `quantity` from `sender` to `recipient`. Returns the amount moved.
    pub fn transfer(
        &mut self,
        sender: &Address,
        recipient: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.move_tokens(None, sender, recipient, quantity)
    }

    /// Move `quantity` from `from` to `to` on `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        self.move_tokens(Some(spender), from, to, quantity)
    }

    /// Let `spender` move up to `amount` of `owner`'s tokens.
    /// [`INFINITE_ALLOWANCE`] is never decremented.
    pub fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress("spender"));
        }
        let now = self.now();
        self.state
            .allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        self.commit(
            now,
            &[],
            vec![LedgerEvent::Approval {
                owner: *owner,
                spender: *spender,
                amount,
            }],
        );
        debug!(%owner, %spender, amount, "approval set");
        Ok(())
    }

    /// Shared transfer path.
    ///
    /// Order: settle both sides, resolve the sentinel against the sender's
    /// settled balance, check allowance and balance, inherit the sender's rate
    /// if the recipient is empty, then move principal.
    fn move_tokens(
        &mut self,
        spender: Option<&Address>,
        from: &Address,
        to: &Address,
        quantity: Quantity,
    ) -> Result<Amount, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("transfer recipient"));
        }

        let now = self.now();
        let mut sender = self.settled(from, now)?;
        let amount = quantity.resolve(sender.account.principal);

        let remaining_allowance = match spender {
            Some(spender) => Some(self.spend_allowance(from, spender, amount)?),
            None => None,
        };

        if amount > sender.account.principal {
            warn!(%from, have = sender.account.principal, need = amount, "transfer exceeds balance");
            return Err(LedgerError::InsufficientBalance {
                have: sender.account.principal,
                need: amount,
            });
        }

        let transferred = LedgerEvent::Transferred {
            from: *from,
            to: *to,
            amount,
        };

        if from == to {
            // Settlement is the only effect of a self-transfer.
            let accounts = if sender.known { vec![(*from, sender)] } else { Vec::new() };
            self.apply_allowance(from, spender, remaining_allowance);
            self.commit(now, &accounts, vec![transferred]);
            return Ok(amount);
        }

        let mut recipient = self.settled(to, now)?;
        if recipient.account.principal == 0 && amount > 0 {
            recipient.account.assigned_rate = sender.account.assigned_rate;
        }

        sender.account.principal -= amount;
        recipient.account.principal = recipient
            .account
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        let mut accounts = Vec::with_capacity(2);
        if sender.known {
            accounts.push((*from, sender));
        }
        if recipient.known || amount > 0 {
            accounts.push((*to, recipient));
        }

        self.apply_allowance(from, spender, remaining_allowance);
        self.commit(now, &accounts, vec![transferred]);
        debug!(%from, %to, amount, "transferred");
        Ok(amount)
    }

    /// Allowance left after spending `amount`, or `None` if it is infinite.
    fn spend_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<Option<Amount>, LedgerError> {
        let current = self.allowance(owner, spender);
        if current == INFINITE_ALLOWANCE {
            return Ok(None);
        }
        current
            .checked_sub(amount)
            .map(Some)
            .ok_or(LedgerError::InsufficientAllowance {
                have: current,
                need: amount,
            })
    }

    fn apply_allowance(
        &mut self,
        owner: &Address,
        spender: Option<&Address>,
        remaining: Option<Option<Amount>>,
    ) {
        if let (Some(spender), Some(Some(left))) = (spender, remaining) {
            self.state
                .allowances
                .entry(*owner)
                .or_default()
                .insert(*spender, left);
        }
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    /// Lower the global rate. Equal is accepted; any increase fails with
    /// [`LedgerError::RateCanOnlyDecrease`]. Existing holders keep their rate.
    pub fn set_interest_rate(&mut self, caller: &Address, new_rate: Rate) -> Result<(), LedgerError> {
        self.state.access.ensure(caller, Capability::Governance)?;

        let previous = self.state.global_rate;
        if new_rate > previous {
            warn!(current = previous, proposed = new_rate, "rejected interest rate increase");
            return Err(LedgerError::RateCanOnlyDecrease {
                current: previous,
                proposed: new_rate,
            });
        }

        let now = self.now();
        self.state.global_rate = new_rate;
        self.commit(
            now,
            &[],
            vec![LedgerEvent::RateChanged {
                previous,
                current: new_rate,
            }],
        );
        info!(previous, current = new_rate, "global interest rate changed");
        Ok(())
    }

    /// Authorize `account` to mint and burn.
    pub fn grant_mint_and_burn_role(
        &mut self,
        caller: &Address,
        account: &Address,
    ) -> Result<(), LedgerError> {
        self.state.access.ensure(caller, Capability::Governance)?;
        if account.is_zero() {
            return Err(LedgerError::ZeroAddress("minter"));
        }
        let now = self.now();
        let mut events = Vec::new();
        if self.state.access.grant_minter(*account) {
            events.push(LedgerEvent::RoleGranted { account: *account });
            info!(%account, "granted mint-and-burn role");
        }
        self.commit(now, &[], events);
        Ok(())
    }

    /// Withdraw `account`'s mint and burn authorization.
    pub fn revoke_mint_and_burn_role(
        &mut self,
        caller: &Address,
        account: &Address,
    ) -> Result<(), LedgerError> {
        self.state.access.ensure(caller, Capability::Governance)?;
        let now = self.now();
        let mut events = Vec::new();
        if self.state.access.revoke_minter(account) {
            events.push(LedgerEvent::RoleRevoked { account: *account });
            info!(%account, "revoked mint-and-burn role");
        }
        self.commit(now, &[], events);
        Ok(())
    }

    /// Hand governance to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), LedgerError> {
        self.state.access.ensure(caller, Capability::Governance)?;
        if new_owner.is_zero() {
            return Err(LedgerError::ZeroAddress("owner"));
        }
        let now = self.now();
        let previous = self.state.access.owner();
        self.state.access.set_owner(*new_owner);
        self.commit(
            now,
            &[],
            vec![LedgerEvent::OwnershipTransferred {
                previous,
                current: *new_owner,
            }],
        );
        info!(%previous, current = %new_owner, "ownership transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Atomic sequences and events
    // ------------------------------------------------------------------

    /// Run `f` as one all-or-nothing unit.
    ///
    /// If `f` returns `Err`, state and queued events are restored to what
    /// they were before the call.
    pub fn atomically<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let saved = self.state.clone();
        let queued = self.events.len();
        let result = f(self);
        if result.is_err() {
            debug!("rolling back failed ledger operation");
            self.state = saved;
            self.events.truncate(queued);
        }
        result
    }

    /// Take every committed event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("queued_events", &self.events.len())
            .finish_non_exhaustive()
    }
}
