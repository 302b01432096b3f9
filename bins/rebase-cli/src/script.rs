//! Replay scripts: timestamped ledger operations read from JSON.
//!
//! ```json
//! {
//!   "owner": "0x0101010101010101010101010101010101010101",
//!   "minters": ["0x0202020202020202020202020202020202020202"],
//!   "steps": [
//!     { "at": 0, "action": { "mint": { "caller": "0x02..", "holder": "0xa1..", "amount": 100 } } },
//!     { "at": 3600, "action": { "transfer": { "from": "0xa1..", "to": "0xb0..", "quantity": "all" } } }
//!   ]
//! }
//! ```

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rebase_accrual::LinearAccrual;
use rebase_core::clock::ManualClock;
use rebase_core::constants::DEFAULT_INTEREST_RATE;
use rebase_core::error::LedgerError;
use rebase_core::traits::Clock;
use rebase_core::types::{Address, Amount, Quantity, Rate, Timestamp};
use rebase_ledger::{Ledger, LedgerEvent, LedgerService, LedgerSnapshot, LedgerState};

/// A full replay: initial ledger setup plus ordered steps.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub owner: Address,
    #[serde(default)]
    pub initial_rate: Option<Rate>,
    /// Granted mint-and-burn before the first step.
    #[serde(default)]
    pub minters: Vec<Address>,
    #[serde(default)]
    pub start: Timestamp,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Clock reading for this step. Earlier values than a previous step are
    /// clamped by the ledger.
    pub at: Timestamp,
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    Mint {
        caller: Address,
        holder: Address,
        amount: Amount,
        #[serde(default)]
        rate_override: Option<Rate>,
    },
    Burn {
        caller: Address,
        holder: Address,
        quantity: Quantity,
    },
    Transfer {
        from: Address,
        to: Address,
        quantity: Quantity,
    },
    TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        quantity: Quantity,
    },
    Approve {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    Settle {
        holder: Address,
    },
    SetInterestRate {
        caller: Address,
        rate: Rate,
    },
    GrantMintAndBurnRole {
        caller: Address,
        account: Address,
    },
    RevokeMintAndBurnRole {
        caller: Address,
        account: Address,
    },
    TransferOwnership {
        caller: Address,
        new_owner: Address,
    },
}

impl Action {
    fn apply(&self, ledger: &mut Ledger) -> Result<(), LedgerError> {
        match self {
            Self::Mint {
                caller,
                holder,
                amount,
                rate_override,
            } => ledger.mint(caller, holder, *amount, *rate_override),
            Self::Burn {
                caller,
                holder,
                quantity,
            } => ledger.burn(caller, holder, *quantity).map(drop),
            Self::Transfer { from, to, quantity } => {
                ledger.transfer(from, to, *quantity).map(drop)
            }
            Self::TransferFrom {
                spender,
                from,
                to,
                quantity,
            } => ledger.transfer_from(spender, from, to, *quantity).map(drop),
            Self::Approve {
                owner,
                spender,
                amount,
            } => ledger.approve(owner, spender, *amount),
            Self::Settle { holder } => ledger.settle(holder).map(drop),
            Self::SetInterestRate { caller, rate } => ledger.set_interest_rate(caller, *rate),
            Self::GrantMintAndBurnRole { caller, account } => {
                ledger.grant_mint_and_burn_role(caller, account)
            }
            Self::RevokeMintAndBurnRole { caller, account } => {
                ledger.revoke_mint_and_burn_role(caller, account)
            }
            Self::TransferOwnership { caller, new_owner } => {
                ledger.transfer_ownership(caller, new_owner)
            }
        }
    }
}

/// A step that was rejected by the ledger.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Failure {
    pub step: usize,
    pub at: Timestamp,
    pub error: String,
}

/// One holder's position as of the report time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HolderReport {
    pub address: Address,
    pub principal: Amount,
    pub balance: Amount,
    pub rate: Rate,
    pub last_settled: Timestamp,
}

/// Final ledger summary printed by `replay` and `show`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub at: Timestamp,
    pub owner: Address,
    pub minters: Vec<Address>,
    pub interest_rate: Rate,
    pub principal_total_supply: Amount,
    pub total_supply: Amount,
    pub holders: Vec<HolderReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<LedgerEvent>,
}

impl Report {
    /// Summarize `state` with every balance projected to `at`.
    pub fn from_state(state: &LedgerState, at: Timestamp) -> Result<Self, LedgerError> {
        let ledger = Ledger::restore(
            LedgerSnapshot::new(state.clone()),
            Arc::new(ManualClock::new(at)),
        );
        Self::from_ledger(&ledger, at)
    }

    fn from_ledger(ledger: &Ledger, at: Timestamp) -> Result<Self, LedgerError> {
        let holders = ledger
            .state()
            .holders
            .iter()
            .map(|(address, account)| {
                Ok(HolderReport {
                    address: *address,
                    principal: account.principal,
                    balance: ledger.balance_at(address, at)?,
                    rate: account.assigned_rate,
                    last_settled: account.last_settled,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        let total_supply = holders.iter().try_fold(0u128, |sum, h| {
            sum.checked_add(h.balance).ok_or(LedgerError::Overflow)
        })?;

        Ok(Self {
            at,
            owner: ledger.owner(),
            minters: ledger.state().access.minters().copied().collect(),
            interest_rate: ledger.interest_rate(),
            principal_total_supply: ledger.principal_total_supply()?,
            total_supply,
            holders,
            failures: Vec::new(),
            events: Vec::new(),
        })
    }
}

/// Outcome of running a script.
#[derive(Debug)]
pub struct Replay {
    pub service: LedgerService,
    pub clock: ManualClock,
    pub failures: Vec<Failure>,
    pub events: Vec<LedgerEvent>,
}

impl Replay {
    /// Report as of the last step's time.
    pub fn report(&self) -> Result<Report, LedgerError> {
        let at = self.service.read(|l| l.state().last_seen).max(self.clock.now());
        let mut report = self.service.read(|l| Report::from_ledger(l, at))?;
        report.failures = self.failures.clone();
        report.events = self.events.clone();
        Ok(report)
    }
}

impl Script {
    /// Run every step. With `strict`, the first rejected step aborts the
    /// replay; otherwise rejections are collected and the replay continues.
    pub fn run(&self, strict: bool) -> anyhow::Result<Replay> {
        let clock = ManualClock::new(self.start);
        let state = LedgerState::new(
            self.owner,
            self.initial_rate.unwrap_or(DEFAULT_INTEREST_RATE),
        );
        let mut ledger = Ledger::with_parts(
            state,
            Arc::new(LinearAccrual::new()),
            Arc::new(clock.clone()),
        );
        for minter in &self.minters {
            ledger
                .grant_mint_and_burn_role(&self.owner, minter)
                .with_context(|| format!("granting mint-and-burn to {minter}"))?;
        }

        let service = LedgerService::new(ledger);
        let mut rx = service.subscribe();
        let mut failures = Vec::new();
        let mut events = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            clock.set(step.at);
            match service.execute(|l| step.action.apply(l)) {
                Ok(()) => debug!(step = index, at = step.at, "step applied"),
                Err(e) if strict => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("step {index} at {} rejected", step.at)));
                }
                Err(e) => {
                    warn!(step = index, at = step.at, error = %e, "step rejected");
                    failures.push(Failure {
                        step: index,
                        at: step.at,
                        error: e.to_string(),
                    });
                }
            }
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        Ok(Replay {
            service,
            clock,
            failures,
            events,
        })
    }
}
