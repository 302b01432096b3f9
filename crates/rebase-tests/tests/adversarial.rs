//! Adversarial property-based test suite for the Rebase ledger.
//!
//! Random sequences of mints, burns, transfers, approvals, rate changes, and
//! clock jumps (including backwards) are applied to one ledger. After every
//! step the ledger must still satisfy its invariants:
//! - Rejected operations leave state and the event queue untouched
//! - Principal supply moves only by minted, burned, and settled amounts
//! - The global rate never rises
//! - A funded holder's rate never changes
//! - `last_settled` never goes back
//! - Effective balance is never below principal

use proptest::prelude::*;
use rebase_accrual::LinearAccrual;
use rebase_core::clock::ManualClock;
use rebase_core::constants::{DEFAULT_INTEREST_RATE, TOKEN};
use rebase_core::error::LedgerError;
use rebase_core::traits::{AccrualCalculator, Clock};
use rebase_core::types::{Address, Amount, Quantity, Rate};
use rebase_ledger::{Ledger, LedgerEvent, LedgerState};
use rebase_tests::helpers::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HOLDERS: [Address; 4] = [
    Address([0xA0; 20]),
    Address([0xA1; 20]),
    Address([0xA2; 20]),
    Address([0xA3; 20]),
];

#[derive(Debug, Clone)]
enum Op {
    Mint {
        authorized: bool,
        holder: usize,
        amount: Amount,
        rate_override: Option<Rate>,
    },
    Burn {
        holder: usize,
        quantity: Quantity,
    },
    Transfer {
        from: usize,
        to: usize,
        quantity: Quantity,
    },
    Approve {
        owner: usize,
        spender: usize,
        amount: Amount,
    },
    TransferFrom {
        spender: usize,
        from: usize,
        to: usize,
        quantity: Quantity,
    },
    Settle {
        holder: usize,
    },
    SetRate {
        rate: Rate,
    },
    Advance {
        secs: u64,
    },
    Rewind {
        secs: u64,
    },
}

fn holder_index() -> impl Strategy<Value = usize> {
    0..HOLDERS.len()
}

fn quantity() -> impl Strategy<Value = Quantity> {
    prop_oneof![
        1 => Just(Quantity::All),
        4 => (0u128..=2_000 * TOKEN).prop_map(Quantity::Exact),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<bool>(), holder_index(), 0u128..=1_000 * TOKEN, prop::option::of(0u128..=2 * DEFAULT_INTEREST_RATE))
            .prop_map(|(ok, holder, amount, rate_override)| Op::Mint {
                // Mostly authorized so balances build up.
                authorized: ok || amount % 4 != 0,
                holder,
                amount,
                rate_override,
            }),
        2 => (holder_index(), quantity()).prop_map(|(holder, quantity)| Op::Burn { holder, quantity }),
        4 => (holder_index(), holder_index(), quantity())
            .prop_map(|(from, to, quantity)| Op::Transfer { from, to, quantity }),
        1 => (holder_index(), holder_index(), prop_oneof![Just(u128::MAX), 0u128..=500 * TOKEN])
            .prop_map(|(owner, spender, amount)| Op::Approve { owner, spender, amount }),
        2 => (holder_index(), holder_index(), holder_index(), quantity())
            .prop_map(|(spender, from, to, quantity)| Op::TransferFrom { spender, from, to, quantity }),
        1 => holder_index().prop_map(|holder| Op::Settle { holder }),
        1 => (0u128..=2 * DEFAULT_INTEREST_RATE).prop_map(|rate| Op::SetRate { rate }),
        3 => (0u64..=31_536_000).prop_map(|secs| Op::Advance { secs }),
        1 => (0u64..=86_400).prop_map(|secs| Op::Rewind { secs }),
    ]
}

fn apply(ledger: &mut Ledger, clock: &ManualClock, op: &Op) -> Result<(), LedgerError> {
    match *op {
        Op::Mint {
            authorized,
            holder,
            amount,
            rate_override,
        } => {
            let caller = if authorized { VAULT } else { HOLDERS[holder] };
            ledger.mint(&caller, &HOLDERS[holder], amount, rate_override)
        }
        Op::Burn { holder, quantity } => ledger.burn(&VAULT, &HOLDERS[holder], quantity).map(drop),
        Op::Transfer { from, to, quantity } => ledger
            .transfer(&HOLDERS[from], &HOLDERS[to], quantity)
            .map(drop),
        Op::Approve {
            owner,
            spender,
            amount,
        } => ledger.approve(&HOLDERS[owner], &HOLDERS[spender], amount),
        Op::TransferFrom {
            spender,
            from,
            to,
            quantity,
        } => ledger
            .transfer_from(&HOLDERS[spender], &HOLDERS[from], &HOLDERS[to], quantity)
            .map(drop),
        Op::Settle { holder } => ledger.settle(&HOLDERS[holder]).map(drop),
        Op::SetRate { rate } => ledger.set_interest_rate(&OWNER, rate),
        Op::Advance { secs } => {
            clock.advance(secs);
            Ok(())
        }
        Op::Rewind { secs } => {
            clock.set(clock.now().saturating_sub(secs));
            Ok(())
        }
    }
}

fn principal_sum(state: &LedgerState) -> Amount {
    state.holders.values().map(|h| h.principal).sum()
}

fn principal_of(state: &LedgerState, index: usize) -> Amount {
    state.holders.get(&HOLDERS[index]).map_or(0, |h| h.principal)
}

fn rate_of(state: &LedgerState, index: usize) -> Option<Rate> {
    state.holders.get(&HOLDERS[index]).map(|h| h.assigned_rate)
}

/// Check every invariant across one applied step.
fn check_step(
    ledger: &Ledger,
    op: &Op,
    before: &LedgerState,
    ok: bool,
    events: &[LedgerEvent],
) -> Result<(), TestCaseError> {
    let after = ledger.state();

    if !ok {
        prop_assert_eq!(after, before, "rejected {:?} changed state", op);
        prop_assert!(events.is_empty(), "rejected {:?} emitted events", op);
        return Ok(());
    }

    // Supply accounting from the event stream.
    let mut expected = principal_sum(before);
    let mut burned = 0u128;
    for event in events {
        match event {
            LedgerEvent::Minted { amount, .. } | LedgerEvent::InterestSettled { amount, .. } => {
                expected += amount;
            }
            LedgerEvent::Burned { amount, .. } => burned += amount,
            _ => {}
        }
    }
    prop_assert_eq!(principal_sum(after), expected - burned, "supply drift after {:?}", op);

    prop_assert!(after.global_rate <= before.global_rate);
    prop_assert!(after.last_seen >= before.last_seen);

    for (address, old) in &before.holders {
        let new = after.holders.get(address);
        prop_assert!(new.is_some(), "holder record disappeared");
        let new = new.copied().unwrap_or_default();
        prop_assert!(new.last_settled >= old.last_settled, "last_settled went back");
        if old.principal > 0 {
            prop_assert_eq!(new.assigned_rate, old.assigned_rate, "funded holder rate changed by {:?}", op);
        }
    }

    // Empty recipient inherits the sender's rate.
    if let Op::Transfer { from, to, .. } | Op::TransferFrom { from, to, .. } = *op {
        if from != to && principal_of(before, to) == 0 && principal_of(after, to) > 0 {
            prop_assert_eq!(rate_of(after, to), rate_of(before, from));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_sequences_preserve_invariants(ops in prop::collection::vec(op(), 1..48)) {
        let (mut ledger, clock) = setup();

        for op in &ops {
            let before = ledger.state().clone();
            let ok = apply(&mut ledger, &clock, op).is_ok();
            let events = ledger.drain_events();
            check_step(&ledger, op, &before, ok, &events)?;

            for holder in &HOLDERS {
                let balance = ledger.balance_of(holder).unwrap();
                prop_assert!(balance >= ledger.principal_balance_of(holder));
            }
            prop_assert!(ledger.total_supply().unwrap() >= ledger.principal_total_supply().unwrap());
        }
    }

    #[test]
    fn burn_all_always_empties(
        amount in 1u128..=1_000_000 * TOKEN,
        gap in 0u64..=10 * 31_536_000,
    ) {
        let (mut ledger, clock) = setup();
        ledger.mint(&VAULT, &HOLDERS[0], amount, None).unwrap();
        clock.advance(gap);
        let expected = ledger.balance_of(&HOLDERS[0]).unwrap();
        let burned = ledger.burn(&VAULT, &HOLDERS[0], Quantity::All).unwrap();
        prop_assert_eq!(burned, expected);
        prop_assert_eq!(ledger.principal_balance_of(&HOLDERS[0]), 0);
    }

    #[test]
    fn settling_twice_at_one_instant_is_noop(
        amount in 1u128..=1_000_000 * TOKEN,
        gap in 0u64..=31_536_000,
    ) {
        let (mut ledger, clock) = setup();
        ledger.mint(&VAULT, &HOLDERS[0], amount, None).unwrap();
        clock.advance(gap);
        ledger.settle(&HOLDERS[0]).unwrap();
        let after_first = ledger.state().clone();
        prop_assert_eq!(ledger.settle(&HOLDERS[0]).unwrap(), 0);
        prop_assert_eq!(ledger.state(), &after_first);
    }

    #[test]
    fn effective_balance_monotone_in_time(
        principal in 0u128..=1_000_000_000 * TOKEN,
        rate in 0u128..=10 * DEFAULT_INTEREST_RATE,
        t1 in 0u64..=100 * 31_536_000,
        extra in 0u64..=31_536_000,
    ) {
        let engine = LinearAccrual::new();
        let a = engine.effective_balance(principal, rate, t1).unwrap();
        let b = engine.effective_balance(principal, rate, t1 + extra).unwrap();
        prop_assert!(a >= principal);
        prop_assert!(b >= a);
    }

    #[test]
    fn intermediate_settlement_never_loses_interest(
        amount in 1u128..=1_000_000 * TOKEN,
        t1 in 0u64..=31_536_000,
        t2 in 0u64..=31_536_000,
    ) {
        let (mut lazy, lazy_clock) = setup();
        let (mut eager, eager_clock) = setup();
        lazy.mint(&VAULT, &HOLDERS[0], amount, None).unwrap();
        eager.mint(&VAULT, &HOLDERS[0], amount, None).unwrap();

        eager_clock.advance(t1);
        eager.settle(&HOLDERS[0]).unwrap();
        eager_clock.advance(t2);
        lazy_clock.advance(t1 + t2);

        // Settlement compounds, and each floor loses under one unit.
        let lazy_balance = lazy.balance_of(&HOLDERS[0]).unwrap();
        let eager_balance = eager.balance_of(&HOLDERS[0]).unwrap();
        prop_assert!(eager_balance + 1 >= lazy_balance);
    }
}
