//! Notifications emitted by committed ledger operations.

use serde::{Deserialize, Serialize};

use rebase_core::types::{Address, Amount, Rate, Timestamp};

/// A committed state change. Failed operations emit nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Accrued interest materialized into principal.
    InterestSettled {
        holder: Address,
        amount: Amount,
        at: Timestamp,
    },
    Minted {
        holder: Address,
        amount: Amount,
        assigned_rate: Rate,
    },
    Burned {
        holder: Address,
        amount: Amount,
    },
    Transferred {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// The global rate was lowered (or set to the same value).
    RateChanged {
        previous: Rate,
        current: Rate,
    },
    RoleGranted {
        account: Address,
    },
    RoleRevoked {
        account: Address,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
}
