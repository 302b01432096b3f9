//! Capability checks for gated ledger operations.
//!
//! The owner holds [`Capability::Governance`]: it lowers the global rate,
//! grants and revokes minters, and may hand ownership to another account.
//! Accounts in the minter set hold [`Capability::MintAndBurn`].
//! Every check runs before the guarded operation touches state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use rebase_core::error::LedgerError;
use rebase_core::types::{Address, Capability};

/// Owner plus the set of accounts allowed to mint and burn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    minters: BTreeSet<Address>,
}

impl AccessControl {
    /// Create with `owner` and no minters.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            minters: BTreeSet::new(),
        }
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether `account` holds `capability`.
    pub fn has(&self, account: &Address, capability: Capability) -> bool {
        match capability {
            Capability::Governance => *account == self.owner,
            Capability::MintAndBurn => self.minters.contains(account),
        }
    }

    /// Fail with [`LedgerError::Unauthorized`] unless `account` holds `capability`.
    pub fn ensure(&self, account: &Address, capability: Capability) -> Result<(), LedgerError> {
        if self.has(account, capability) {
            return Ok(());
        }
        warn!(%account, %capability, "unauthorized call rejected");
        Err(LedgerError::Unauthorized {
            account: *account,
            capability,
        })
    }

    /// Add `account` to the minter set. Returns `false` if already present.
    pub(crate) fn grant_minter(&mut self, account: Address) -> bool {
        self.minters.insert(account)
    }

    /// Remove `account` from the minter set. Returns `false` if absent.
    pub(crate) fn revoke_minter(&mut self, account: &Address) -> bool {
        self.minters.remove(account)
    }

    pub(crate) fn set_owner(&mut self, owner: Address) {
        self.owner = owner;
    }

    /// Iterate over current minters in address order.
    pub fn minters(&self) -> impl Iterator<Item = &Address> {
        self.minters.iter()
    }
}
