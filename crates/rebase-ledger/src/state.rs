//! Ledger state and its JSON snapshot form.
//!
//! [`LedgerState`] is everything a ledger owns besides its clock and accrual
//! engine. It is cheap enough to clone that [`Ledger::atomically`] restores
//! from a full copy on failure.
//!
//! [`Ledger::atomically`]: crate::ledger::Ledger::atomically

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use rebase_core::error::SnapshotError;
use rebase_core::types::{Address, Amount, HolderAccount, Rate, Timestamp};

use crate::access::AccessControl;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Complete mutable state of a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Owner and minter set.
    pub access: AccessControl,
    /// Non-increasing global rate copied into new holders.
    pub global_rate: Rate,
    /// Every address that has ever held a balance.
    pub holders: BTreeMap<Address, HolderAccount>,
    /// owner → spender → remaining allowance.
    pub allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    /// Highest timestamp any committed operation has used.
    pub last_seen: Timestamp,
}

impl LedgerState {
    /// Fresh state: no holders, no minters.
    pub fn new(owner: Address, global_rate: Rate) -> Self {
        Self {
            access: AccessControl::new(owner),
            global_rate,
            holders: BTreeMap::new(),
            allowances: BTreeMap::new(),
            last_seen: 0,
        }
    }
}

/// Versioned wrapper persisted to disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub state: LedgerState,
}

impl LedgerSnapshot {
    pub fn new(state: LedgerState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state,
        }
    }

    /// Write as pretty JSON. Parent directories are created if missing.
    ///
    /// The file is written beside the target and renamed into place so a
    /// crash never leaves a truncated snapshot.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::Io(e.to_string()))?;
        }
        let json =
            serde_json::to_vec_pretty(self).map_err(|e| SnapshotError::Format(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| SnapshotError::Io(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| SnapshotError::Io(e.to_string()))?;
        info!(path = %path.display(), holders = self.state.holders.len(), "saved ledger snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = fs::read(path).map_err(|e| SnapshotError::Io(e.to_string()))?;
        let snapshot: Self =
            serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Format(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Format(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn sample_state() -> LedgerState {
        let mut state = LedgerState::new(addr(1), 50_000_000_000);
        state.access.grant_minter(addr(2));
        state.holders.insert(
            addr(3),
            HolderAccount {
                principal: 10u128.pow(30),
                assigned_rate: 50_000_000_000,
                last_settled: 1_700_000_000,
            },
        );
        state
            .allowances
            .entry(addr(3))
            .or_default()
            .insert(addr(4), u128::MAX);
        state.last_seen = 1_700_000_000;
        state
    }

    #[test]
    fn save_then_load_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let snapshot = LedgerSnapshot::new(sample_state());
        snapshot.save(&path).unwrap();
        let loaded = LedgerSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LedgerSnapshot::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }

    #[test]
    fn load_garbage_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"not json").unwrap();
        let err = LedgerSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Format(_)));
    }

    #[test]
    fn load_rejects_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v2.json");
        let mut snapshot = LedgerSnapshot::new(sample_state());
        snapshot.version = SNAPSHOT_VERSION + 1;
        fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
        let err = LedgerSnapshot::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));
    }
}
