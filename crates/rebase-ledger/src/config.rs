//! Ledger configuration.
//!
//! Provides [`LedgerConfig`] with defaults for the initial rate, snapshot
//! location, and log level. Values are layered: built-in defaults, then an
//! optional TOML file, then `REBASE_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rebase_core::constants::DEFAULT_INTEREST_RATE;
use rebase_core::error::ConfigError;
use rebase_core::types::{Address, Rate};

/// Prefix for environment overrides, e.g. `REBASE_INITIAL_RATE`.
pub const ENV_PREFIX: &str = "REBASE";

/// Configuration for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Account holding governance. Must be non-zero.
    pub owner: Address,
    /// Global rate at construction, scaled by `PRECISION`.
    pub initial_rate: Rate,
    /// Accounts granted mint-and-burn at construction.
    pub minters: Vec<Address>,
    /// Where snapshots are read from and written to.
    pub snapshot_path: PathBuf,
    /// Log level filter string (e.g. "info", "debug", "rebase_ledger=trace").
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rebase");

        Self {
            owner: Address::ZERO,
            initial_rate: DEFAULT_INTEREST_RATE,
            minters: Vec::new(),
            snapshot_path: data_dir.join("ledger.json"),
            log_level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load defaults, then `path` if given, then `REBASE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(prefix)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("minters"),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations a ledger cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::Invalid {
                field: "owner",
                reason: "must be a non-zero address".to_string(),
            });
        }
        if let Some(minter) = self.minters.iter().find(|m| m.is_zero()) {
            return Err(ConfigError::Invalid {
                field: "minters",
                reason: format!("{minter} is the zero address"),
            });
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
