//! Ledger runtime configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::position::ManagerSettings;
use crate::error::{ConfigError, Result};

const MAX_CONFLICT_RETRIES: u32 = 16;

/// Knobs for [`PositionManager`](crate::application::position::PositionManager).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Deadline for one branch call in milliseconds (default: 5000).
    #[serde(default = "default_branch_timeout_ms")]
    pub branch_timeout_ms: u64,
    /// Re-read attempts after an optimistic write conflict (default: 3).
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Page size for position listings (default: 50).
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

const fn default_branch_timeout_ms() -> u64 {
    5_000
}

const fn default_conflict_retries() -> u32 {
    3
}

const fn default_page_size() -> usize {
    50
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            branch_timeout_ms: default_branch_timeout_ms(),
            conflict_retries: default_conflict_retries(),
            default_page_size: default_page_size(),
        }
    }
}

impl LedgerConfig {
    pub(super) fn validate(&self) -> Result<()> {
        if self.branch_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "branch_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "conflict_retries",
                reason: format!("must be at most {MAX_CONFLICT_RETRIES}"),
            }
            .into());
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_page_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<&LedgerConfig> for ManagerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            branch_timeout: Duration::from_millis(config.branch_timeout_ms),
            conflict_retries: config.conflict_retries,
            default_page_size: config.default_page_size,
        }
    }
}
