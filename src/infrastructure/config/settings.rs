//! Application configuration loading and validation.
//!
//! Provides the top-level [`Config`] struct. Every section is optional and
//! falls back to its defaults.
//!
//! # Example
//!
//! ```no_run
//! use position_ledger::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("ledger.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::ledger::LedgerConfig;
use super::logging::LoggingConfig;
use crate::application::position::{ManagerSettings, PositionManager};
use crate::error::{ConfigError, Result};
use crate::port::outbound::barrier::BranchBarrier;
use crate::port::outbound::repository::PositionRepository;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Branch deadline, conflict retries and paging.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or for any reason
    /// [`Config::parse_toml`] fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.ledger.validate()
    }

    /// Install the tracing subscriber described by `[logging]`.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Manager settings derived from `[ledger]`.
    #[must_use]
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings::from(&self.ledger)
    }

    /// Build a [`PositionManager`] over the given adapters.
    pub fn build_manager<R, B>(&self, repository: Arc<R>, barrier: Arc<B>) -> PositionManager<R, B>
    where
        R: PositionRepository,
        B: BranchBarrier,
    {
        PositionManager::with_settings(repository, barrier, self.manager_settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse_toml(
            r#"
[logging]
level = "debug"
format = "json"

[ledger]
branch_timeout_ms = 250
conflict_retries = 0
default_page_size = 10
"#,
        )
        .unwrap();

        assert_eq!(config.logging.format, "json");
        let settings = config.manager_settings();
        assert_eq!(settings.branch_timeout, Duration::from_millis(250));
        assert_eq!(settings.conflict_retries, 0);
        assert_eq!(settings.default_page_size, 10);
    }

    #[test]
    fn partial_ledger_section_keeps_other_defaults() {
        let config = Config::parse_toml("[ledger]\nconflict_retries = 5\n").unwrap();
        assert_eq!(config.ledger.conflict_retries, 5);
        assert_eq!(config.ledger.branch_timeout_ms, 5_000);
        assert_eq!(config.ledger.default_page_size, 50);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config::parse_toml("[ledger]\nbranch_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "branch_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[ledger\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
