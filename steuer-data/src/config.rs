//! Engine configuration read from a TOML file.
//!
//! ```toml
//! [monitor]
//! current_year_limit = 22000
//! warning_ratio = 0.8
//!
//! [depreciation]
//! threshold = 800
//! default_useful_life_months = 36
//!
//! [trade_tax]
//! hebesatz = 410
//!
//! [tax_reserve]
//! rate_percent = 30
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "ledger.db"
//! ```
//!
//! Every table and every key is optional; omitted values take their
//! statutory defaults.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use steuer_core::calculations::{
    GwgPolicy, TaxReserveConfig, TaxReserveError, TradeTaxConfig, TradeTaxError,
};
use steuer_core::db::DbConfig;
use steuer_core::monitor::{MonitorConfig, RuleError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid [monitor] section: {0}")]
    Monitor(#[from] RuleError),

    #[error("Invalid [trade_tax] section: {0}")]
    TradeTax(#[from] TradeTaxError),

    #[error("Invalid [depreciation] section: {0}")]
    Depreciation(String),

    #[error("Invalid [tax_reserve] section: {0}")]
    TaxReserve(#[from] TaxReserveError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub monitor: MonitorConfig,
    pub depreciation: GwgPolicy,
    pub trade_tax: TradeTaxConfig,
    pub tax_reserve: TaxReserveConfig,
    pub database: DbConfig,
}

impl EngineConfig {
    /// Reads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), backend = %config.database.backend, "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        self.trade_tax.validate()?;
        self.tax_reserve.validate()?;
        if self.depreciation.threshold < Decimal::ZERO {
            return Err(ConfigError::Depreciation(format!(
                "threshold must be non-negative, got {}",
                self.depreciation.threshold
            )));
        }
        if self.depreciation.default_useful_life_months < 1 {
            return Err(ConfigError::Depreciation(format!(
                "default_useful_life_months must be at least 1, got {}",
                self.depreciation.default_useful_life_months
            )));
        }
        Ok(())
    }
}
